//! Calculator server demo.
//!
//! Serves `add` and `sub` over newline-framed JSON-RPC until interrupted:
//!
//! ```text
//! cargo run --example calc-server
//! ```

use framed_jsonrpc::{service_fn, ErrorObject, Framing, Responder, RpcValue, Server};

fn operands(params: &RpcValue) -> Option<(i64, i64)> {
    match params.as_list()? {
        [RpcValue::Integer(a), RpcValue::Integer(b)] => Some((*a, *b)),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let handler = service_fn(|method: String, params: RpcValue, responder: Responder| async move {
        let result = match (method.as_str(), operands(&params)) {
            ("add", Some((a, b))) => Ok(RpcValue::Integer(a + b)),
            ("sub", Some((a, b))) => Ok(RpcValue::Integer(a - b)),
            ("add" | "sub", None) => {
                Err(ErrorObject::invalid_params("expected two integers"))
            }
            _ => Err(ErrorObject::method_not_found(&method)),
        };
        let _ = match result {
            Ok(value) => responder.succeed(value).await,
            Err(error) => responder.fail(error).await,
        };
    });

    let server = Server::builder()
        .framing(Framing::Newline)
        .bind("127.0.0.1:9000".parse()?, handler)
        .await?;
    println!("calculator listening on {}", server.local_addr());

    tokio::signal::ctrl_c().await?;
    server.stop().await?;
    Ok(())
}
