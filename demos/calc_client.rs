//! Calculator client demo.
//!
//! Issues a few calls against the calc-server demo:
//!
//! ```text
//! cargo run --example calc-client
//! ```

use framed_jsonrpc::{Client, Framing, RpcValue};

fn pair(a: i64, b: i64) -> RpcValue {
    RpcValue::List(vec![RpcValue::Integer(a), RpcValue::Integer(b)])
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let client = Client::builder()
        .framing(Framing::Newline)
        .connect("127.0.0.1:9000".parse()?)
        .await?;

    let sum = client.call("add", pair(40, 2)).await?;
    println!("add(40, 2) = {:?}", sum);

    let diff = client.call("sub", pair(40, 2)).await?;
    println!("sub(40, 2) = {:?}", diff);

    match client.call("mul", pair(6, 7)).await {
        Ok(value) => println!("mul(6, 7) = {:?}", value),
        Err(error) => println!("mul(6, 7) failed as expected: {}", error),
    }

    client.disconnect().await?;
    Ok(())
}
