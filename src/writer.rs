//! Dedicated per-connection writer task.
//!
//! Handlers reply concurrently, so response frames are funneled through an
//! mpsc channel into a single task that owns the write half. Each queued
//! item is one fully framed message in one contiguous buffer, which keeps
//! frames from interleaving no matter how many handlers are in flight.
//! Ready frames are batched into a single `write_vectored` call and one
//! flush; a partial write retries with the remaining slices.

use std::io::IoSlice;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{EndpointError, Result};

const CHANNEL_CAPACITY: usize = 256;
const MAX_BATCH_SIZE: usize = 64;

enum Outbound {
    Frame(Bytes),
    /// Flush everything queued so far, then drop the write half.
    Shutdown,
}

/// Cheaply cloneable handle for queueing framed messages.
#[derive(Clone)]
pub(crate) struct WriterHandle {
    tx: mpsc::Sender<Outbound>,
}

impl WriterHandle {
    /// Queue one framed message for writing.
    pub(crate) async fn send(&self, frame: Bytes) -> Result<()> {
        self.tx
            .send(Outbound::Frame(frame))
            .await
            .map_err(|_| EndpointError::Closed)
    }

    /// Ask the writer to flush what is queued and close the write half.
    ///
    /// Ordered behind frames already queued, so the last response reaches
    /// the socket before the close. Frames sent after this are lost.
    pub(crate) async fn shutdown(&self) {
        let _ = self.tx.send(Outbound::Shutdown).await;
    }
}

/// Spawn the writer task over `writer`.
///
/// The task drains the channel until every handle is dropped or a shutdown
/// is queued, flushes, and returns; joining it observes the last frame
/// hitting the socket.
pub(crate) fn spawn_writer_task<W>(writer: W) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let task = tokio::spawn(writer_loop(rx, writer));
    (WriterHandle { tx }, task)
}

async fn writer_loop<W>(mut rx: mpsc::Receiver<Outbound>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut batch: Vec<Bytes> = Vec::with_capacity(MAX_BATCH_SIZE);

    loop {
        let first = match rx.recv().await {
            Some(Outbound::Frame(frame)) => frame,
            Some(Outbound::Shutdown) | None => {
                writer.flush().await?;
                return Ok(());
            }
        };

        batch.push(first);
        let mut shutdown = false;
        while batch.len() < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(Outbound::Frame(frame)) => batch.push(frame),
                Ok(Outbound::Shutdown) => {
                    shutdown = true;
                    break;
                }
                Err(_) => break,
            }
        }

        write_batch(&mut writer, &batch).await?;
        batch.clear();

        if shutdown {
            return Ok(());
        }
    }
}

/// Write a batch of frames with scatter/gather I/O and a single flush.
///
/// The fast path is one `write_vectored` covering every frame; on a
/// partial write the remaining slices are rebuilt past the written prefix
/// and retried.
async fn write_batch<W>(writer: &mut W, batch: &[Bytes]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if batch.is_empty() {
        return Ok(());
    }

    let slices: Vec<IoSlice<'_>> = batch
        .iter()
        .filter(|frame| !frame.is_empty())
        .map(|frame| IoSlice::new(frame))
        .collect();
    let total: usize = batch.iter().map(|frame| frame.len()).sum();

    let mut written = writer.write_vectored(&slices).await?;
    if written == 0 && total > 0 {
        return Err(write_zero());
    }

    while written < total {
        let remaining = build_remaining_slices(batch, written);
        let n = writer.write_vectored(&remaining).await?;
        if n == 0 {
            return Err(write_zero());
        }
        written += n;
    }

    writer.flush().await?;
    Ok(())
}

/// Build the slice array for what is left after a partial write.
fn build_remaining_slices(batch: &[Bytes], skip_bytes: usize) -> Vec<IoSlice<'_>> {
    let mut slices = Vec::with_capacity(batch.len());
    let mut offset = 0;

    for frame in batch {
        let end = offset + frame.len();
        if skip_bytes < end {
            let start = skip_bytes.saturating_sub(offset);
            slices.push(IoSlice::new(&frame[start..]));
        }
        offset = end;
    }

    slices
}

fn write_zero() -> EndpointError {
    EndpointError::Io(std::io::Error::new(
        std::io::ErrorKind::WriteZero,
        "write_vectored returned 0",
    ))
}
