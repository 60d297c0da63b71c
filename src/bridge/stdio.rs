//! The bridge protocol as newline-delimited JSON.
//!
//! Each input line is an `Envelope<Request>`; each output line is the
//! matching `Envelope<Response>`. Responses are written as they complete,
//! so they may come back in a different order than the requests.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use super::{serve, Bridge, Envelope, Request, Response, CHANNEL_CAPACITY};

/// Serve requests read from `reader` until EOF, writing responses to `writer`.
///
/// Returns once every in-flight request has been answered.
pub async fn serve_lines<R, W>(bridge: Arc<Bridge>, reader: R, writer: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (request_tx, request_rx) = mpsc::channel::<Envelope<Request>>(CHANNEL_CAPACITY);
    let (response_tx, mut response_rx) = mpsc::channel::<Envelope<Response>>(CHANNEL_CAPACITY);
    let server = tokio::spawn(serve(bridge, request_rx, response_tx));

    let read = async move {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await.context("Failed to read request")? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Envelope<Request>>(line) {
                Ok(envelope) => {
                    if request_tx.send(envelope).await.is_err() {
                        break;
                    }
                }
                Err(e) => log::warn!("Skipping malformed request: {e}"),
            }
        }
        log::debug!("Request stream closed");
        Ok::<_, anyhow::Error>(())
    };

    let write = async {
        while let Some(envelope) = response_rx.recv().await {
            let mut line =
                serde_json::to_string(&envelope).context("Failed to serialize response")?;
            line.push('\n');
            writer
                .write_all(line.as_bytes())
                .await
                .context("Failed to write response")?;
            writer.flush().await.context("Failed to flush response")?;
        }
        Ok::<_, anyhow::Error>(())
    };

    let (read, write) = tokio::join!(read, write);
    server.await.context("Bridge task failed")?;
    read?;
    write
}

/// Serve the bridge over this process's stdin and stdout.
pub async fn serve_stdio(bridge: Arc<Bridge>) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    serve_lines(bridge, stdin, &mut stdout).await
}
