//! Line capture for output of external commands, attached to errors with
//! [`crate::error::with_logs`].

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

const LINE_BUFFER: usize = 64;

/// Read `reader` line by line on a background task.
///
/// Invalid UTF-8 is replaced rather than ending the capture. The channel
/// closes when the reader hits EOF or fails.
pub fn spawn_line_reader<R>(reader: R) -> mpsc::Receiver<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(decode_line(&buf)).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    debug!(error = %err, "stopped reading output lines");
                    break;
                }
            }
        }
    });
    rx
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Drain `rx` until every sender is gone.
pub async fn collect_lines(mut rx: mpsc::Receiver<String>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(line) = rx.recv().await {
        lines.push(line);
    }
    lines
}

pub async fn read_lines<R>(reader: R) -> Vec<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    collect_lines(spawn_line_reader(reader)).await
}
