//! Streaming transcodes through a scoped encoder process.
//!
//! The encoder is spawned with `kill_on_drop`, and the returned stream owns
//! the child. When the HTTP body is dropped (client disconnect, completion,
//! error) the stream is dropped with it and the process is killed and reaped.

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use bc_core::Error;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tokio_util::io::ReaderStream;

use crate::format::TargetFormat;
use crate::tools::Encoder;

/// Read size for encoder stdout.
const CHUNK_SIZE: usize = 64 * 1024;

/// Bytes of encoder stderr kept for error messages.
const STDERR_TAIL: usize = 2048;

/// A boxed stream of body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Runs the encoder with a fixed argument contract.
#[derive(Debug, Clone)]
pub struct Transcoder {
    encoder: Arc<Encoder>,
    bitrate: String,
}

impl Transcoder {
    pub fn new(encoder: Encoder, bitrate: impl Into<String>) -> Self {
        Self {
            encoder: Arc::new(encoder),
            bitrate: bitrate.into(),
        }
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// Encoder arguments for converting `input` to `format` on stdout.
    pub fn args(&self, input: &Path, format: TargetFormat) -> Vec<String> {
        vec![
            "-hide_banner".into(),
            "-nostdin".into(),
            "-loglevel".into(),
            "error".into(),
            "-i".into(),
            input.to_string_lossy().into_owned(),
            "-vn".into(),
            "-map_metadata".into(),
            "0".into(),
            "-c:a".into(),
            format.codec().into(),
            "-b:a".into(),
            self.bitrate.clone(),
            "-f".into(),
            format.muxer().into(),
            "pipe:1".into(),
        ]
    }

    /// Start converting `input` and return its output as a stream.
    ///
    /// The first chunk is awaited before returning, so an encoder that fails
    /// without producing output surfaces as [`Error::Transcode`] while the
    /// caller can still send an error status. A failure after that ends the
    /// stream with an I/O error, which aborts the response body.
    pub async fn stream(
        &self,
        input: &Path,
        format: TargetFormat,
    ) -> bc_core::Result<ByteStream> {
        let tool = self.encoder.name.clone();

        let mut child = Command::new(&self.encoder.path)
            .args(self.args(input, format))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::transcode(&tool, format!("failed to spawn: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::transcode(&tool, "stdout not captured"))?;
        let stderr = child.stderr.take().map(|s| tokio::spawn(drain_stderr(s)));

        tracing::debug!(
            encoder = %self.encoder.path.display(),
            input = %input.display(),
            format = %format,
            pid = ?child.id(),
            "Started transcode"
        );

        let mut chunks = ReaderStream::with_capacity(stdout, CHUNK_SIZE);

        let first = match chunks.next().await {
            Some(Ok(chunk)) => Some(chunk),
            Some(Err(e)) => {
                return Err(Error::transcode(&tool, format!("reading output: {e}")));
            }
            None => {
                let status = child
                    .wait()
                    .await
                    .map_err(|e| Error::transcode(&tool, format!("waiting for exit: {e}")))?;
                if !status.success() {
                    let tail = stderr_tail(stderr).await;
                    tracing::warn!(status = %status, stderr = %tail, "Encoder failed before output");
                    return Err(Error::transcode(
                        &tool,
                        format!("exited with status {status}: {tail}"),
                    ));
                }
                None
            }
        };

        let stream = async_stream::try_stream! {
            // Owning the child here ties its lifetime to the body.
            let mut child = child;
            if let Some(chunk) = first {
                yield chunk;
                while let Some(chunk) = chunks.next().await {
                    yield chunk?;
                }
                let status = child.wait().await?;
                if !status.success() {
                    let tail = stderr_tail(stderr).await;
                    tracing::warn!(status = %status, stderr = %tail, "Encoder failed mid-stream");
                    Err::<(), _>(io::Error::new(
                        io::ErrorKind::Other,
                        format!("{tool} exited with status {status}: {tail}"),
                    ))?;
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Log encoder stderr and return its last few bytes.
async fn drain_stderr(stderr: ChildStderr) -> String {
    let mut lines = BufReader::new(stderr).lines();
    let mut tail = String::new();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(target: "bc_av::encoder", "{line}");
        tail.push_str(&line);
        tail.push('\n');
        if tail.len() > STDERR_TAIL * 2 {
            let mut cut = tail.len() - STDERR_TAIL;
            while !tail.is_char_boundary(cut) {
                cut += 1;
            }
            tail.drain(..cut);
        }
    }
    tail.trim().to_string()
}

async fn stderr_tail(task: Option<tokio::task::JoinHandle<String>>) -> String {
    match task {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    }
}
