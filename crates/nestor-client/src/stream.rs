// SPDX-License-Identifier: MIT OR Apache-2.0
//! Progressive console output.
//!
//! Jenkins serves a build's console through `logText/progressiveText`: each
//! poll returns the text after a byte offset, the new offset in
//! `X-Text-Size`, and `X-More-Data: true` while the build is still writing.
//! [`JenkinsClient::console_stream`] runs that poll loop on a background
//! task and hands out the text as a stream of chunks.

use crate::cancel::CancellationToken;
use crate::client::JenkinsClient;
use futures::StreamExt;
use nestor_error::{ErrorCode, NestorError, Result};
use reqwest::Method;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

/// Header carrying the offset for the next poll.
pub const TEXT_SIZE_HEADER: &str = "x-text-size";
/// Header that is `"true"` while more output is expected.
pub const MORE_DATA_HEADER: &str = "x-more-data";

const CHUNK_BUFFER: usize = 64;

/// One poll of the progressive log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChunk {
    /// Text after the requested offset; may be empty.
    pub text: String,
    /// Offset reported by the server, if any.
    pub next_offset: Option<u64>,
    /// Whether the server expects more output.
    pub has_more: bool,
}

/// Offset bookkeeping for one stream. The offset never moves backwards.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamSession {
    offset: u64,
}

impl StreamSession {
    /// Current offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Fold in the offset from a poll.
    pub fn advance(&mut self, next: Option<u64>) {
        if let Some(next) = next {
            self.offset = self.offset.max(next);
        }
    }
}

/// A running console stream.
///
/// `chunks` yields each non-empty piece of text in order. The stream ends
/// when the build finishes, on cancellation, or on error; `completion` then
/// resolves to the terminal result (errors are reported there exactly once).
pub struct ConsoleStream {
    /// Non-empty text chunks, in server order.
    pub chunks: ReceiverStream<String>,
    /// Terminal result of the pump task.
    pub completion: JoinHandle<Result<()>>,
    cancel: CancellationToken,
}

impl ConsoleStream {
    /// Stop polling. Safe to call at any time, any number of times.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A token that cancels this stream when triggered.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drain every chunk, then wait for the terminal result.
    pub async fn collect(mut self) -> (Vec<String>, Result<()>) {
        let mut chunks = Vec::new();
        while let Some(chunk) = self.chunks.next().await {
            chunks.push(chunk);
        }
        let result = match self.completion.await {
            Ok(result) => result,
            Err(e) => Err(NestorError::new(
                ErrorCode::Internal,
                format!("console stream task failed: {e}"),
            )),
        };
        (chunks, result)
    }
}

impl JenkinsClient {
    /// Fetch the console text of the latest build of `job` from `offset`.
    pub async fn progressive_text(&self, job: &str, offset: u64) -> Result<LogChunk> {
        let url = self.endpoint(&["job", job, "lastBuild", "logText", "progressiveText"]);
        let raw = self
            .fetch(Method::GET, url, &[("start", offset.to_string())])
            .await?
            .into_success(|| NestorError::job_not_found(job))?;
        let next_offset = raw
            .header(TEXT_SIZE_HEADER)
            .and_then(|v| v.trim().parse().ok());
        let has_more = raw
            .header(MORE_DATA_HEADER)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        Ok(LogChunk {
            text: raw.body,
            next_offset,
            has_more,
        })
    }

    /// Stream the console of the latest build of `job`, polling every
    /// configured interval until the build completes.
    pub fn console_stream(&self, job: &str) -> ConsoleStream {
        self.console_stream_every(job, self.config().poll_interval())
    }

    /// [`console_stream`](Self::console_stream) with an explicit interval.
    pub fn console_stream_every(&self, job: &str, interval: Duration) -> ConsoleStream {
        let (tx, rx) = mpsc::channel(CHUNK_BUFFER);
        let cancel = CancellationToken::new();
        let completion = tokio::spawn(pump(
            self.clone(),
            job.to_string(),
            interval,
            tx,
            cancel.clone(),
        ));
        ConsoleStream {
            chunks: ReceiverStream::new(rx),
            completion,
            cancel,
        }
    }
}

async fn pump(
    client: JenkinsClient,
    job: String,
    interval: Duration,
    tx: mpsc::Sender<String>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut session = StreamSession::default();
    debug!(target: "nestor.stream", job = %job, "console stream started");
    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(target: "nestor.stream", job = %job, "console stream cancelled");
                return Ok(());
            }
            chunk = client.progressive_text(&job, session.offset()) => chunk?,
        };
        session.advance(chunk.next_offset);
        debug!(
            target: "nestor.stream",
            job = %job,
            offset = session.offset(),
            bytes = chunk.text.len(),
            more = chunk.has_more,
            "console poll"
        );

        if !chunk.text.is_empty() {
            // A full channel must not hold off cancellation.
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(target: "nestor.stream", job = %job, "console stream cancelled");
                    return Ok(());
                }
                sent = tx.send(chunk.text) => if sent.is_err() {
                    debug!(target: "nestor.stream", job = %job, "console consumer dropped");
                    return Ok(());
                }
            }
        }
        if !chunk.has_more {
            debug!(target: "nestor.stream", job = %job, offset = session.offset(), "console stream finished");
            return Ok(());
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(target: "nestor.stream", job = %job, "console stream cancelled");
                return Ok(());
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
