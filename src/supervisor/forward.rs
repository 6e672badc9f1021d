//! Forwarding of the child's output streams to the supervisor's own.
//!
//! Trigger streams are read line by line so each line can be handed to the
//! [`ReadinessDetector`]. Other streams are copied byte for byte.
//!
//! Errors caused by the child going away mid-read are expected and only
//! logged at debug level. Anything else is logged as a warning. Neither ends
//! the supervisor: its lifetime follows the child, not the pipes.

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use super::ReadinessDetector;

/// Error text that shows up when a pipe is torn down under a reader.
const BENIGN_PIPE_MESSAGES: &[&str] = &[
    "use of closed network connection",
    "file already closed",
    "broken pipe",
];

/// One of the child's output streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// Error raised while forwarding a stream.
#[derive(thiserror::Error, Debug)]
pub enum ForwardError {
    #[error("read failed: {0}")]
    Read(io::Error),
    #[error("write failed: {0}")]
    Write(io::Error),
    #[error("copy failed: {0}")]
    Copy(io::Error),
}

impl ForwardError {
    /// The underlying I/O error.
    #[must_use]
    pub fn io_error(&self) -> &io::Error {
        match self {
            Self::Read(e) | Self::Write(e) | Self::Copy(e) => e,
        }
    }

    /// Whether this error is an artifact of the child shutting down.
    #[must_use]
    pub fn is_benign(&self) -> bool {
        is_benign_pipe_error(self.io_error())
    }
}

/// How a forwarding task ended.
#[derive(Debug)]
pub enum ForwardOutcome {
    /// The source reached end of stream.
    Completed { bytes: u64 },
    /// The pipe was torn down while the child exited.
    ClosedByShutdown,
    /// A genuine I/O failure. Already logged.
    Failed(ForwardError),
}

/// Whether `err` is an expected artifact of the child closing its pipes.
#[must_use]
pub fn is_benign_pipe_error(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::BrokenPipe {
        return true;
    }
    let message = err.to_string().to_lowercase();
    BENIGN_PIPE_MESSAGES.iter().any(|m| message.contains(m))
}

/// Forward `source` to `destination`, scanning lines when a detector is given.
pub async fn forward_stream<R, W>(
    source: R,
    destination: W,
    stream: StreamKind,
    detector: Option<&ReadinessDetector>,
) -> ForwardOutcome
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match detector {
        Some(detector) => forward_lines(source, destination, stream, detector).await,
        None => forward_raw(source, destination, stream).await,
    }
}

/// Longest line handed to the detector in one piece. Longer runs without a
/// newline are forwarded and scanned in chunks of this size.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Forward `source` line by line, feeding every line to `detector`.
///
/// Each line is written with its terminator; a final unterminated line gets
/// one appended. Lines are matched as lossy UTF-8 but written unchanged.
///
/// A failed write is logged once and later lines are only scanned, so the
/// readiness marker is still seen after the destination goes away.
pub async fn forward_lines<R, W>(
    source: R,
    destination: W,
    stream: StreamKind,
    detector: &ReadinessDetector,
) -> ForwardOutcome
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    forward_lines_capped(source, destination, stream, detector, MAX_LINE_BYTES).await
}

async fn forward_lines_capped<R, W>(
    source: R,
    mut destination: W,
    stream: StreamKind,
    detector: &ReadinessDetector,
    max_line: usize,
) -> ForwardOutcome
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(source);
    let mut line = Vec::new();
    let mut bytes: u64 = 0;
    let mut write_failure: Option<ForwardError> = None;

    loop {
        line.clear();
        match read_line_capped(&mut reader, &mut line, max_line).await {
            Ok(0) => {
                return match write_failure {
                    Some(e) => outcome_of(e),
                    None => settle(stream, Ok(bytes)),
                }
            }
            Ok(_) => {}
            Err(e) => return settle(stream, Err(ForwardError::Read(e))),
        }

        if !line.ends_with(b"\n") && line.len() < max_line {
            line.push(b'\n');
        }

        if write_failure.is_none() {
            match write_line(&mut destination, &line).await {
                Ok(()) => bytes += line.len() as u64,
                Err(e) => {
                    let e = ForwardError::Write(e);
                    log_failure(stream, &e);
                    write_failure = Some(e);
                }
            }
        }

        let text = String::from_utf8_lossy(&line);
        detector
            .on_line(text.trim_end_matches(['\r', '\n']), stream)
            .await;
    }
}

/// Read up to and including the next newline, stopping early at `max` bytes.
async fn read_line_capped<R>(reader: &mut R, line: &mut Vec<u8>, max: usize) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut read = 0;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(read);
        }

        let room = max.saturating_sub(line.len());
        let window = &available[..available.len().min(room)];
        let (used, done) = match window.iter().position(|&b| b == b'\n') {
            Some(i) => (i + 1, true),
            None => (window.len(), line.len() + window.len() >= max),
        };

        line.extend_from_slice(&window[..used]);
        reader.consume(used);
        read += used;
        if done {
            return Ok(read);
        }
    }
}

/// Copy `source` to `destination` without looking at the content.
pub async fn forward_raw<R, W>(mut source: R, mut destination: W, stream: StreamKind) -> ForwardOutcome
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let result = tokio::io::copy(&mut source, &mut destination)
        .await
        .map_err(ForwardError::Copy);
    settle(stream, result)
}

async fn write_line<W>(destination: &mut W, line: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    destination.write_all(line).await?;
    destination.flush().await
}

fn settle(stream: StreamKind, result: Result<u64, ForwardError>) -> ForwardOutcome {
    match result {
        Ok(bytes) => {
            tracing::debug!(%stream, bytes, "Stream reached end");
            ForwardOutcome::Completed { bytes }
        }
        Err(e) => {
            log_failure(stream, &e);
            outcome_of(e)
        }
    }
}

fn log_failure(stream: StreamKind, error: &ForwardError) {
    if error.is_benign() {
        tracing::debug!(%stream, %error, "Stream closed during shutdown");
    } else {
        tracing::warn!(%stream, %error, "Stream forwarding error");
    }
}

fn outcome_of(error: ForwardError) -> ForwardOutcome {
    if error.is_benign() {
        ForwardOutcome::ClosedByShutdown
    } else {
        ForwardOutcome::Failed(error)
    }
}
