use reqwest::StatusCode;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GrabError>;

#[derive(Debug, Error)]
pub enum GrabError {
    /// Transport error or a response with status >= 400.
    #[error("request to {url} failed: {reason}")]
    RequestFailed {
        url: String,
        status: Option<StatusCode>,
        reason: String,
    },

    /// The server does not advertise `Accept-Ranges: bytes`.
    #[error("server does not accept byte ranges, chunked download disabled")]
    RangeNotSupported,

    /// A chunk that was still empty after every retry attempt.
    #[error("chunk {index} missed after {attempts} attempts: {reason}")]
    ChunkMissed {
        index: usize,
        attempts: u32,
        reason: String,
    },

    #[error("failed to write {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid transfer metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("hash mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

impl GrabError {
    pub(crate) fn request(url: &str, err: reqwest::Error) -> Self {
        GrabError::RequestFailed {
            url: url.to_string(),
            status: err.status(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn status(url: &str, status: StatusCode) -> Self {
        GrabError::RequestFailed {
            url: url.to_string(),
            status: Some(status),
            reason: format!("server responded with {}", status),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        GrabError::WriteFailed {
            path: path.into(),
            source,
        }
    }

    /// Whether the failure should end the whole run rather than a single request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GrabError::WriteFailed { .. } | GrabError::ChecksumMismatch { .. }
        )
    }
}
