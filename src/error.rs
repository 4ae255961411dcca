use thiserror::Error;

/// Errors produced by the stream controller and its transport.
///
/// Transient parse failures during streaming are *not* errors; they are the
/// normal state of a half-received document and are retried on the next
/// chunk. Everything here is either a transport problem or a terminal
/// decoding problem.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Low-level HTTP transport failure (connection refused, timeout,
    /// body read aborted, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server rejected the generation request with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code (e.g. 401, 429, 500).
        status: u16,
        /// Response body text.
        body: String,
    },

    /// JSON decoding failed at the serde level.
    #[error("JSON decoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The terminal completion event's embedded payload could not be parsed
    /// even after repair. Partial state stays visible but is known to be
    /// non-authoritative.
    #[error("authoritative payload could not be parsed: {detail}")]
    Authoritative { detail: String },

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for StreamError {
    fn from(err: anyhow::Error) -> Self {
        StreamError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
