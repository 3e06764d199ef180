//! Error taxonomy for ken-core.
//!
//! Every fallible operation returns one of these enums. None of them is fatal to
//! the client: the terminal front end turns each into a message string at the
//! boundary of the operation that failed, and the rest of the UI keeps working.

use thiserror::Error;

/// Failures of a single backend request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never completed (connection refused, reset, timeout, abort).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("API Error: {text}")]
    Status {
        /// Numeric HTTP status code.
        status: u16,
        /// Canonical reason phrase for the status, e.g. `Not Found`.
        text: String,
    },

    /// A document download answered with a content type the viewer cannot show.
    #[error("Unsupported file type: {0}. Only PDF, parsed and text documents are supported.")]
    UnsupportedContentType(String),

    /// The backend answered successfully but the entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The response body was not the JSON shape we expected.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Local I/O while preparing a request or storing a response.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Builds a status error from a `reqwest` status code.
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        ApiError::Status {
            status: status.as_u16(),
            text: status.canonical_reason().unwrap_or("Unknown Status").to_owned(),
        }
    }
}

/// Failures while decoding the agent event stream.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The body stream failed mid-read.
    #[error("stream interrupted: {0}")]
    Network(String),

    /// A `data: ` line did not hold a JSON event record.
    #[error("malformed stream event {line:?}: {source}")]
    MalformedEvent {
        line: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Rejections of a chat submission.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    /// A previous request is still streaming.
    #[error("a response is still streaming")]
    Busy,
    /// The prompt was empty after trimming.
    #[error("prompt is empty")]
    EmptyPrompt,
}

/// Failures reading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
