/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum RqliteError {
    /// Connection string or connection options could not be used.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The remote API could not be reached or answered with a non-success status.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// Response body is not a well-formed result envelope.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// A submitted statement was rejected by the remote store.
    ///
    /// `message` is the remote store's error text, unmodified.
    #[error("{message}")]
    Execution {
        /// Position of the failing entry in the submitted batch, `None` when
        /// the envelope itself carried the error.
        statement_index: Option<usize>,
        message: String,
    },
    /// Interactive transaction control is not available over the HTTP API.
    #[error("{0} invalid for rqlite")]
    Unsupported(&'static str),
}

impl RqliteError {
    /// Returns the remote error text for [`RqliteError::Execution`].
    pub fn execution_message(&self) -> Option<&str> {
        match self {
            Self::Execution { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Failure reported by the HTTP capability before any JSON inspection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection, timeout, or body-read failure.
    #[error("request failed: {0}")]
    Request(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Non-success HTTP status code with raw response body.
    #[error("http error {status}: {body}")]
    Status { status: u16, body: String },
}

impl TransportError {
    /// Wraps any transport-level failure.
    pub fn request<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Request(Box::new(err))
    }
}
