/// Errors raised while delivering a batch to the metrics service.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The batch could not be encoded as JSON.
    #[error("Send: failed to encode batch: {0}")]
    Encode(#[from] serde_json::Error),

    /// Compressing the payload failed.
    #[error("Send: failed to compress payload: {0}")]
    Compress(#[from] std::io::Error),

    /// The request could not be built, sent, or timed out.
    #[error("Send: HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("Send: server responded {status}: {body}")]
    Status { status: u16, body: String },

    /// Every attempt in the retry schedule failed.
    #[error("Send: gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: usize,
        #[source]
        last: Box<SendError>,
    },
}

/// Convenience `Result` alias for delivery operations.
pub type Result<T> = std::result::Result<T, SendError>;
