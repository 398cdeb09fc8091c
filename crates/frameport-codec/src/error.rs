/// Errors that can occur while encoding or decoding channel payloads.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The payload is not valid JSON.
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload parsed but does not have the expected shape.
    #[error("unexpected payload shape: {0}")]
    Shape(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;
