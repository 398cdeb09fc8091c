/// Errors that can occur when touching a browsing context.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// The target context has been closed.
    #[error("context {0} is closed")]
    Closed(u64),

    /// The handle cannot be inspected across origins.
    #[error("blocked a cross-origin access to context {0}")]
    CrossOrigin(u64),

    /// The context is no longer attached to any document.
    #[error("context is detached")]
    Detached,

    /// A context address could not be parsed.
    #[error("invalid context address '{address}': {source}")]
    InvalidUrl {
        address: String,
        source: url::ParseError,
    },
}

pub type Result<T> = std::result::Result<T, ContextError>;
