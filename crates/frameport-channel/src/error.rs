/// Errors that can occur in channel operations.
///
/// Only [`TransportError::Configuration`] crosses the public boundary as a
/// returned error; [`TransportError::Discarded`] and
/// [`TransportError::Encode`] reach callers through a [`crate::Delivery`].
/// Everything else is logged where it happens and the message is dropped.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The transport was configured with an invalid value.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Posting to a single endpoint failed.
    #[error("transmission to {endpoint} failed: {source}")]
    Transmission {
        endpoint: String,
        source: frameport_context::ContextError,
    },

    /// The sender of an inbound message could not be attributed.
    #[error("unable to determine the source of '{event_type}'")]
    Attribution { event_type: String },

    /// An inbound payload could not be decoded.
    #[error("decode failed: {0}")]
    Decode(#[source] frameport_codec::CodecError),

    /// An outbound event could not be encoded.
    #[error("encode failed: {0}")]
    Encode(#[source] frameport_codec::CodecError),

    /// A tagged message arrived before any handler was registered.
    #[error("no channel handler registered for '{event_type}'")]
    MissingHandler { event_type: String },

    /// A buffered send was abandoned before it could be delivered.
    #[error("transport discarded before delivery")]
    Discarded,
}

pub type Result<T> = std::result::Result<T, TransportError>;
