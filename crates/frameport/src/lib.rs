//! Deferred-delivery messaging between a host document and its embedded frames.
//!
//! frameport carries structured events over a string-only cross-context
//! wire. Sends issued before the other side exists are buffered and flushed
//! in order, inbound messages are attributed to a trusted peer, and values
//! plain JSON cannot represent survive the trip.
//!
//! # Crate Structure
//!
//! - [`codec`]: Structured values, codec options and the tagged envelope
//! - [`context`]: Browsing-context abstraction plus an in-memory implementation
//! - [`channel`]: The transport: target resolution, buffering, readiness, attribution

/// Re-export codec types.
pub mod codec {
    pub use frameport_codec::*;
}

/// Re-export browsing-context types.
pub mod context {
    pub use frameport_context::*;
}

/// Re-export transport types.
pub mod channel {
    pub use frameport_channel::*;
}
