//! Deferred-delivery message transport between browsing contexts.
//!
//! This is the "just works" layer. A [`PostMessageTransport`] runs in a host
//! document (addressing its child frames) or in an embedded frame
//! (addressing its parent). Sends issued before a peer exists are buffered
//! and flushed, in order, once one appears. Inbound messages are decoded,
//! checked for the protocol tag, attributed to a trusted source and handed
//! to a single registered handler.

pub mod attribution;
pub mod buffer;
pub mod config;
pub mod error;
pub mod inbound;
pub mod options;
pub mod readiness;
pub mod resolver;
pub mod role;
pub mod transport;

pub use buffer::{Delivery, OutboundBuffer};
pub use config::{DiscoveryMarkers, TargetFallback, TransportConfig};
pub use error::{Result, TransportError};
pub use options::SendOptions;
pub use readiness::Readiness;
pub use resolver::TargetResolver;
pub use role::Role;
pub use transport::{create_transport, ChannelHandler, PostMessageTransport};
