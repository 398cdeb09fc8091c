//! Browsing-context abstraction.
//!
//! Provides a unified interface over the pieces of a windowing environment a
//! cross-context channel needs:
//! - [`Endpoint`]: a live handle that can receive a posted string
//! - [`BrowsingContext`]: the local context (identity, parent, child frames,
//!   location, process-wide codec override, message listener)
//!
//! This is the lowest environment-facing layer of frameport. The [`memory`]
//! module provides a complete in-process implementation.

pub mod context;
pub mod error;
pub mod memory;

pub use context::{
    BrowsingContext, ContextId, Endpoint, FrameElement, MessageEvent, MessageListener, RawPayload,
};
pub use error::{ContextError, Result};
pub use memory::{FrameSpec, MemoryWindow};
