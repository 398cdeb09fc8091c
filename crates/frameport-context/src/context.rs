use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use frameport_codec::{CodecOptions, Value};
use url::Url;

use crate::error::{ContextError, Result};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a browsing context. Two handles to the same context share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Allocate a process-unique id.
    pub fn next() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// A live handle to a remote context that can receive a posted message.
///
/// Handles are owned by the environment and can go stale at any time, so
/// callers should resolve them fresh instead of caching them.
pub trait Endpoint {
    /// Identity of the context behind this handle.
    fn id(&self) -> ContextId;

    /// Post `message` to the context, one-way.
    ///
    /// `target_origin` restricts delivery to a context with that origin;
    /// `"*"` delivers regardless of origin.
    fn post_message(&self, message: &str, target_origin: &str) -> Result<()>;
}

/// Payload of a cross-context message as delivered by the environment.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    /// A string, usually produced by an encoder.
    Text(String),
    /// Already-structured data posted without an encoder.
    Structured(Value),
}

impl RawPayload {
    /// Size in bytes of a text payload.
    pub fn text_len(&self) -> Option<usize> {
        match self {
            RawPayload::Text(text) => Some(text.len()),
            RawPayload::Structured(_) => None,
        }
    }
}

/// A message delivered to a context's listener.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub data: RawPayload,
    /// Origin the environment reports for the sender.
    pub origin: String,
    /// Handle identity of the sender, when the environment exposes one.
    pub source: Option<ContextId>,
}

/// Listener invoked for every message delivered to a context.
pub type MessageListener = Box<dyn Fn(MessageEvent)>;

/// A child frame element as seen from its parent document.
#[derive(Clone, Default)]
pub struct FrameElement {
    id: Option<String>,
    attributes: BTreeMap<String, String>,
    src: Option<String>,
    content: Option<Rc<dyn Endpoint>>,
    cross_origin: bool,
}

impl FrameElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_src(mut self, src: impl Into<String>) -> Self {
        self.src = Some(src.into());
        self
    }

    pub fn with_content(mut self, content: Rc<dyn Endpoint>) -> Self {
        self.content = Some(content);
        self
    }

    /// Mark the frame's content as belonging to another origin, which makes
    /// handle comparison fail.
    pub fn with_cross_origin(mut self, cross_origin: bool) -> Self {
        self.cross_origin = cross_origin;
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Configured address of the frame, as written (possibly relative).
    pub fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    /// Handle to the frame's content context, if it has one.
    pub fn content_window(&self) -> Option<Rc<dyn Endpoint>> {
        self.content.clone()
    }

    /// Compare the frame's content handle against a sender identity.
    pub fn is_content_of(&self, source: ContextId) -> Result<bool> {
        match &self.content {
            None => Ok(false),
            Some(content) if self.cross_origin => Err(ContextError::CrossOrigin(content.id().get())),
            Some(content) => Ok(content.id() == source),
        }
    }
}

impl fmt::Debug for FrameElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameElement")
            .field("id", &self.id)
            .field("attributes", &self.attributes)
            .field("src", &self.src)
            .field("content", &self.content.as_ref().map(|c| c.id()))
            .field("cross_origin", &self.cross_origin)
            .finish()
    }
}

/// The local browsing context a channel runs in.
pub trait BrowsingContext {
    /// Identity of this context.
    fn id(&self) -> ContextId;

    /// Handle to the parent context. A top-level context is its own parent.
    fn parent(&self) -> Option<Rc<dyn Endpoint>>;

    /// Child frame elements currently in the document, in document order.
    fn frames(&self) -> Vec<FrameElement>;

    /// Current address of this context.
    fn location(&self) -> Url;

    /// Process-wide codec override, read fresh on every send and receive.
    fn channel_options(&self) -> Option<CodecOptions>;

    /// Register a listener for messages delivered to this context.
    fn add_message_listener(&self, listener: MessageListener);

    /// Serialized origin of [`BrowsingContext::location`].
    fn origin(&self) -> String {
        self.location().origin().ascii_serialization()
    }
}
