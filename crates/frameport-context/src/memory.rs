//! In-process browsing contexts.
//!
//! [`MemoryWindow`] models a window with a document of child frames, a parent
//! link and an inbox. Posting to a window only queues the message; nothing is
//! delivered until [`MemoryWindow::dispatch_pending`] runs, which mirrors the
//! asynchronous, one-at-a-time delivery of a real event loop.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

use frameport_codec::CodecOptions;
use tracing::{debug, trace};
use url::Url;

use crate::context::{
    BrowsingContext, ContextId, Endpoint, FrameElement, MessageEvent, MessageListener, RawPayload,
};
use crate::error::{ContextError, Result};

/// Declarative description of a child frame element.
#[derive(Debug, Clone)]
pub struct FrameSpec {
    id: String,
    src: Option<String>,
    attributes: BTreeMap<String, String>,
    cross_origin: bool,
}

impl FrameSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            src: None,
            attributes: BTreeMap::new(),
            cross_origin: false,
        }
    }

    /// Configured address. Defaults to the content window's address.
    pub fn src(mut self, src: impl Into<String>) -> Self {
        self.src = Some(src.into());
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Block handle comparison on this frame's content.
    pub fn cross_origin(mut self) -> Self {
        self.cross_origin = true;
        self
    }
}

struct MemoryFrame {
    spec: FrameSpec,
    content: Rc<WindowState>,
}

struct WindowState {
    id: ContextId,
    url: RefCell<Url>,
    parent: RefCell<Weak<WindowState>>,
    frames: RefCell<Vec<MemoryFrame>>,
    listeners: RefCell<Vec<Rc<dyn Fn(MessageEvent)>>>,
    inbox: RefCell<VecDeque<MessageEvent>>,
    closed: Cell<bool>,
    channel_options: RefCell<Option<CodecOptions>>,
}

impl WindowState {
    fn origin(&self) -> String {
        self.url.borrow().origin().ascii_serialization()
    }
}

/// Handle to `target` as seen from `viewer`; posts are attributed to `viewer`.
struct WindowProxy {
    target: Weak<WindowState>,
    target_id: ContextId,
    viewer: Weak<WindowState>,
}

impl Endpoint for WindowProxy {
    fn id(&self) -> ContextId {
        self.target_id
    }

    fn post_message(&self, message: &str, target_origin: &str) -> Result<()> {
        let target = self
            .target
            .upgrade()
            .ok_or(ContextError::Closed(self.target_id.get()))?;
        if target.closed.get() {
            return Err(ContextError::Closed(self.target_id.get()));
        }
        let viewer = self.viewer.upgrade().ok_or(ContextError::Detached)?;

        if target_origin != "*" && target_origin != target.origin() {
            trace!(
                target = %self.target_id,
                target_origin,
                "message dropped: target origin mismatch"
            );
            return Ok(());
        }

        target.inbox.borrow_mut().push_back(MessageEvent {
            data: RawPayload::Text(message.to_string()),
            origin: viewer.origin(),
            source: Some(viewer.id),
        });
        Ok(())
    }
}

/// An in-process window.
///
/// Cloning yields another handle to the same window.
#[derive(Clone)]
pub struct MemoryWindow {
    state: Rc<WindowState>,
}

impl MemoryWindow {
    /// Create a top-level window at `address`.
    pub fn new(address: &str) -> Result<Self> {
        Ok(Self {
            state: Rc::new(WindowState {
                id: ContextId::next(),
                url: RefCell::new(parse_url(address)?),
                parent: RefCell::new(Weak::new()),
                frames: RefCell::new(Vec::new()),
                listeners: RefCell::new(Vec::new()),
                inbox: RefCell::new(VecDeque::new()),
                closed: Cell::new(false),
                channel_options: RefCell::new(None),
            }),
        })
    }

    pub fn url(&self) -> Url {
        self.state.url.borrow().clone()
    }

    /// Navigate in place (same context, new address).
    pub fn set_location(&self, address: &str) -> Result<()> {
        *self.state.url.borrow_mut() = parse_url(address)?;
        Ok(())
    }

    /// Set or clear the process-wide codec override for this window.
    pub fn set_channel_options(&self, options: Option<CodecOptions>) {
        *self.state.channel_options.borrow_mut() = options;
    }

    /// Embed `child` as a frame of this window's document.
    pub fn attach_frame(&self, child: &MemoryWindow, spec: FrameSpec) {
        let spec = FrameSpec {
            src: spec.src.or_else(|| Some(child.url().to_string())),
            ..spec
        };
        *child.state.parent.borrow_mut() = Rc::downgrade(&self.state);
        debug!(parent = %self.state.id, child = %child.state.id, frame = %spec.id, "frame attached");
        self.state.frames.borrow_mut().push(MemoryFrame {
            spec,
            content: Rc::clone(&child.state),
        });
    }

    /// Remove the first frame with `id`, returning its content window.
    pub fn detach_frame(&self, id: &str) -> Option<MemoryWindow> {
        let mut frames = self.state.frames.borrow_mut();
        let index = frames.iter().position(|frame| frame.spec.id == id)?;
        let content = frames.remove(index).content;
        *content.parent.borrow_mut() = Weak::new();
        Some(MemoryWindow { state: content })
    }

    /// Set an attribute on the first frame with `id`.
    pub fn set_frame_attribute(&self, id: &str, name: &str, value: &str) -> bool {
        self.with_frame(id, |frame| {
            frame
                .spec
                .attributes
                .insert(name.to_string(), value.to_string());
        })
    }

    /// Remove an attribute from the first frame with `id`.
    pub fn remove_frame_attribute(&self, id: &str, name: &str) -> bool {
        self.with_frame(id, |frame| {
            frame.spec.attributes.remove(name);
        })
    }

    /// Close the window; later posts to it fail.
    pub fn close(&self) {
        self.state.closed.set(true);
    }

    /// Queue a message as if the environment delivered it.
    pub fn deliver(&self, message: MessageEvent) {
        self.state.inbox.borrow_mut().push_back(message);
    }

    /// Number of queued, undelivered messages.
    pub fn pending(&self) -> usize {
        self.state.inbox.borrow().len()
    }

    /// Remove queued messages without delivering them.
    pub fn take_pending(&self) -> Vec<MessageEvent> {
        self.state.inbox.borrow_mut().drain(..).collect()
    }

    /// Deliver queued messages to every listener, in arrival order.
    ///
    /// Messages queued by listeners during dispatch are delivered in the same
    /// call. Returns the number of messages delivered.
    pub fn dispatch_pending(&self) -> usize {
        let mut delivered = 0;
        loop {
            let next = self.state.inbox.borrow_mut().pop_front();
            let Some(message) = next else {
                break;
            };
            let listeners = self.state.listeners.borrow().clone();
            for listener in listeners {
                listener(message.clone());
            }
            delivered += 1;
        }
        delivered
    }

    fn with_frame(&self, id: &str, f: impl FnOnce(&mut MemoryFrame)) -> bool {
        let mut frames = self.state.frames.borrow_mut();
        match frames.iter_mut().find(|frame| frame.spec.id == id) {
            Some(frame) => {
                f(frame);
                true
            }
            None => false,
        }
    }
}

impl BrowsingContext for MemoryWindow {
    fn id(&self) -> ContextId {
        self.state.id
    }

    fn parent(&self) -> Option<Rc<dyn Endpoint>> {
        let parent = self.state.parent.borrow().upgrade();
        match parent {
            Some(parent) => Some(proxy(&parent, &self.state)),
            None => Some(proxy(&self.state, &self.state)),
        }
    }

    fn frames(&self) -> Vec<FrameElement> {
        self.state
            .frames
            .borrow()
            .iter()
            .map(|frame| {
                let mut element = FrameElement::new()
                    .with_cross_origin(frame.spec.cross_origin)
                    .with_id(frame.spec.id.clone());
                if let Some(src) = &frame.spec.src {
                    element = element.with_src(src.clone());
                }
                for (name, value) in &frame.spec.attributes {
                    element = element.with_attribute(name.clone(), value.clone());
                }
                element.with_content(proxy(&frame.content, &self.state))
            })
            .collect()
    }

    fn location(&self) -> Url {
        self.url()
    }

    fn channel_options(&self) -> Option<CodecOptions> {
        self.state.channel_options.borrow().clone()
    }

    fn add_message_listener(&self, listener: MessageListener) {
        self.state.listeners.borrow_mut().push(Rc::from(listener));
    }
}

impl fmt::Debug for MemoryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryWindow")
            .field("id", &self.state.id)
            .field("url", &self.state.url.borrow().as_str())
            .field("frames", &self.state.frames.borrow().len())
            .field("closed", &self.state.closed.get())
            .finish()
    }
}

fn proxy(target: &Rc<WindowState>, viewer: &Rc<WindowState>) -> Rc<dyn Endpoint> {
    Rc::new(WindowProxy {
        target: Rc::downgrade(target),
        target_id: target.id,
        viewer: Rc::downgrade(viewer),
    })
}

fn parse_url(address: &str) -> Result<Url> {
    Url::parse(address).map_err(|source| ContextError::InvalidUrl {
        address: address.to_string(),
        source,
    })
}
