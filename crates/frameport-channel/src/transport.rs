use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use frameport_codec::{CodecOptions, Encoder, Envelope, Event, JsonEncoder};
use frameport_context::{BrowsingContext, Endpoint, MessageEvent};
use tracing::{debug, error, info, warn};

use crate::buffer::{Completion, Delivery, OutboundBuffer};
use crate::config::TransportConfig;
use crate::error::{Result, TransportError};
use crate::inbound;
use crate::options::SendOptions;
use crate::readiness::Readiness;
use crate::resolver::TargetResolver;
use crate::role::Role;

/// The single inbound handler slot.
pub type ChannelHandler = Rc<dyn Fn(Event)>;

/// Deferred-delivery transport over a [`BrowsingContext`].
///
/// Sends that find no live endpoint are buffered; the buffer is flushed in
/// insertion order ahead of the next send that does find one, or when the
/// first inbound event confirms a local peer. All state is single-owner and
/// single-threaded.
pub struct PostMessageTransport<C> {
    config: TransportConfig,
    context: C,
    encoder: Box<dyn Encoder>,
    buffer: RefCell<OutboundBuffer>,
    handler: RefCell<Option<ChannelHandler>>,
    readiness: Readiness,
}

/// Build a transport for `role` ("host" or "embedded") that is already
/// listening on `context`.
pub fn create_transport<C: BrowsingContext + 'static>(
    role: &str,
    context: C,
) -> Result<Rc<PostMessageTransport<C>>> {
    let role: Role = role.parse()?;
    Ok(PostMessageTransport::new(TransportConfig::new(role), context).listen())
}

impl<C: BrowsingContext> PostMessageTransport<C> {
    /// Create a transport that is not yet receiving. See [`Self::listen`].
    pub fn new(config: TransportConfig, context: C) -> Self {
        Self {
            config,
            context,
            encoder: Box::new(JsonEncoder),
            buffer: RefCell::new(OutboundBuffer::new()),
            handler: RefCell::new(None),
            readiness: Readiness::new(),
        }
    }

    /// Replace the default [`JsonEncoder`].
    pub fn with_encoder(mut self, encoder: impl Encoder + 'static) -> Self {
        self.encoder = Box::new(encoder);
        self
    }

    /// Register as the context's message listener.
    ///
    /// The listener holds a weak reference: once the returned `Rc` is
    /// dropped, inbound messages are ignored and buffered sends are rejected
    /// with [`TransportError::Discarded`].
    pub fn listen(self) -> Rc<Self>
    where
        C: 'static,
    {
        let transport = Rc::new(self);
        let weak = Rc::downgrade(&transport);
        transport
            .context
            .add_message_listener(Box::new(move |message| {
                if let Some(transport) = weak.upgrade() {
                    transport.handle_message(message);
                }
            }));
        debug!(role = %transport.config.role, context = %transport.context.id(), "transport listening");
        transport
    }

    pub fn is_connected(&self) -> bool {
        self.readiness.is_connected()
    }

    /// Number of sends waiting for a peer.
    pub fn buffered(&self) -> usize {
        self.buffer.borrow().len()
    }

    /// Event types waiting for a peer, oldest first.
    pub fn buffered_event_types(&self) -> Vec<String> {
        self.buffer.borrow().event_types()
    }

    /// Install the inbound handler, replacing any previous one.
    pub fn set_handler(&self, handler: impl Fn(Event) + 'static) {
        *self.handler.borrow_mut() = Some(Rc::new(handler));
    }

    /// Send `event` to the endpoints `options` resolves to.
    ///
    /// The returned [`Delivery`] completes once the event has been handed to
    /// every endpoint. With no endpoint available it stays pending in the
    /// outbound buffer.
    pub fn send(&self, event: Event, options: SendOptions) -> Delivery {
        let (delivery, completion) = Delivery::pending();
        self.deliver(event, &options, completion);
        delivery
    }

    /// Process one raw inbound message. Failures are logged and the message
    /// is dropped.
    pub fn handle_message(&self, message: MessageEvent) {
        if let Err(err) = self.receive(&message) {
            error!(
                role = %self.config.role,
                origin = %message.origin,
                error = %err,
                "dropping inbound message"
            );
        }
    }

    /// Reject every buffered send with [`TransportError::Discarded`].
    pub fn discard_pending(&self) -> usize {
        let discarded = self.buffer.borrow_mut().discard_all();
        if discarded > 0 {
            debug!(role = %self.config.role, discarded, "discarded buffered sends");
        }
        discarded
    }

    fn resolver(&self) -> TargetResolver<'_, C> {
        TargetResolver::new(&self.config, &self.context)
    }

    fn deliver(&self, event: Event, options: &SendOptions, completion: Completion) {
        let endpoints = self.resolver().resolve(options.target.as_deref());
        if endpoints.is_empty() {
            let event_type = event.event_type.clone();
            let mut buffer = self.buffer.borrow_mut();
            buffer.push(event, completion);
            debug!(
                role = %self.config.role,
                event_type = %event_type,
                requested = ?options.target,
                buffered = buffer.len(),
                "no endpoint available, buffering"
            );
            return;
        }

        self.flush();

        match self.transmit(event, &endpoints, &options.codec) {
            Ok(()) => completion.resolve(),
            Err(err) => {
                error!(role = %self.config.role, error = %err, "unable to send event");
                completion.reject(err);
            }
        }
    }

    /// Redeliver every buffered event, oldest first, with default options.
    fn flush(&self) {
        let entries = self.buffer.borrow_mut().take_all();
        if entries.is_empty() {
            return;
        }
        debug!(role = %self.config.role, buffered = entries.len(), "flushing buffered sends");
        for entry in entries {
            self.deliver(entry.event, &SendOptions::default(), entry.completion);
        }

        // A host resolves no endpoint without a target, so its backlog stays put.
        let rebuffered = self.buffer.borrow().len();
        if self.config.role == Role::Host && rebuffered > 0 {
            warn!(
                role = %self.config.role,
                rebuffered,
                "buffered host sends carry no target and were buffered again; discard_pending drops them"
            );
        }
    }

    fn transmit(
        &self,
        event: Event,
        endpoints: &[Rc<dyn Endpoint>],
        per_call: &CodecOptions,
    ) -> Result<()> {
        let global = self.context.channel_options().unwrap_or_default();
        let options = self.config.default_options.merge(&global).merge(per_call);

        let event_type = event.event_type.clone();
        let envelope = Envelope::new(event, self.correlation_id());
        let wire = envelope
            .to_value()
            .and_then(|value| self.encoder.encode(&value, &options))
            .map_err(TransportError::Encode)?;

        for endpoint in endpoints {
            if let Err(source) = endpoint.post_message(&wire, "*") {
                let err = TransportError::Transmission {
                    endpoint: endpoint.id().to_string(),
                    source,
                };
                error!(
                    role = %self.config.role,
                    event_type = %event_type,
                    error = %err,
                    "transmission failed"
                );
            }
        }
        debug!(
            role = %self.config.role,
            event_type = %event_type,
            endpoints = endpoints.len(),
            size = wire.len(),
            "event sent"
        );
        Ok(())
    }

    /// Correlation id from the current location's query string.
    fn correlation_id(&self) -> Option<String> {
        let param = self.config.markers.correlation_param.as_str();
        self.context
            .location()
            .query_pairs()
            .find(|(name, _)| name == param)
            .map(|(_, value)| value.into_owned())
    }

    fn receive(&self, message: &MessageEvent) -> Result<()> {
        let Some(event) =
            inbound::validate(&self.config, &self.context, self.encoder.as_ref(), message)?
        else {
            return Ok(());
        };

        let local_origin = self.context.origin();
        match event.source.as_deref() {
            Some(source) if source.starts_with(local_origin.as_str()) => debug!(
                role = %self.config.role,
                event_type = %event.event_type,
                size = ?message.data.text_len(),
                "received event"
            ),
            source => debug!(
                role = %self.config.role,
                event_type = %event.event_type,
                size = ?message.data.text_len(),
                source = ?source,
                local_origin = %local_origin,
                "received event from another origin"
            ),
        }

        let handler = self
            .handler
            .borrow()
            .clone()
            .ok_or_else(|| TransportError::MissingHandler {
                event_type: event.event_type.clone(),
            })?;
        handler(event);

        let connected = self.readiness.connect_with(
            || !self.resolver().local_frames().is_empty(),
            || self.flush(),
        );
        if connected {
            info!(role = %self.config.role, "transport connected");
        }
        Ok(())
    }
}

impl<C> fmt::Debug for PostMessageTransport<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostMessageTransport")
            .field("config", &self.config)
            .field("buffer", &self.buffer.borrow())
            .field("has_handler", &self.handler.borrow().is_some())
            .field("readiness", &self.readiness)
            .finish_non_exhaustive()
    }
}
