use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use frameport_codec::Event;
use tokio::sync::oneshot;

use crate::error::{Result, TransportError};

/// Completion side of a pending send. Consumed exactly once.
pub(crate) struct Completion(oneshot::Sender<Result<()>>);

impl Completion {
    pub(crate) fn resolve(self) {
        let _ = self.0.send(Ok(()));
    }

    pub(crate) fn reject(self, err: TransportError) {
        let _ = self.0.send(Err(err));
    }
}

/// Outcome of a send.
///
/// Resolves to `Ok(())` once the event has been handed to every resolved
/// endpoint (individual endpoint failures are logged, not reported), or to
/// [`TransportError::Discarded`] if the transport dropped it while it was
/// still buffered. There is no timeout: a buffered send stays pending until
/// a peer appears or the transport goes away.
#[must_use = "a Delivery does nothing unless awaited or inspected"]
pub struct Delivery {
    rx: oneshot::Receiver<Result<()>>,
}

impl Delivery {
    pub(crate) fn pending() -> (Self, Completion) {
        let (tx, rx) = oneshot::channel();
        (Self { rx }, Completion(tx))
    }
}

impl Future for Delivery {
    type Output = Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(TransportError::Discarded)))
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery").finish_non_exhaustive()
    }
}

/// An event waiting for a peer, together with its caller's completion.
pub(crate) struct BufferedSend {
    pub(crate) event: Event,
    pub(crate) completion: Completion,
}

/// FIFO of sends issued while no endpoint was resolvable.
#[derive(Default)]
pub struct OutboundBuffer {
    entries: VecDeque<BufferedSend>,
}

impl OutboundBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Event types in insertion order.
    pub fn event_types(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.event.event_type.clone())
            .collect()
    }

    pub(crate) fn push(&mut self, event: Event, completion: Completion) {
        self.entries.push_back(BufferedSend { event, completion });
    }

    /// Remove every entry at once, preserving insertion order.
    pub(crate) fn take_all(&mut self) -> Vec<BufferedSend> {
        self.entries.drain(..).collect()
    }

    /// Reject every entry with [`TransportError::Discarded`].
    pub(crate) fn discard_all(&mut self) -> usize {
        let entries = self.take_all();
        let count = entries.len();
        for entry in entries {
            entry.completion.reject(TransportError::Discarded);
        }
        count
    }
}

impl fmt::Debug for OutboundBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundBuffer")
            .field("pending", &self.event_types())
            .finish()
    }
}
