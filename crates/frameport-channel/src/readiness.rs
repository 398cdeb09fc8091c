use std::cell::Cell;

/// One-way connection flag: starts disconnected, connects at most once.
#[derive(Debug, Default)]
pub struct Readiness {
    connected: Cell<bool>,
}

impl Readiness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    /// Connect if not yet connected and `has_local_peer` reports a peer.
    ///
    /// `flush` runs before the state flips. Returns whether this call made
    /// the transition. Once connected, neither closure is invoked again.
    pub(crate) fn connect_with(
        &self,
        has_local_peer: impl FnOnce() -> bool,
        flush: impl FnOnce(),
    ) -> bool {
        if self.connected.get() || !has_local_peer() {
            return false;
        }
        flush();
        self.connected.set(true);
        true
    }
}
