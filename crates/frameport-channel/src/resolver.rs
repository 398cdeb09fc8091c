use std::rc::Rc;

use frameport_context::{BrowsingContext, Endpoint, FrameElement};
use tracing::debug;

use crate::config::{DiscoveryMarkers, TargetFallback, TransportConfig};
use crate::role::Role;

/// Computes the live endpoints a transport should address.
///
/// Nothing is cached: every call walks the context again, because frames
/// can appear, finish loading or go away between two sends.
pub struct TargetResolver<'a, C: ?Sized> {
    config: &'a TransportConfig,
    context: &'a C,
}

impl<'a, C: BrowsingContext + ?Sized> TargetResolver<'a, C> {
    pub fn new(config: &'a TransportConfig, context: &'a C) -> Self {
        Self { config, context }
    }

    /// Endpoints for a send addressed to `target`.
    ///
    /// A host only addresses loaded peer frames and requires a target; an
    /// embedded context only ever addresses its parent.
    pub fn resolve(&self, target: Option<&str>) -> Vec<Rc<dyn Endpoint>> {
        match self.config.role {
            Role::Host => self.host_targets(target),
            Role::Embedded => self.parent(),
        }
    }

    /// Every declared peer frame, loaded or not.
    pub fn declared_peers(&self) -> Vec<Rc<dyn Endpoint>> {
        declared_peers(&self.context.frames(), &self.config.markers)
    }

    /// Endpoints whose presence confirms the primary peer exists.
    pub fn local_frames(&self) -> Vec<Rc<dyn Endpoint>> {
        match self.config.role {
            Role::Host => {
                let primary = self.config.markers.primary_frame_id.as_str();
                self.context
                    .frames()
                    .iter()
                    .filter(|frame| frame.id() == Some(primary))
                    .filter_map(FrameElement::content_window)
                    .collect()
            }
            Role::Embedded => self.parent(),
        }
    }

    fn host_targets(&self, target: Option<&str>) -> Vec<Rc<dyn Endpoint>> {
        let Some(target) = target else {
            return Vec::new();
        };

        let markers = &self.config.markers;
        let frames = self.context.frames();
        let addressed = frames
            .iter()
            .filter(|frame| {
                frame.has_attribute(&markers.peer_attribute)
                    && frame.has_attribute(&markers.loaded_attribute)
            })
            .find(|frame| frame.id() == Some(target))
            .and_then(FrameElement::content_window);

        if let Some(endpoint) = addressed {
            return vec![endpoint];
        }

        match self.config.fallback {
            TargetFallback::AllDeclaredPeers => {
                let peers = declared_peers(&frames, markers);
                debug!(
                    requested = target,
                    peers = peers.len(),
                    "no loaded peer frame matches target, addressing all declared peers"
                );
                peers
            }
            TargetFallback::Disabled => Vec::new(),
        }
    }

    fn parent(&self) -> Vec<Rc<dyn Endpoint>> {
        match self.context.parent() {
            Some(parent) if parent.id() != self.context.id() => vec![parent],
            _ => Vec::new(),
        }
    }
}

fn declared_peers(frames: &[FrameElement], markers: &DiscoveryMarkers) -> Vec<Rc<dyn Endpoint>> {
    frames
        .iter()
        .filter(|frame| frame.has_attribute(&markers.peer_attribute))
        .filter_map(FrameElement::content_window)
        .collect()
}
