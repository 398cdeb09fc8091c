use frameport_codec::CodecOptions;

use crate::role::Role;

/// Attribute marking a frame as a channel peer.
pub const DEFAULT_PEER_ATTRIBUTE: &str = "data-frameport";
/// Attribute marking a peer frame as finished loading.
pub const DEFAULT_LOADED_ATTRIBUTE: &str = "data-frameport-loaded";
/// Element id of the primary peer frame.
pub const DEFAULT_PRIMARY_FRAME_ID: &str = "frameport-preview-frame";
/// Query parameter carrying the correlation id.
pub const DEFAULT_CORRELATION_PARAM: &str = "refId";
/// Default container nesting limit for outbound events.
pub const DEFAULT_MAX_DEPTH: usize = 25;

/// How frames are discovered in the host document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryMarkers {
    pub peer_attribute: String,
    pub loaded_attribute: String,
    pub primary_frame_id: String,
    pub correlation_param: String,
}

impl Default for DiscoveryMarkers {
    fn default() -> Self {
        Self {
            peer_attribute: DEFAULT_PEER_ATTRIBUTE.to_string(),
            loaded_attribute: DEFAULT_LOADED_ATTRIBUTE.to_string(),
            primary_frame_id: DEFAULT_PRIMARY_FRAME_ID.to_string(),
            correlation_param: DEFAULT_CORRELATION_PARAM.to_string(),
        }
    }
}

/// What a host does when a named target matches no loaded peer frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetFallback {
    /// Address every declared peer frame, loaded or not.
    #[default]
    AllDeclaredPeers,
    /// Address nothing; the send is buffered.
    Disabled,
}

/// Transport configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub role: Role,
    pub markers: DiscoveryMarkers,
    /// Codec options applied beneath the process-wide override.
    pub default_options: CodecOptions,
    pub fallback: TargetFallback,
}

impl TransportConfig {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            markers: DiscoveryMarkers::default(),
            default_options: CodecOptions {
                allow_function: Some(true),
                max_depth: Some(DEFAULT_MAX_DEPTH),
                ..CodecOptions::default()
            },
            fallback: TargetFallback::default(),
        }
    }

    pub fn with_markers(mut self, markers: DiscoveryMarkers) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_default_options(mut self, options: CodecOptions) -> Self {
        self.default_options = options;
        self
    }

    pub fn with_fallback(mut self, fallback: TargetFallback) -> Self {
        self.fallback = fallback;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TransportConfig::new(Role::Host);
        assert_eq!(config.markers.peer_attribute, DEFAULT_PEER_ATTRIBUTE);
        assert_eq!(config.markers.primary_frame_id, DEFAULT_PRIMARY_FRAME_ID);
        assert_eq!(config.default_options.allow_function, Some(true));
        assert_eq!(config.default_options.max_depth, Some(DEFAULT_MAX_DEPTH));
        assert_eq!(config.fallback, TargetFallback::AllDeclaredPeers);
    }

    #[test]
    fn builder_overrides() {
        let config = TransportConfig::new(Role::Embedded)
            .with_fallback(TargetFallback::Disabled)
            .with_default_options(CodecOptions::default());
        assert_eq!(config.fallback, TargetFallback::Disabled);
        assert!(config.default_options.is_empty());
    }
}
