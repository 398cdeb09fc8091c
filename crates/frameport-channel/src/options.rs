use frameport_codec::CodecOptions;

/// Per-call send options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Element id of the frame to address (host role only).
    pub target: Option<String>,
    /// Codec overrides for this send; they win over every other layer.
    pub codec: CodecOptions,
}

impl SendOptions {
    pub fn to_target(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::default()
        }
    }

    pub fn with_codec(mut self, codec: CodecOptions) -> Self {
        self.codec = codec;
        self
    }
}
