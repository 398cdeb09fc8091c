use std::fmt;
use std::str::FromStr;

use crate::error::TransportError;

/// Which side of the frame boundary a transport runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The document that owns the frames.
    Host,
    /// A document running inside a frame.
    Embedded,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Embedded => "embedded",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "host" => Ok(Role::Host),
            "embedded" => Ok(Role::Embedded),
            other => Err(TransportError::Configuration(format!(
                "role cannot be \"{other}\" (expected \"host\" or \"embedded\")"
            ))),
        }
    }
}
