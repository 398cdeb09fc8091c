//! Structured value encoding for cross-context channels.
//!
//! The wire between two browsing contexts only carries strings. This crate
//! turns a structured [`Value`] (including values plain JSON cannot hold:
//! dates, regular expressions, functions, symbols, `undefined` and class
//! instances) into a transportable string and back, and defines the tagged
//! [`Envelope`] every channel message travels in.
//!
//! The [`Encoder`] trait is the seam: [`JsonEncoder`] is the default, and
//! anything else that honours [`CodecOptions`] can be plugged in.

pub mod encoder;
pub mod envelope;
pub mod error;
pub mod options;
pub mod value;

pub use encoder::{is_json, Encoder, JsonEncoder};
pub use envelope::{decode_envelope, Envelope, Event, KEY};
pub use error::{CodecError, Result};
pub use options::CodecOptions;
pub use value::{Map, Value};
