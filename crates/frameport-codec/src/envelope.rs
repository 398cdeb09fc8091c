use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};
use crate::value::{Map, Value};

/// Tag identifying frameport messages among unrelated cross-context traffic.
pub const KEY: &str = "frameport-channel";

/// An application-level event carried by the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Positional arguments.
    #[serde(default)]
    pub args: Vec<Value>,
    /// Attributed origin of the sender, set on receipt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Correlation id copied from the envelope, set on receipt.
    #[serde(default, rename = "refId", skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    /// Fields this layer does not interpret, carried through unchanged.
    #[serde(flatten)]
    pub extra: Map,
}

impl Event {
    pub fn new(event_type: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            event_type: event_type.into(),
            args,
            source: None,
            ref_id: None,
            extra: Map::new(),
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        into_value(self, "event")
    }

    pub fn from_value(value: Value) -> Result<Self> {
        from_value(&value, "event")
    }
}

/// The wire unit: a tagged event plus an optional correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub key: String,
    pub event: Event,
    #[serde(default, rename = "refId", skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
}

impl Envelope {
    /// Wrap `event` with this protocol's tag.
    pub fn new(event: Event, ref_id: Option<String>) -> Self {
        Self {
            key: KEY.to_string(),
            event,
            ref_id,
        }
    }

    /// Whether the envelope carries this protocol's tag.
    pub fn is_tagged(&self) -> bool {
        self.key == KEY
    }

    pub fn to_value(&self) -> Result<Value> {
        into_value(self, "envelope")
    }

    /// Validate and convert a decoded value, whatever its tag.
    pub fn from_value(value: Value) -> Result<Self> {
        from_value(&value, "envelope")
    }
}

/// Extract a frameport envelope from a decoded value.
///
/// Returns `Ok(None)` for values that do not carry the protocol tag: those
/// belong to other traffic on the same wire and are not errors. A tagged
/// value with a malformed body is a shape error.
pub fn decode_envelope(value: Value) -> Result<Option<Envelope>> {
    let tagged = value
        .get("key")
        .and_then(Value::as_str)
        .is_some_and(|key| key == KEY);
    if !tagged {
        return Ok(None);
    }
    Envelope::from_value(value).map(Some)
}

fn into_value<T: Serialize>(item: &T, what: &str) -> Result<Value> {
    serde_json::to_value(item)
        .and_then(Value::deserialize)
        .map_err(|err| CodecError::Shape(format!("unrepresentable {what}: {err}")))
}

fn from_value<T: for<'de> Deserialize<'de>>(value: &Value, what: &str) -> Result<T> {
    serde_json::to_value(value)
        .and_then(serde_json::from_value)
        .map_err(|err| CodecError::Shape(format!("malformed {what}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{Encoder, JsonEncoder};
    use crate::options::CodecOptions;

    fn decode(text: &str) -> Result<Option<Envelope>> {
        let value = JsonEncoder.decode(text, &CodecOptions::default())?;
        decode_envelope(value)
    }

    #[test]
    fn envelope_wire_shape() {
        let envelope = Envelope::new(
            Event::new("storyChanged", vec![Value::from("button--primary")]),
            Some("session-1".to_string()),
        );

        let text = JsonEncoder
            .encode(&envelope.to_value().unwrap(), &CodecOptions::default())
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(json["key"], KEY);
        assert_eq!(json["event"]["type"], "storyChanged");
        assert_eq!(json["event"]["args"][0], "button--primary");
        assert_eq!(json["refId"], "session-1");
        assert!(json["event"].get("source").is_none());
    }

    #[test]
    fn decodes_tagged_envelope() {
        let envelope = decode(
            r#"{"key":"frameport-channel","event":{"type":"ping","args":[1]},"refId":"r-7"}"#,
        )
        .unwrap()
        .expect("tagged envelope");

        assert!(envelope.is_tagged());
        assert_eq!(envelope.event.event_type, "ping");
        assert_eq!(envelope.event.args, vec![Value::from(1i64)]);
        assert_eq!(envelope.ref_id.as_deref(), Some("r-7"));
    }

    #[test]
    fn foreign_traffic_is_not_an_envelope() {
        assert!(decode(r#"{"key":"devtools","event":{"type":"x"}}"#)
            .unwrap()
            .is_none());
        assert!(decode(r#"{"type":"webpackOk"}"#).unwrap().is_none());
        assert!(decode("[1,2,3]").unwrap().is_none());
    }

    #[test]
    fn tagged_envelope_with_bad_event_is_shape_error() {
        let result = decode(r#"{"key":"frameport-channel","event":{"args":[]}}"#);
        assert!(matches!(result, Err(CodecError::Shape(_))));

        let result = decode(r#"{"key":"frameport-channel","event":{"type":"x","args":"no"}}"#);
        assert!(matches!(result, Err(CodecError::Shape(_))));

        let result = decode(r#"{"key":"frameport-channel"}"#);
        assert!(matches!(result, Err(CodecError::Shape(_))));
    }

    #[test]
    fn missing_args_default_to_empty() {
        let envelope = decode(r#"{"key":"frameport-channel","event":{"type":"x"}}"#)
            .unwrap()
            .unwrap();
        assert!(envelope.event.args.is_empty());
        assert!(envelope.ref_id.is_none());
    }

    #[test]
    fn event_round_trips_through_encoder() {
        let mut event = Event::new(
            "updateArgs",
            vec![Value::from(serde_json::json!({ "label": "Hi", "count": 2 }))],
        );
        event.source = Some("http://localhost:6006/iframe.html".to_string());
        event.ref_id = Some("abc".to_string());
        let envelope = Envelope::new(event, Some("abc".to_string()));

        let options = CodecOptions::default();
        let text = JsonEncoder.encode(&envelope.to_value().unwrap(), &options).unwrap();
        let decoded = decode_envelope(JsonEncoder.decode(&text, &options).unwrap())
            .unwrap()
            .unwrap();

        assert_eq!(decoded, envelope);
    }

    #[test]
    fn uninterpreted_event_fields_are_preserved() {
        let envelope = decode(
            r#"{"key":"frameport-channel","event":{"type":"x","from":"manager","args":[]}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(envelope.event.extra.get("from"), Some(&Value::from("manager")));

        let text = JsonEncoder
            .encode(&envelope.to_value().unwrap(), &CodecOptions::default())
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["event"]["from"], "manager");
        assert_eq!(json["event"]["type"], "x");
    }

    #[test]
    fn special_values_in_args_survive_envelope_conversion() {
        let envelope = Envelope::new(
            Event::new(
                "matcher",
                vec![
                    Value::RegExp {
                        source: "^btn".to_string(),
                        flags: "g".to_string(),
                    },
                    Value::Undefined,
                ],
            ),
            None,
        );

        let value = envelope.to_value().unwrap();
        assert_eq!(Envelope::from_value(value).unwrap(), envelope);
    }
}
