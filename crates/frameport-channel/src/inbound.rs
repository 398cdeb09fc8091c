use frameport_codec::{
    decode_envelope, is_json, CodecError, CodecOptions, Encoder, Envelope, Event, Value,
};
use frameport_context::{BrowsingContext, MessageEvent, RawPayload};

use crate::attribution::attribute_source;
use crate::config::TransportConfig;
use crate::error::{Result, TransportError};

/// Decode a raw payload into a tagged envelope.
///
/// Strings that look like structured data go through `encoder`; anything
/// else is taken as already-structured data. `Ok(None)` means the payload is
/// not frameport traffic.
pub fn decode_payload(
    data: &RawPayload,
    encoder: &dyn Encoder,
    options: &CodecOptions,
) -> std::result::Result<Option<Envelope>, CodecError> {
    let value = match data {
        RawPayload::Text(text) if is_json(text) => encoder.decode(text, options)?,
        RawPayload::Text(text) => Value::String(text.clone()),
        RawPayload::Structured(value) => value.clone(),
    };
    decode_envelope(value)
}

/// Run an inbound message through decoding, tag check, correlation
/// propagation and source attribution.
///
/// Returns the event ready for the handler, `Ok(None)` for traffic that is
/// not ours, or the reason the message must be dropped.
pub fn validate<C: BrowsingContext + ?Sized>(
    config: &TransportConfig,
    context: &C,
    encoder: &dyn Encoder,
    message: &MessageEvent,
) -> Result<Option<Event>> {
    let options = context.channel_options().unwrap_or_default();
    let Some(envelope) =
        decode_payload(&message.data, encoder, &options).map_err(TransportError::Decode)?
    else {
        return Ok(None);
    };

    let mut event = envelope.event;
    if let Some(ref_id) = envelope.ref_id {
        event.ref_id = Some(ref_id);
    }

    let source =
        attribute_source(config, context, message).ok_or_else(|| TransportError::Attribution {
            event_type: event.event_type.clone(),
        })?;
    event.source = Some(source);

    Ok(Some(event))
}

#[cfg(test)]
mod tests {
    use frameport_codec::JsonEncoder;
    use frameport_context::{FrameSpec, MemoryWindow};

    use super::*;
    use crate::role::Role;

    fn wire(envelope: &Envelope) -> String {
        JsonEncoder
            .encode(&envelope.to_value().unwrap(), &CodecOptions::default())
            .unwrap()
    }

    fn text(data: String, origin: &str) -> MessageEvent {
        MessageEvent {
            data: RawPayload::Text(data),
            origin: origin.to_string(),
            source: None,
        }
    }

    #[test]
    fn plain_strings_are_not_envelopes() {
        let decoded = decode_payload(
            &RawPayload::Text("webpackHotUpdate".to_string()),
            &JsonEncoder,
            &CodecOptions::default(),
        )
        .unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn structured_payload_skips_the_encoder() {
        let envelope = Envelope::new(Event::new("ping", Vec::new()), None);
        let decoded = decode_payload(
            &RawPayload::Structured(envelope.to_value().unwrap()),
            &JsonEncoder,
            &CodecOptions::default(),
        )
        .unwrap();
        assert_eq!(decoded, Some(envelope));
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let result = decode_payload(
            &RawPayload::Text("{\"key\": ".to_string() + "}"),
            &JsonEncoder,
            &CodecOptions::default(),
        );
        assert!(matches!(result, Err(CodecError::Json(_))));
    }

    #[test]
    fn validate_copies_ref_id_and_attributes_source() {
        let config = TransportConfig::new(Role::Embedded);
        let frame = MemoryWindow::new("http://localhost:6006/iframe.html").unwrap();
        let envelope = Envelope::new(Event::new("ping", Vec::new()), Some("r-1".to_string()));

        let event = validate(
            &config,
            &frame,
            &JsonEncoder,
            &text(wire(&envelope), "http://localhost:6006"),
        )
        .unwrap()
        .expect("tagged event");

        assert_eq!(event.ref_id.as_deref(), Some("r-1"));
        assert_eq!(event.source.as_deref(), Some("http://localhost:6006"));
    }

    #[test]
    fn validate_keeps_fields_it_does_not_interpret() {
        let config = TransportConfig::new(Role::Embedded);
        let frame = MemoryWindow::new("http://localhost:6006/iframe.html").unwrap();
        let data = r#"{"key":"frameport-channel","event":{"type":"x","from":"manager","args":[]}}"#;

        let event = validate(
            &config,
            &frame,
            &JsonEncoder,
            &text(data.to_string(), "http://localhost:6006"),
        )
        .unwrap()
        .unwrap();

        assert_eq!(event.extra.get("from"), Some(&Value::from("manager")));
        assert_eq!(event.source.as_deref(), Some("http://localhost:6006"));
    }

    #[test]
    fn validate_reports_attribution_failure() {
        let config = TransportConfig::new(Role::Host);
        let host = MemoryWindow::new("http://localhost:6006/").unwrap();
        let child = MemoryWindow::new("http://localhost:6006/iframe.html").unwrap();
        host.attach_frame(&child, FrameSpec::new("plain"));
        let envelope = Envelope::new(Event::new("ping", Vec::new()), None);

        let result = validate(
            &config,
            &host,
            &JsonEncoder,
            &text(wire(&envelope), "http://localhost:6006"),
        );
        assert!(matches!(
            result,
            Err(TransportError::Attribution { ref event_type }) if event_type == "ping"
        ));
    }

    #[test]
    fn validate_decodes_with_global_override() {
        let config = TransportConfig::new(Role::Embedded);
        let frame = MemoryWindow::new("http://localhost:6006/iframe.html").unwrap();
        frame.set_channel_options(Some(CodecOptions {
            allow_date: Some(false),
            ..CodecOptions::default()
        }));
        let envelope = Envelope::new(
            Event::new("at", vec![Value::from("_date_2024-01-01T00:00:00Z")]),
            None,
        );

        let event = validate(
            &config,
            &frame,
            &JsonEncoder,
            &text(wire(&envelope), "http://localhost:6006"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(event.args, vec![Value::from("_date_2024-01-01T00:00:00Z")]);
    }
}
