use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use frameport_codec::{CodecOptions, Encoder, Event, JsonEncoder, Value};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// An event as the CLI reports it.
#[derive(Debug, Serialize)]
pub struct EventOutput {
    #[serde(rename = "type")]
    pub event_type: String,
    pub args: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(rename = "refId", skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl EventOutput {
    pub fn from_event(event: &Event) -> Self {
        Self {
            event_type: event.event_type.clone(),
            args: args_json(&event.args),
            source: event.source.clone(),
            ref_id: event.ref_id.clone(),
            extra: match wire_json(&Value::Object(event.extra.clone())) {
                serde_json::Value::Object(extra) => extra,
                _ => serde_json::Map::new(),
            },
        }
    }

    pub fn args_preview(&self) -> String {
        self.args.to_string()
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_table(header: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
}

/// Arguments in their wire form, so special values show their markers.
pub fn args_json(args: &[Value]) -> serde_json::Value {
    wire_json(&Value::Array(args.to_vec()))
}

fn wire_json(value: &Value) -> serde_json::Value {
    JsonEncoder
        .encode(value, &CodecOptions::default())
        .ok()
        .and_then(|wire| serde_json::from_str(&wire).ok())
        .unwrap_or(serde_json::Value::Null)
}

pub fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_keep_special_value_markers() {
        let args = vec![
            Value::from("plain"),
            Value::RegExp {
                source: "a+".to_string(),
                flags: "g".to_string(),
            },
        ];
        assert_eq!(args_json(&args), serde_json::json!(["plain", "_regexp_g|a+"]));
    }

    #[test]
    fn event_output_skips_missing_fields() {
        let output = EventOutput::from_event(&Event::new("ping", Vec::new()));
        let json = serde_json::to_string(&output).unwrap();
        assert_eq!(json, r#"{"type":"ping","args":[]}"#);
    }

    #[test]
    fn event_output_reports_uninterpreted_fields() {
        let mut event = Event::new("ping", Vec::new());
        event.extra.insert("from".to_string(), Value::from("manager"));
        let json = serde_json::to_value(EventOutput::from_event(&event)).unwrap();
        assert_eq!(json["from"], "manager");
    }
}
