use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::trace;

use crate::error::{CodecError, Result};
use crate::options::CodecOptions;
use crate::value::{Map, Value};

/// Marker for `undefined`.
pub const UNDEFINED_MARKER: &str = "_undefined_";
/// Prefix for dates: `_date_<rfc3339>`.
pub const DATE_PREFIX: &str = "_date_";
/// Prefix for regular expressions: `_regexp_<flags>|<source>`.
pub const REGEXP_PREFIX: &str = "_regexp_";
/// Prefix for functions: `_function_<name>|<source>`.
pub const FUNCTION_PREFIX: &str = "_function_";
/// Prefix for symbols: `_symbol_<name>`.
pub const SYMBOL_PREFIX: &str = "_symbol_";
/// Object key carrying the class name of an instance.
pub const CLASS_KEY: &str = "_constructor-name_";

/// Converts structured values to and from transportable strings.
pub trait Encoder {
    /// Encode `value` into a string using `options`.
    fn encode(&self, value: &Value, options: &CodecOptions) -> Result<String>;

    /// Decode a string produced by [`Encoder::encode`].
    fn decode(&self, text: &str, options: &CodecOptions) -> Result<Value>;
}

/// JSON encoder with marker strings for non-JSON values.
///
/// Values whose toggle is disabled degrade the way a plain JSON serializer
/// treats them: dates become ISO strings, regular expressions become empty
/// objects, and functions, symbols and `undefined` disappear from objects
/// (or become `null` inside arrays).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn encode(&self, value: &Value, options: &CodecOptions) -> Result<String> {
        let json = to_json(value, options, 0).unwrap_or(serde_json::Value::Null);

        match options.indent() {
            None => Ok(serde_json::to_string(&json)?),
            Some(width) => {
                let indent = vec![b' '; width];
                let mut out = Vec::new();
                let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
                let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
                json.serialize(&mut serializer)?;
                String::from_utf8(out).map_err(|err| CodecError::Shape(err.to_string()))
            }
        }
    }

    fn decode(&self, text: &str, options: &CodecOptions) -> Result<Value> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        Ok(from_json(json, options))
    }
}

/// Cheap check that a string is likely to hold encoded structured data.
///
/// Only the first and last non-whitespace characters are inspected; a string
/// that passes can still fail to decode.
pub fn is_json(input: &str) -> bool {
    let trimmed = input.trim();
    if trimmed.len() < 2 {
        return false;
    }
    let first = trimmed.as_bytes()[0];
    let last = trimmed.as_bytes()[trimmed.len() - 1];
    matches!(first, b'{' | b'[' | b'"' | b'}') && matches!(last, b'}' | b']' | b'"')
}

fn to_json(value: &Value, options: &CodecOptions, depth: usize) -> Option<serde_json::Value> {
    use serde_json::Value as Json;

    match value {
        Value::Undefined => options
            .undefined_allowed()
            .then(|| Json::String(UNDEFINED_MARKER.to_string())),
        Value::Null => Some(Json::Null),
        Value::Bool(b) => Some(Json::Bool(*b)),
        Value::Number(n) => Some(Json::Number(n.clone())),
        Value::String(s) => Some(Json::String(s.clone())),
        Value::Date(date) => {
            let iso = date.to_rfc3339_opts(SecondsFormat::AutoSi, true);
            if options.date_allowed() {
                Some(Json::String(format!("{DATE_PREFIX}{iso}")))
            } else {
                Some(Json::String(iso))
            }
        }
        Value::RegExp { source, flags } => {
            if options.reg_exp_allowed() {
                Some(Json::String(format!("{REGEXP_PREFIX}{flags}|{source}")))
            } else {
                Some(Json::Object(serde_json::Map::new()))
            }
        }
        Value::Function { name, source } => options
            .function_allowed()
            .then(|| Json::String(format!("{FUNCTION_PREFIX}{name}|{source}"))),
        Value::Symbol(name) => options
            .symbol_allowed()
            .then(|| Json::String(format!("{SYMBOL_PREFIX}{name}"))),
        Value::Array(items) => {
            if depth > options.depth_limit() {
                trace!(depth, "omitting array nested beyond max depth");
                return None;
            }
            Some(Json::Array(
                items
                    .iter()
                    .map(|item| to_json(item, options, depth + 1).unwrap_or(Json::Null))
                    .collect(),
            ))
        }
        Value::Object(map) => {
            if depth > options.depth_limit() {
                trace!(depth, "omitting object nested beyond max depth");
                return None;
            }
            Some(Json::Object(fields_to_json(map, options, depth)))
        }
        Value::Instance { class, fields } => {
            if depth > options.depth_limit() {
                trace!(depth, class = %class, "omitting instance nested beyond max depth");
                return None;
            }
            let mut out = fields_to_json(fields, options, depth);
            if options.class_allowed() {
                out.insert(CLASS_KEY.to_string(), Json::String(class.clone()));
            }
            Some(Json::Object(out))
        }
    }
}

fn fields_to_json(
    map: &Map,
    options: &CodecOptions,
    depth: usize,
) -> serde_json::Map<String, serde_json::Value> {
    map.iter()
        .filter_map(|(key, value)| {
            to_json(value, options, depth + 1).map(|json| (key.clone(), json))
        })
        .collect()
}

fn from_json(json: serde_json::Value, options: &CodecOptions) -> Value {
    use serde_json::Value as Json;

    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => Value::Number(n),
        Json::String(s) => revive_string(s, options),
        Json::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| from_json(item, options))
                .collect(),
        ),
        Json::Object(map) => {
            let mut fields: Map = map
                .into_iter()
                .map(|(key, value)| (key, from_json(value, options)))
                .collect();

            if options.class_allowed() {
                if let Some(Value::String(class)) = fields.get(CLASS_KEY).cloned() {
                    fields.remove(CLASS_KEY);
                    return Value::Instance { class, fields };
                }
            }
            Value::Object(fields)
        }
    }
}

fn revive_string(s: String, options: &CodecOptions) -> Value {
    if s == UNDEFINED_MARKER && options.undefined_allowed() {
        return Value::Undefined;
    }

    if options.date_allowed() {
        if let Some(raw) = s.strip_prefix(DATE_PREFIX) {
            if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
                return Value::Date(date.with_timezone(&Utc));
            }
        }
    }

    if options.reg_exp_allowed() {
        if let Some((flags, source)) = s.strip_prefix(REGEXP_PREFIX).and_then(|r| r.split_once('|'))
        {
            return Value::RegExp {
                source: source.to_string(),
                flags: flags.to_string(),
            };
        }
    }

    if options.function_allowed() {
        if let Some((name, source)) = s
            .strip_prefix(FUNCTION_PREFIX)
            .and_then(|r| r.split_once('|'))
        {
            // Without lazy evaluation only the function's name survives.
            let source = if options.lazy() {
                source.to_string()
            } else {
                String::new()
            };
            return Value::Function {
                name: name.to_string(),
                source,
            };
        }
    }

    if options.symbol_allowed() {
        if let Some(name) = s.strip_prefix(SYMBOL_PREFIX) {
            return Value::Symbol(name.to_string());
        }
    }

    Value::String(s)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn object(fields: &[(&str, Value)]) -> Value {
        Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    fn special_values() -> Value {
        let mut point = Map::new();
        point.insert("x".to_string(), Value::from(3i64));
        object(&[
            (
                "when",
                Value::Date(Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()),
            ),
            (
                "pattern",
                Value::RegExp {
                    source: "^a|b$".to_string(),
                    flags: "gi".to_string(),
                },
            ),
            (
                "callback",
                Value::Function {
                    name: "onClick".to_string(),
                    source: "function onClick() { return 1; }".to_string(),
                },
            ),
            ("key", Value::Symbol("story".to_string())),
            ("missing", Value::Undefined),
            (
                "point",
                Value::Instance {
                    class: "Point".to_string(),
                    fields: point,
                },
            ),
            ("list", Value::Array(vec![Value::Null, Value::from("x")])),
        ])
    }

    #[test]
    fn special_values_survive_with_default_options() {
        let options = CodecOptions::default();
        let value = special_values();

        let text = JsonEncoder.encode(&value, &options).unwrap();
        let decoded = JsonEncoder.decode(&text, &options).unwrap();

        assert_eq!(decoded, value);
    }

    #[test]
    fn disallowed_values_degrade_like_plain_json() {
        let options = CodecOptions {
            allow_date: Some(false),
            allow_reg_exp: Some(false),
            allow_function: Some(false),
            allow_symbol: Some(false),
            allow_undefined: Some(false),
            allow_class: Some(false),
            ..CodecOptions::default()
        };

        let text = JsonEncoder.encode(&special_values(), &options).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(json["when"], "2024-05-01T12:30:00Z");
        assert_eq!(json["pattern"], serde_json::json!({}));
        assert!(json.get("callback").is_none());
        assert!(json.get("key").is_none());
        assert!(json.get("missing").is_none());
        assert_eq!(json["point"], serde_json::json!({ "x": 3 }));
    }

    #[test]
    fn disallowed_values_inside_arrays_become_null() {
        let options = CodecOptions {
            allow_function: Some(false),
            allow_undefined: Some(false),
            ..CodecOptions::default()
        };
        let value = Value::Array(vec![
            Value::Undefined,
            Value::Function {
                name: "f".to_string(),
                source: String::new(),
            },
            Value::from(1i64),
        ]);

        let text = JsonEncoder.encode(&value, &options).unwrap();
        assert_eq!(text, "[null,null,1]");
    }

    #[test]
    fn containers_beyond_max_depth_are_omitted() {
        let options = CodecOptions {
            max_depth: Some(1),
            ..CodecOptions::default()
        };
        let value = object(&[("a", object(&[("b", object(&[("c", Value::Null)]))]))]);

        let text = JsonEncoder.encode(&value, &options).unwrap();
        assert_eq!(text, r#"{"a":{}}"#);
    }

    #[test]
    fn space_pretty_prints_with_requested_width() {
        let options = CodecOptions {
            space: Some(4),
            ..CodecOptions::default()
        };
        let value = object(&[("a", Value::from(1i64))]);

        let text = JsonEncoder.encode(&value, &options).unwrap();
        assert_eq!(text, "{\n    \"a\": 1\n}");
    }

    #[test]
    fn markers_stay_strings_when_decode_disallows_them() {
        let options = CodecOptions {
            allow_date: Some(false),
            allow_symbol: Some(false),
            ..CodecOptions::default()
        };
        let decoded = JsonEncoder
            .decode(r#"["_date_2024-05-01T12:30:00Z","_symbol_x"]"#, &options)
            .unwrap();

        assert_eq!(
            decoded,
            Value::Array(vec![
                Value::from("_date_2024-05-01T12:30:00Z"),
                Value::from("_symbol_x"),
            ])
        );
    }

    #[test]
    fn eager_decode_drops_function_bodies() {
        let options = CodecOptions {
            lazy_eval: Some(false),
            ..CodecOptions::default()
        };
        let decoded = JsonEncoder
            .decode(r#""_function_go|function go() {}""#, &options)
            .unwrap();
        assert_eq!(
            decoded,
            Value::Function {
                name: "go".to_string(),
                source: String::new(),
            }
        );
    }

    #[test]
    fn invalid_json_is_an_error() {
        let result = JsonEncoder.decode("{not-json", &CodecOptions::default());
        assert!(matches!(result, Err(CodecError::Json(_))));
    }

    #[test]
    fn is_json_checks_delimiters() {
        assert!(is_json(r#"{"key":1}"#));
        assert!(is_json("[1,2]"));
        assert!(is_json(r#""text""#));
        assert!(is_json("  {}  "));
        assert!(!is_json("hello"));
        assert!(!is_json("{"));
        assert!(!is_json(""));
    }
}
