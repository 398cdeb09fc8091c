use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Object fields, keyed by property name.
pub type Map = BTreeMap<String, Value>;

/// Map key that marks a non-JSON variant inside the serde data model.
const SERDE_TAG: &str = "$frameport::Value";

/// A structured value that can cross a context boundary.
///
/// This is a superset of JSON: the extra variants describe values a plain
/// text-exchange format cannot hold natively. They travel as marker strings
/// (see [`crate::JsonEncoder`]) and are revived on the other side when the
/// matching [`crate::CodecOptions`] toggle allows it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<Value>),
    Object(Map),
    Date(DateTime<Utc>),
    RegExp { source: String, flags: String },
    /// A function descriptor. The body is carried as text and never evaluated.
    Function { name: String, source: String },
    Symbol(String),
    /// An object that remembers the name of the class it was built from.
    Instance { class: String, fields: Map },
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a field on an object or class instance.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(map) | Value::Instance { fields: map, .. } => map.get(key),
            _ => None,
        }
    }

    /// Short type name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Date(_) => "date",
            Value::RegExp { .. } => "regexp",
            Value::Function { .. } => "function",
            Value::Symbol(_) => "symbol",
            Value::Instance { .. } => "instance",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Array(items) => write!(f, "[{} items]", items.len()),
            Value::Object(map) => write!(f, "{{{} fields}}", map.len()),
            Value::Date(date) => write!(f, "{}", date.to_rfc3339()),
            Value::RegExp { source, flags } => write!(f, "/{source}/{flags}"),
            Value::Function { name, .. } => write!(f, "[Function {name}]"),
            Value::Symbol(name) => write!(f, "Symbol({name})"),
            Value::Instance { class, fields } => write!(f, "{class} {{{} fields}}", fields.len()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value.into())
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Number(value.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Value::Object(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Date(value)
    }
}

/// JSON variants map onto the serde data model directly. The other variants
/// become a map tagged with a private key, so any self-describing format
/// carries them through unchanged. Wire markers are the encoder's business.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => serializer.collect_seq(items),
            Value::Object(map) => serializer.collect_map(map),
            Value::Undefined => tagged(serializer, "undefined")?.end(),
            Value::Date(date) => {
                let mut map = tagged(serializer, "date")?;
                let stamp = date.to_rfc3339_opts(SecondsFormat::AutoSi, true);
                map.serialize_entry("value", &stamp)?;
                map.end()
            }
            Value::RegExp { source, flags } => {
                let mut map = tagged(serializer, "regexp")?;
                map.serialize_entry("source", source)?;
                map.serialize_entry("flags", flags)?;
                map.end()
            }
            Value::Function { name, source } => {
                let mut map = tagged(serializer, "function")?;
                map.serialize_entry("name", name)?;
                map.serialize_entry("source", source)?;
                map.end()
            }
            Value::Symbol(name) => {
                let mut map = tagged(serializer, "symbol")?;
                map.serialize_entry("name", name)?;
                map.end()
            }
            Value::Instance { class, fields } => {
                let mut map = tagged(serializer, "instance")?;
                map.serialize_entry("class", class)?;
                map.serialize_entry("fields", fields)?;
                map.end()
            }
        }
    }
}

fn tagged<S: Serializer>(serializer: S, tag: &str) -> Result<S::SerializeMap, S::Error> {
    let mut map = serializer.serialize_map(None)?;
    map.serialize_entry(SERDE_TAG, tag)?;
    Ok(map)
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a structured value")
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_bool<E>(self, b: bool) -> Result<Value, E> {
        Ok(Value::Bool(b))
    }

    fn visit_i64<E>(self, n: i64) -> Result<Value, E> {
        Ok(Value::Number(n.into()))
    }

    fn visit_u64<E>(self, n: u64) -> Result<Value, E> {
        Ok(Value::Number(n.into()))
    }

    fn visit_f64<E>(self, n: f64) -> Result<Value, E> {
        Ok(serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number))
    }

    fn visit_str<E>(self, s: &str) -> Result<Value, E> {
        Ok(Value::String(s.to_string()))
    }

    fn visit_string<E>(self, s: String) -> Result<Value, E> {
        Ok(Value::String(s))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut map = Map::new();
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            map.insert(key, value);
        }
        match map.remove(SERDE_TAG) {
            None => Ok(Value::Object(map)),
            Some(Value::String(tag)) => from_tagged(&tag, map).map_err(de::Error::custom),
            Some(other) => Err(de::Error::custom(format!(
                "value tag must be a string, got {}",
                other.kind()
            ))),
        }
    }
}

fn from_tagged(tag: &str, mut fields: Map) -> Result<Value, String> {
    let value = match tag {
        "undefined" => Value::Undefined,
        "date" => {
            let raw = take_string(&mut fields, tag, "value")?;
            let date = DateTime::parse_from_rfc3339(&raw).map_err(|err| err.to_string())?;
            Value::Date(date.with_timezone(&Utc))
        }
        "regexp" => Value::RegExp {
            source: take_string(&mut fields, tag, "source")?,
            flags: take_string(&mut fields, tag, "flags")?,
        },
        "function" => Value::Function {
            name: take_string(&mut fields, tag, "name")?,
            source: take_string(&mut fields, tag, "source")?,
        },
        "symbol" => Value::Symbol(take_string(&mut fields, tag, "name")?),
        "instance" => {
            let class = take_string(&mut fields, tag, "class")?;
            match fields.remove("fields") {
                Some(Value::Object(fields)) => Value::Instance { class, fields },
                None => Value::Instance {
                    class,
                    fields: Map::new(),
                },
                Some(other) => {
                    return Err(format!(
                        "instance fields must be an object, got {}",
                        other.kind()
                    ))
                }
            }
        }
        other => return Err(format!("unknown value tag `{other}`")),
    };
    Ok(value)
}

fn take_string(fields: &mut Map, tag: &str, name: &str) -> Result<String, String> {
    match fields.remove(name) {
        Some(Value::String(s)) => Ok(s),
        _ => Err(format!("{tag} value is missing `{name}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_nested_json() {
        let json = serde_json::json!({ "a": [1, "two", null], "b": { "c": true } });
        let value = Value::from(json);

        let Some(Value::Array(a)) = value.get("a") else {
            panic!("expected an array");
        };
        assert_eq!(a.len(), 3);
        assert_eq!(a[1].as_str(), Some("two"));
        assert_eq!(a[2], Value::Null);
        assert_eq!(
            value.get("b").and_then(|b| b.get("c")),
            Some(&Value::Bool(true))
        );
    }

    #[test]
    fn special_values_survive_the_serde_data_model() {
        use chrono::TimeZone;

        let mut fields = Map::new();
        fields.insert("x".to_string(), Value::Undefined);
        let value = Value::Array(vec![
            Value::Date(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
            Value::RegExp {
                source: "^a+$".to_string(),
                flags: "i".to_string(),
            },
            Value::Function {
                name: "onClick".to_string(),
                source: "() => {}".to_string(),
            },
            Value::Symbol("story".to_string()),
            Value::Instance {
                class: "Point".to_string(),
                fields,
            },
            Value::from(serde_json::json!({ "plain": [1, 2.5, null] })),
        ]);

        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json[0][SERDE_TAG], "date");
        assert_eq!(Value::deserialize(json).unwrap(), value);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let json = serde_json::json!({ SERDE_TAG: "bigint", "value": "1" });
        let err = Value::deserialize(json).unwrap_err();
        assert!(err.to_string().contains("unknown value tag"));
    }

    #[test]
    fn instance_fields_are_addressable() {
        let mut fields = Map::new();
        fields.insert("x".to_string(), Value::from(1i64));
        let value = Value::Instance {
            class: "Point".to_string(),
            fields,
        };
        assert_eq!(value.get("x"), Some(&Value::from(1i64)));
        assert_eq!(value.kind(), "instance");
        assert_eq!(value.to_string(), "Point {1 fields}");
    }
}
