// ABOUTME: Decoded value of a single BSON field, one variant per BSON type.
// ABOUTME: Nested documents and arrays stay lazy views over the parent buffer.

use serde::ser::{SerializeMap, SerializeSeq, SerializeStruct};
use serde::{Serialize, Serializer};
use std::fmt;

use crate::decimal128::Decimal128;
use crate::document::{Document, PackedArray};
use crate::types::{Binary, DateTime, DbPointer, ElementType, ObjectId, Regex, Timestamp};

/// A decoded BSON value.
///
/// Documents and arrays are not decoded eagerly: they are [`Document`] and
/// [`PackedArray`] views that index themselves on first access.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 64-bit IEEE 754 floating point
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Embedded document
    Document(Document),
    /// Array (a document keyed "0", "1", ...)
    Array(PackedArray),
    /// Binary data with subtype
    Binary(Binary),
    /// Deprecated undefined marker
    Undefined,
    ObjectId(ObjectId),
    Boolean(bool),
    /// UTC datetime in milliseconds since the Unix epoch
    DateTime(DateTime),
    Null,
    RegularExpression(Regex),
    /// Deprecated namespace + ObjectId reference
    DbPointer(DbPointer),
    JavaScriptCode(String),
    /// Deprecated symbol string
    Symbol(String),
    JavaScriptCodeWithScope(JavaScriptCodeWithScope),
    Int32(i32),
    /// Replication timestamp
    Timestamp(Timestamp),
    Int64(i64),
    Decimal128(Decimal128),
    MinKey,
    MaxKey,
}

/// JavaScript code together with the document holding its variable bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct JavaScriptCodeWithScope {
    pub code: String,
    pub scope: Document,
}

impl Value {
    /// The BSON type of this value.
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        match self {
            Value::Double(_) => ElementType::Double,
            Value::String(_) => ElementType::String,
            Value::Document(_) => ElementType::EmbeddedDocument,
            Value::Array(_) => ElementType::Array,
            Value::Binary(_) => ElementType::Binary,
            Value::Undefined => ElementType::Undefined,
            Value::ObjectId(_) => ElementType::ObjectId,
            Value::Boolean(_) => ElementType::Boolean,
            Value::DateTime(_) => ElementType::DateTime,
            Value::Null => ElementType::Null,
            Value::RegularExpression(_) => ElementType::RegularExpression,
            Value::DbPointer(_) => ElementType::DbPointer,
            Value::JavaScriptCode(_) => ElementType::JavaScriptCode,
            Value::Symbol(_) => ElementType::Symbol,
            Value::JavaScriptCodeWithScope(_) => ElementType::JavaScriptCodeWithScope,
            Value::Int32(_) => ElementType::Int32,
            Value::Timestamp(_) => ElementType::Timestamp,
            Value::Int64(_) => ElementType::Int64,
            Value::Decimal128(_) => ElementType::Decimal128,
            Value::MinKey => ElementType::MinKey,
            Value::MaxKey => ElementType::MaxKey,
        }
    }

    /// Returns true for null (but not undefined).
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(*f),
            _ => None,
        }
    }

    /// Widen any integer type to i64.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Int32(n) => Some(i64::from(*n)),
            Value::Int64(n) => Some(*n),
            _ => None,
        }
    }

    /// If this is a string, returns a reference to it.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&PackedArray> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_binary(&self) -> Option<&Binary> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object_id(&self) -> Option<ObjectId> {
        match self {
            Value::ObjectId(oid) => Some(*oid),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_datetime(&self) -> Option<DateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_decimal128(&self) -> Option<Decimal128> {
        match self {
            Value::Decimal128(d) => Some(*d),
            _ => None,
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_finite() {
        write!(f, "{n}")
    } else if n.is_nan() {
        write!(f, "NaN")
    } else if n.is_sign_positive() {
        write!(f, "Infinity")
    } else {
        write!(f, "-Infinity")
    }
}

// Relaxed JSON-like rendering. Nested fields that fail to decode are shown
// as `<invalid: ...>`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Double(n) => write_float(f, *n),
            Value::String(s) => write!(f, "\"{}\"", s.escape_default()),
            Value::Document(d) => write!(f, "{d}"),
            Value::Array(a) => write!(f, "{a}"),
            Value::Binary(b) => write!(f, "Binary({}, {})", b.subtype, hex::encode(&b.bytes)),
            Value::Undefined => write!(f, "undefined"),
            Value::ObjectId(oid) => write!(f, "ObjectId(\"{oid}\")"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::DateTime(dt) => write!(f, "{dt}"),
            Value::Null => write!(f, "null"),
            Value::RegularExpression(re) => write!(f, "{re}"),
            Value::DbPointer(p) => write!(f, "DBPointer(\"{}\", ObjectId(\"{}\"))", p.namespace, p.id),
            Value::JavaScriptCode(code) => write!(f, "Code(\"{}\")", code.escape_default()),
            Value::Symbol(s) => write!(f, "Symbol(\"{}\")", s.escape_default()),
            Value::JavaScriptCodeWithScope(cws) => {
                write!(f, "Code(\"{}\", {})", cws.code.escape_default(), cws.scope)
            }
            Value::Int32(n) => write!(f, "{n}"),
            Value::Timestamp(ts) => write!(f, "{ts}"),
            Value::Int64(n) => write!(f, "{n}"),
            Value::Decimal128(d) => write!(f, "{d}"),
            Value::MinKey => write!(f, "MinKey"),
            Value::MaxKey => write!(f, "MaxKey"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Double(n) => serializer.serialize_f64(*n),
            Value::String(s) | Value::JavaScriptCode(s) | Value::Symbol(s) => {
                serializer.serialize_str(s)
            }
            Value::Document(d) => d.as_map().serialize(serializer),
            Value::Array(a) => a.as_seq().serialize(serializer),
            Value::Binary(b) => b.serialize(serializer),
            Value::Undefined | Value::Null => serializer.serialize_unit(),
            Value::ObjectId(oid) => oid.serialize(serializer),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::DateTime(dt) => serializer.serialize_i64(dt.timestamp_millis()),
            Value::RegularExpression(re) => re.serialize(serializer),
            Value::DbPointer(p) => p.serialize(serializer),
            Value::JavaScriptCodeWithScope(cws) => cws.serialize(serializer),
            Value::Int32(n) => serializer.serialize_i32(*n),
            Value::Timestamp(ts) => ts.serialize(serializer),
            Value::Int64(n) => serializer.serialize_i64(*n),
            Value::Decimal128(d) => d.serialize(serializer),
            Value::MinKey => serializer.serialize_unit_struct("MinKey"),
            Value::MaxKey => serializer.serialize_unit_struct("MaxKey"),
        }
    }
}

impl Serialize for JavaScriptCodeWithScope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("JavaScriptCodeWithScope", 2)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("scope", &self.scope.as_map())?;
        state.end()
    }
}

/// Serializes a document's fields as a map, decoding each value.
#[derive(Debug, Clone, Copy)]
pub struct MapView<'a>(pub(crate) &'a Document);

impl Serialize for MapView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self.0.fields().map_err(serde::ser::Error::custom)?;
        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for entry in self.0.iter() {
            let (key, value) = entry.map_err(serde::ser::Error::custom)?;
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Serializes an array's elements as a sequence, decoding each value.
#[derive(Debug, Clone, Copy)]
pub struct SeqView<'a>(pub(crate) &'a PackedArray);

impl Serialize for SeqView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.0.len().map_err(serde::ser::Error::custom)?;
        let mut seq = serializer.serialize_seq(Some(len))?;
        for value in self.0.iter() {
            seq.serialize_element(value.map_err(serde::ser::Error::custom)?)?;
        }
        seq.end()
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int32(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int64(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<Document> for Value {
    fn from(d: Document) -> Self {
        Value::Document(d)
    }
}

impl From<PackedArray> for Value {
    fn from(a: PackedArray) -> Self {
        Value::Array(a)
    }
}

impl From<ObjectId> for Value {
    fn from(oid: ObjectId) -> Self {
        Value::ObjectId(oid)
    }
}

impl From<DateTime> for Value {
    fn from(dt: DateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Decimal128> for Value {
    fn from(d: Decimal128) -> Self {
        Value::Decimal128(d)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl PartialEq<i32> for Value {
    fn eq(&self, other: &i32) -> bool {
        self.as_i32() == Some(*other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(hex_str: &str) -> Document {
        Document::from_bytes(hex::decode(hex_str).unwrap()).unwrap()
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Int32(5).as_i32(), Some(5));
        assert_eq!(Value::Int32(5).as_i64(), None);
        assert_eq!(Value::Int32(5).as_integer(), Some(5));
        assert_eq!(Value::Int64(-5).as_integer(), Some(-5));
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::JavaScriptCode("x".into()).as_str(), None);
        assert!(Value::Null.is_null());
        assert!(!Value::Undefined.is_null());
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::Double(1.5).as_f64(), Some(1.5));
    }

    #[test]
    fn test_element_type() {
        assert_eq!(Value::MinKey.element_type(), ElementType::MinKey);
        assert_eq!(Value::Symbol("s".into()).element_type(), ElementType::Symbol);
        assert_eq!(Value::Int64(0).element_type().code(), 0x12);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Double(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Double(-1.5).to_string(), "-1.5");
        assert_eq!(Value::from("a\"b").to_string(), "\"a\\\"b\"");
        assert_eq!(Value::MaxKey.to_string(), "MaxKey");
        assert_eq!(
            Value::ObjectId(ObjectId::from_bytes([0; 12])).to_string(),
            "ObjectId(\"000000000000000000000000\")"
        );
        assert_eq!(
            Value::Binary(Binary {
                subtype: 4,
                bytes: vec![0xab],
            })
            .to_string(),
            "Binary(4, ab)"
        );

        // {"x": {"a": "b"}}
        let d = doc("160000000378000E0000000261000200000062000000");
        assert_eq!(Value::Document(d).to_string(), "{\"x\": {\"a\": \"b\"}}");
    }

    #[test]
    fn test_serialize_to_json() {
        // {"a": [10]}
        let d = doc("140000000461000C0000001030000A0000000000");
        let json = serde_json::to_string(&Value::Document(d)).unwrap();
        assert_eq!(json, r#"{"a":[10]}"#);

        let json = serde_json::to_string(&Value::ObjectId(
            ObjectId::parse_str("56e1fc72e0c917e9c4714161").unwrap(),
        ))
        .unwrap();
        assert_eq!(json, r#""56e1fc72e0c917e9c4714161""#);

        let json = serde_json::to_string(&Value::Timestamp(Timestamp {
            time: 1,
            increment: 2,
        }))
        .unwrap();
        assert_eq!(json, r#"{"time":1,"increment":2}"#);
    }

    #[test]
    fn test_compare_with_primitives() {
        assert_eq!(Value::from("abc"), "abc");
        assert_eq!(Value::Int32(3), 3);
        assert_ne!(Value::Int64(3), 3);
    }
}
