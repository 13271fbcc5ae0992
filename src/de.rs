// ABOUTME: Serde Deserializer over lazily indexed BSON documents.
// ABOUTME: Only the fields the target type asks for are decoded; ignored fields are skipped.

#![allow(clippy::missing_errors_doc)]

use serde::de::value::{BorrowedStrDeserializer, MapDeserializer};
use serde::de::{self, DeserializeOwned, DeserializeSeed, IntoDeserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserializer as _;
use serde::{forward_to_deserialize_any, Deserialize};
use std::slice;

use crate::decoder::DecoderConfig;
use crate::document::{Document, PackedArray};
use crate::error::{Error, Result};
use crate::index::Field;
use crate::value::{JavaScriptCodeWithScope, Value};

/// Deserialize a `T` from BSON bytes.
pub fn from_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    from_document(&Document::from_slice(data)?)
}

/// Deserialize a `T` from BSON bytes with a custom configuration.
pub fn from_slice_with_config<T: DeserializeOwned>(data: &[u8], config: DecoderConfig) -> Result<T> {
    let doc = Document::from_bytes_with_config(bytes::Bytes::copy_from_slice(data), config)?;
    from_document(&doc)
}

/// Deserialize a `T` from an existing document.
///
/// Strings may be borrowed from the document's decoded values.
pub fn from_document<'de, T: Deserialize<'de>>(doc: &'de Document) -> Result<T> {
    T::deserialize(Deserializer::new(doc))
}

/// A serde Deserializer that reads a top-level document as a map.
#[derive(Clone, Copy)]
pub struct Deserializer<'de> {
    doc: &'de Document,
}

impl<'de> Deserializer<'de> {
    #[must_use]
    pub fn new(doc: &'de Document) -> Self {
        Self { doc }
    }
}

impl<'de> de::Deserializer<'de> for Deserializer<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_map(DocumentAccess::new(self.doc)?)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_enum(EnumDeserializer::from_document(self.doc)?)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct seq tuple tuple_struct map
        struct identifier ignored_any
    }
}

/// Which structure a field belongs to, so its value can be decoded.
#[derive(Clone, Copy)]
enum Source<'de> {
    Document(&'de Document),
    Array(&'de PackedArray),
}

impl<'de> Source<'de> {
    fn value_of(self, field: &'de Field) -> Result<&'de Value> {
        match self {
            Source::Document(doc) => doc.value_of(field),
            Source::Array(array) => array.value_of(field),
        }
    }
}

/// Deserializes one field, decoding it only if the visitor needs the value.
struct FieldDeserializer<'de> {
    source: Source<'de>,
    field: &'de Field,
}

impl<'de> FieldDeserializer<'de> {
    fn value(&self) -> Result<ValueDeserializer<'de>> {
        Ok(ValueDeserializer(self.source.value_of(self.field)?))
    }
}

impl<'de> de::Deserializer<'de> for FieldDeserializer<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.value()?.deserialize_any(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.value()?.deserialize_option(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.value()?.deserialize_bytes(visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.value()?.deserialize_bytes(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        self.value()?.deserialize_newtype_struct(name, visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.value()?.deserialize_enum(name, variants, visitor)
    }

    // Skipped fields are never decoded
    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        unit unit_struct seq tuple tuple_struct map struct identifier
    }
}

/// Deserializes an already decoded value.
#[derive(Clone, Copy)]
struct ValueDeserializer<'de>(&'de Value);

impl<'de> de::Deserializer<'de> for ValueDeserializer<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.0 {
            Value::Double(n) => visitor.visit_f64(*n),
            Value::String(s) | Value::JavaScriptCode(s) | Value::Symbol(s) => {
                visitor.visit_borrowed_str(s)
            }
            Value::Document(doc) => visitor.visit_map(DocumentAccess::new(doc)?),
            Value::Array(array) => visitor.visit_seq(ArrayAccess::new(array)?),
            Value::Binary(b) => visitor.visit_borrowed_bytes(&b.bytes),
            Value::Undefined | Value::Null | Value::MinKey | Value::MaxKey => visitor.visit_unit(),
            Value::ObjectId(oid) => visitor.visit_string(oid.to_hex()),
            Value::Boolean(b) => visitor.visit_bool(*b),
            Value::DateTime(dt) => visitor.visit_i64(dt.timestamp_millis()),
            Value::RegularExpression(re) => visit_pairs(
                visitor,
                [("pattern", re.pattern.as_str()), ("options", re.options.as_str())],
            ),
            Value::DbPointer(p) => visit_pairs(
                visitor,
                [("namespace", p.namespace.clone()), ("id", p.id.to_hex())],
            ),
            Value::JavaScriptCodeWithScope(cws) => visitor.visit_map(CodeWithScopeAccess {
                cws,
                next_entry: 0,
            }),
            Value::Int32(n) => visitor.visit_i32(*n),
            Value::Timestamp(ts) => visit_pairs(
                visitor,
                [("time", ts.time), ("increment", ts.increment)],
            ),
            Value::Int64(n) => visitor.visit_i64(*n),
            Value::Decimal128(d) => visitor.visit_string(d.to_string()),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.0 {
            Value::Null | Value::Undefined => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.0 {
            Value::Binary(b) => visitor.visit_borrowed_bytes(&b.bytes),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.0 {
            // Unit variant: just a string
            Value::String(s) => visitor.visit_enum(BorrowedStrDeserializer::<Error>::new(s)),
            // Other variants: document with a single key
            Value::Document(doc) => visitor.visit_enum(EnumDeserializer::from_document(doc)?),
            other => Err(Error::Custom(format!(
                "expected string or document for enum, found {}",
                other.element_type()
            ))),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        unit unit_struct seq tuple tuple_struct map struct identifier ignored_any
    }
}

/// Present a small fixed set of named values as a map.
fn visit_pairs<'de, V, T, const N: usize>(visitor: V, pairs: [(&'static str, T); N]) -> Result<V::Value>
where
    V: Visitor<'de>,
    T: IntoDeserializer<'de, Error>,
{
    let mut map: MapDeserializer<'de, _, Error> = MapDeserializer::new(pairs.into_iter());
    let value = visitor.visit_map(&mut map)?;
    map.end()?;
    Ok(value)
}

struct DocumentAccess<'de> {
    doc: &'de Document,
    fields: slice::Iter<'de, Field>,
    pending: Option<&'de Field>,
}

impl<'de> DocumentAccess<'de> {
    fn new(doc: &'de Document) -> Result<Self> {
        Ok(Self {
            doc,
            fields: doc.fields()?.iter(),
            pending: None,
        })
    }
}

impl<'de> MapAccess<'de> for DocumentAccess<'de> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        for field in self.fields.by_ref() {
            // Of several fields sharing a key, only the one a lookup resolves to is seen
            if !std::ptr::eq(self.doc.field(field.key())?, field) {
                continue;
            }
            self.pending = Some(field);
            return seed
                .deserialize(BorrowedStrDeserializer::new(field.key()))
                .map(Some);
        }
        Ok(None)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        let field = self
            .pending
            .take()
            .ok_or_else(|| Error::Custom("value requested before key".into()))?;
        seed.deserialize(FieldDeserializer {
            source: Source::Document(self.doc),
            field,
        })
    }
}

struct ArrayAccess<'de> {
    array: &'de PackedArray,
    fields: slice::Iter<'de, Field>,
}

impl<'de> ArrayAccess<'de> {
    fn new(array: &'de PackedArray) -> Result<Self> {
        Ok(Self {
            array,
            fields: array.fields()?.iter(),
        })
    }
}

impl<'de> SeqAccess<'de> for ArrayAccess<'de> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        match self.fields.next() {
            None => Ok(None),
            Some(field) => seed
                .deserialize(FieldDeserializer {
                    source: Source::Array(self.array),
                    field,
                })
                .map(Some),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.fields.len())
    }
}

/// Presents code-with-scope as a `{code, scope}` map.
struct CodeWithScopeAccess<'de> {
    cws: &'de JavaScriptCodeWithScope,
    next_entry: u8,
}

impl<'de> MapAccess<'de> for CodeWithScopeAccess<'de> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        let key = match self.next_entry {
            0 => "code",
            1 => "scope",
            _ => return Ok(None),
        };
        seed.deserialize(BorrowedStrDeserializer::new(key)).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        let entry = self.next_entry;
        self.next_entry += 1;
        match entry {
            0 => seed.deserialize(BorrowedStrDeserializer::new(self.cws.code.as_str())),
            1 => seed.deserialize(Deserializer::new(&self.cws.scope)),
            _ => Err(Error::Custom("code with scope has two entries".into())),
        }
    }
}

/// A document holding exactly one field, read as an enum variant.
struct EnumDeserializer<'de> {
    doc: &'de Document,
    field: &'de Field,
}

impl<'de> EnumDeserializer<'de> {
    fn from_document(doc: &'de Document) -> Result<Self> {
        match doc.fields()? {
            [field] => Ok(Self { doc, field }),
            fields => Err(Error::Custom(format!(
                "expected a document with one key for enum, found {} keys",
                fields.len()
            ))),
        }
    }

    fn content(&self) -> FieldDeserializer<'de> {
        FieldDeserializer {
            source: Source::Document(self.doc),
            field: self.field,
        }
    }
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer<'de> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant)> {
        let variant = seed.deserialize(BorrowedStrDeserializer::<Error>::new(self.field.key()))?;
        Ok((variant, self))
    }
}

impl<'de> de::VariantAccess<'de> for EnumDeserializer<'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Err(Error::Custom("expected newtype, tuple, or struct variant".into()))
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value> {
        seed.deserialize(self.content())
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        de::Deserializer::deserialize_seq(self.content(), visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        de::Deserializer::deserialize_map(self.content(), visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn bytes(hex_str: &str) -> Vec<u8> {
        hex::decode(hex_str).unwrap()
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Single {
        a: String,
    }

    #[test]
    fn test_deserialize_struct() {
        let s: Single = from_slice(&bytes("190000000261000D0000006162616261626162616261620000")).unwrap();
        assert_eq!(s.a, "abababababab");
    }

    #[test]
    fn test_deserialize_borrowed_str() {
        #[derive(Deserialize)]
        struct Borrowed<'a> {
            a: &'a str,
        }

        let doc = Document::from_bytes(bytes("190000000261000D0000006162616261626162616261620000")).unwrap();
        let b: Borrowed<'_> = from_document(&doc).unwrap();
        assert_eq!(b.a, "abababababab");
    }

    #[test]
    fn test_deserialize_nested_and_array() {
        #[derive(Deserialize)]
        struct Outer {
            x: Single,
        }
        let o: Outer = from_slice(&bytes("160000000378000E0000000261000200000062000000")).unwrap();
        assert_eq!(o.x.a, "b");

        #[derive(Deserialize)]
        struct Numbers {
            a: Vec<i32>,
        }
        let n: Numbers = from_slice(&bytes("140000000461000C0000001030000A0000000000")).unwrap();
        assert_eq!(n.a, vec![10]);
    }

    #[test]
    fn test_deserialize_options() {
        #[derive(Deserialize)]
        struct Optional {
            a: Option<i32>,
            b: Option<i32>,
        }
        // {"a": null}
        let o: Optional = from_slice(&bytes("080000000A610000")).unwrap();
        assert_eq!(o.a, None);
        assert_eq!(o.b, None);
    }

    #[test]
    fn test_ignored_fields_are_not_decoded() {
        #[derive(Deserialize)]
        struct OnlyA {
            a: i32,
        }
        // {"a": 1, "b": <string with invalid UTF-8>}
        let doc = Document::from_bytes(bytes("160000001061000100000002620003000000C3280000")).unwrap();
        let only: OnlyA = from_document(&doc).unwrap();
        assert_eq!(only.a, 1);
        assert!(!doc.field("b").unwrap().is_decoded());
        assert_eq!(doc.get("b").unwrap_err().error_type(), "invalid_data");
    }

    #[test]
    fn test_duplicate_keys_follow_lookup() {
        #[derive(Deserialize)]
        struct Dup {
            a: String,
        }
        let d: Dup = from_slice(&bytes("18000000106100010000000A620002610002000000780000")).unwrap();
        assert_eq!(d.a, "x");
    }

    #[test]
    fn test_deserialize_enums() {
        #[derive(Debug, Deserialize, PartialEq)]
        enum Shape {
            Circle,
            Square(i32),
        }
        #[derive(Deserialize)]
        struct Holder {
            s: Shape,
        }

        // {"s": "Circle"}
        let h: Holder = from_slice(&bytes("1300000002730007000000436972636C650000")).unwrap();
        assert_eq!(h.s, Shape::Circle);

        // {"s": {"Square": 2}}
        let h: Holder = from_slice(&bytes("19000000037300110000001053717561726500020000000000")).unwrap();
        assert_eq!(h.s, Shape::Square(2));
    }

    #[test]
    fn test_deserialize_into_json_value() {
        let json: serde_json::Value =
            from_slice(&bytes("210000000F6100190000000500000061626364000C000000107800010000000000")).unwrap();
        assert_eq!(json, serde_json::json!({"a": {"code": "abcd", "scope": {"x": 1}}}));

        let json: serde_json::Value = from_slice(&bytes("100000001161002A00000015CD5B0700")).unwrap();
        assert_eq!(json, serde_json::json!({"a": {"time": 123_456_789, "increment": 42}}));
    }

    #[test]
    fn test_type_mismatch() {
        #[derive(Debug, Deserialize)]
        struct WantsInt {
            #[allow(dead_code)]
            a: i32,
        }
        let err = from_slice::<WantsInt>(&bytes("190000000261000D0000006162616261626162616261620000")).unwrap_err();
        assert_eq!(err.error_type(), "custom");
    }

    #[test]
    fn test_invalid_bytes() {
        let err = from_slice::<Single>(&[]).unwrap_err();
        assert_eq!(err.error_type(), "invalid_data");
    }
}
