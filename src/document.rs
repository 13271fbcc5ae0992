// ABOUTME: Document and PackedArray: validated, lazily indexed views over a BSON buffer.
// ABOUTME: Construction is O(1); the index and each field value are built on first use.

#![allow(clippy::missing_errors_doc)]

#[cfg(feature = "tracing")]
use tracing::debug;

use bytes::Bytes;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::decoder::DecoderConfig;
use crate::error::{Error, Result};
use crate::index::{Field, FieldRef, Index};
use crate::types::{Binary, ElementType, ObjectId};
use crate::validate::validate_with_config;
use crate::value::{MapView, SeqView, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Document,
    Array,
}

/// Shared state behind a `Document` or `PackedArray`.
#[derive(Debug)]
pub(crate) struct Inner {
    bytes: Bytes,
    config: DecoderConfig,
    kind: Kind,
    index: OnceLock<Index>,
}

impl Inner {
    fn new(bytes: Bytes, config: DecoderConfig, kind: Kind) -> Result<Self> {
        validate_with_config(&bytes, &config)?;
        Ok(Self {
            bytes,
            config,
            kind,
            index: OnceLock::new(),
        })
    }

    /// Build the index on first call. A failed build is not cached.
    fn index(&self) -> Result<&Index> {
        if let Some(index) = self.index.get() {
            return Ok(index);
        }
        let built = match self.kind {
            Kind::Document => Index::for_document(&self.bytes, &self.config)?,
            Kind::Array => Index::for_array(&self.bytes, &self.config)?,
        };

        #[cfg(feature = "tracing")]
        debug!(
            kind = ?self.kind,
            fields = built.len(),
            bytes = self.bytes.len(),
            "Built field index"
        );

        Ok(self.index.get_or_init(|| built))
    }

    fn field_at(&self, position: usize) -> Result<&Field> {
        self.index()?
            .field(position)
            .ok_or_else(|| Error::KeyNotFound(position.to_string()))
    }

    pub(crate) fn value_at(&self, position: usize) -> Result<&Value> {
        self.field_at(position)?.value(&self.bytes, self.config)
    }

    /// Decode `field`, which must be one of this structure's own index entries.
    fn value_of<'a>(&'a self, field: &'a Field) -> Result<&'a Value> {
        let owned = self.index()?.fields().as_ptr_range();
        if !owned.contains(&(field as *const Field)) {
            return Err(Error::InvalidData(format!(
                "field \"{}\" does not belong to this structure",
                field.key()
            )));
        }
        field.value(&self.bytes, self.config)
    }
}

/// Generates the typed getters shared by `Document` and `PackedArray`.
macro_rules! typed_getters {
    ($key:ty) => {
        fn get_typed<'a, T>(
            &'a self,
            key: $key,
            expected: ElementType,
            extract: impl FnOnce(&'a Value) -> Option<T>,
        ) -> Result<T> {
            let value = self.get(key)?;
            extract(value).ok_or_else(|| Error::UnexpectedType {
                key: key.to_string(),
                expected,
                actual: value.element_type(),
            })
        }

        pub fn get_str(&self, key: $key) -> Result<&str> {
            self.get_typed(key, ElementType::String, Value::as_str)
        }

        pub fn get_i32(&self, key: $key) -> Result<i32> {
            self.get_typed(key, ElementType::Int32, Value::as_i32)
        }

        pub fn get_i64(&self, key: $key) -> Result<i64> {
            self.get_typed(key, ElementType::Int64, Value::as_i64)
        }

        pub fn get_f64(&self, key: $key) -> Result<f64> {
            self.get_typed(key, ElementType::Double, Value::as_f64)
        }

        pub fn get_bool(&self, key: $key) -> Result<bool> {
            self.get_typed(key, ElementType::Boolean, Value::as_bool)
        }

        pub fn get_document(&self, key: $key) -> Result<&Document> {
            self.get_typed(key, ElementType::EmbeddedDocument, Value::as_document)
        }

        pub fn get_array(&self, key: $key) -> Result<&PackedArray> {
            self.get_typed(key, ElementType::Array, Value::as_array)
        }

        pub fn get_binary(&self, key: $key) -> Result<&Binary> {
            self.get_typed(key, ElementType::Binary, Value::as_binary)
        }

        pub fn get_object_id(&self, key: $key) -> Result<ObjectId> {
            self.get_typed(key, ElementType::ObjectId, Value::as_object_id)
        }
    };
}

/// Methods identical for both structure kinds.
macro_rules! structure_common {
    ($name:ident) => {
        impl $name {
            /// Validate `bytes` and wrap them. Nothing is scanned yet.
            pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self> {
                Self::from_bytes_with_config(bytes, DecoderConfig::default())
            }

            /// Copy `data` into a new buffer and wrap it.
            pub fn from_slice(data: &[u8]) -> Result<Self> {
                Self::from_bytes(Bytes::copy_from_slice(data))
            }

            /// Number of top-level fields, duplicates included.
            pub fn len(&self) -> Result<usize> {
                Ok(self.inner.index()?.len())
            }

            pub fn is_empty(&self) -> Result<bool> {
                Ok(self.inner.index()?.is_empty())
            }

            /// All fields in encounter order.
            pub fn fields(&self) -> Result<&[Field]> {
                Ok(self.inner.index()?.fields())
            }

            /// Whether the field index has been built.
            #[must_use]
            pub fn is_indexed(&self) -> bool {
                self.inner.index.get().is_some()
            }

            /// The configuration this structure (and its children) decode with.
            #[must_use]
            pub fn config(&self) -> DecoderConfig {
                self.inner.config
            }

            /// The bytes this structure was built from, unchanged.
            #[must_use]
            pub fn as_bytes(&self) -> &[u8] {
                &self.inner.bytes
            }

            /// A cheap reference-counted copy of the underlying buffer.
            #[must_use]
            pub fn to_bytes(&self) -> Bytes {
                self.inner.bytes.clone()
            }

            #[must_use]
            pub fn into_bytes(self) -> Bytes {
                match Arc::try_unwrap(self.inner) {
                    Ok(inner) => inner.bytes,
                    Err(shared) => shared.bytes.clone(),
                }
            }

            /// Decode the value stored in `field`, which must come from `self.fields()`.
            ///
            /// A field taken from another structure is rejected with invalid data.
            pub fn value_of<'a>(&'a self, field: &'a Field) -> Result<&'a Value> {
                self.inner.value_of(field)
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.inner.bytes == other.inner.bytes
            }
        }

        impl Eq for $name {}

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("bytes", &hex::encode(&self.inner.bytes))
                    .field("indexed", &self.is_indexed())
                    .finish()
            }
        }

        impl TryFrom<Vec<u8>> for $name {
            type Error = Error;

            fn try_from(data: Vec<u8>) -> Result<Self> {
                Self::from_bytes(data)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = Error;

            fn try_from(data: &[u8]) -> Result<Self> {
                Self::from_slice(data)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                self.as_bytes()
            }
        }

        // Persisted as the raw bytes: hex for human-readable formats.
        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&hex::encode(&self.inner.bytes))
                } else {
                    serializer.serialize_bytes(&self.inner.bytes)
                }
            }
        }

        // Every load re-validates the bytes.
        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let bytes = if deserializer.is_human_readable() {
                    deserializer.deserialize_str(SnapshotVisitor)?
                } else {
                    deserializer.deserialize_byte_buf(SnapshotVisitor)?
                };
                Self::from_bytes(bytes).map_err(de::Error::custom)
            }
        }
    };
}

/// A string-keyed BSON document.
///
/// Cloning is cheap: clones share the buffer, the index and every decoded value.
#[derive(Clone)]
pub struct Document {
    inner: Arc<Inner>,
}

structure_common!(Document);

impl Document {
    /// Validate `bytes` and wrap them with an explicit configuration.
    pub fn from_bytes_with_config(bytes: impl Into<Bytes>, config: DecoderConfig) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(Inner::new(bytes.into(), config, Kind::Document)?),
        })
    }

    fn position(&self, key: &str) -> Result<usize> {
        self.inner
            .index()?
            .position(key)
            .ok_or_else(|| Error::KeyNotFound(key.to_owned()))
    }

    /// Whether `key` is present. Builds the index on first call.
    pub fn has(&self, key: &str) -> Result<bool> {
        Ok(self.inner.index()?.position(key).is_some())
    }

    /// The decoded value of `key`, decoding it on first access.
    pub fn get(&self, key: &str) -> Result<&Value> {
        self.inner.value_at(self.position(key)?)
    }

    /// The index entry for `key`, without decoding its value.
    pub fn field(&self, key: &str) -> Result<&Field> {
        self.inner.field_at(self.position(key)?)
    }

    /// A detached handle to `key` that does not keep this document alive.
    pub fn field_ref(&self, key: &str) -> Result<FieldRef> {
        let position = self.position(key)?;
        let field = self.inner.field_at(position)?;
        Ok(FieldRef::new(Arc::downgrade(&self.inner), position, field))
    }

    typed_getters!(&str);

    /// Keys in encounter order, duplicates included.
    pub fn keys(&self) -> Result<impl Iterator<Item = &str> + '_> {
        Ok(self.fields()?.iter().map(Field::key))
    }

    /// Iterate `(key, value)` pairs in encounter order, decoding as it goes.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: &self.inner,
            position: 0,
            done: false,
        }
    }

    /// Serialize the fields as a map of decoded values (rather than as raw bytes).
    #[must_use]
    pub fn as_map(&self) -> MapView<'_> {
        MapView(self)
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = Result<(&'a str, &'a Value)>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// Renders a value, or an inline marker when it cannot be decoded.
fn write_value(f: &mut fmt::Formatter<'_>, value: Result<&Value>) -> fmt::Result {
    match value {
        Ok(value) => write!(f, "{value}"),
        Err(err) => write!(f, "<invalid: {err}>"),
    }
}

// Decode failures are rendered inline so formatting never fails.
impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = match self.fields() {
            Ok(fields) => fields,
            Err(err) => return write!(f, "<invalid: {err}>"),
        };
        write!(f, "{{")?;
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "\"{}\": ", field.key().escape_default())?;
            write_value(f, self.value_of(field))?;
        }
        write!(f, "}}")
    }
}

/// A BSON array: a document whose fields are addressed by position.
#[derive(Clone)]
pub struct PackedArray {
    inner: Arc<Inner>,
}

structure_common!(PackedArray);

impl PackedArray {
    /// Validate `bytes` and wrap them with an explicit configuration.
    pub fn from_bytes_with_config(bytes: impl Into<Bytes>, config: DecoderConfig) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(Inner::new(bytes.into(), config, Kind::Array)?),
        })
    }

    /// Whether `index` is within the array.
    pub fn has(&self, index: usize) -> Result<bool> {
        Ok(index < self.inner.index()?.len())
    }

    /// The decoded element at `index`, decoding it on first access.
    pub fn get(&self, index: usize) -> Result<&Value> {
        self.inner.value_at(index)
    }

    pub fn field(&self, index: usize) -> Result<&Field> {
        self.inner.field_at(index)
    }

    /// A detached handle to element `index` that does not keep this array alive.
    pub fn field_ref(&self, index: usize) -> Result<FieldRef> {
        let field = self.inner.field_at(index)?;
        Ok(FieldRef::new(Arc::downgrade(&self.inner), index, field))
    }

    typed_getters!(usize);

    /// Iterate the elements in order, decoding as it goes.
    #[must_use]
    pub fn iter(&self) -> ArrayIter<'_> {
        ArrayIter(Iter {
            inner: &self.inner,
            position: 0,
            done: false,
        })
    }

    /// Serialize the elements as a sequence of decoded values.
    #[must_use]
    pub fn as_seq(&self) -> SeqView<'_> {
        SeqView(self)
    }
}

impl<'a> IntoIterator for &'a PackedArray {
    type Item = Result<&'a Value>;
    type IntoIter = ArrayIter<'a>;

    fn into_iter(self) -> ArrayIter<'a> {
        self.iter()
    }
}

impl fmt::Display for PackedArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = match self.fields() {
            Ok(fields) => fields,
            Err(err) => return write!(f, "<invalid: {err}>"),
        };
        write!(f, "[")?;
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write_value(f, self.value_of(field))?;
        }
        write!(f, "]")
    }
}

/// Iterator over the `(key, value)` pairs of a structure.
///
/// Yields an error (and then stops) if the index cannot be built or a value
/// fails to decode.
pub struct Iter<'a> {
    inner: &'a Inner,
    position: usize,
    done: bool,
}

impl<'a> Iterator for Iter<'a> {
    type Item = Result<(&'a str, &'a Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let inner = self.inner;
        let position = self.position;
        let result = inner.index().and_then(|index| {
            let Some(field) = index.field(position) else {
                return Ok(None);
            };
            inner
                .value_of(field)
                .map(|value| Some((field.key(), value)))
        });
        match result {
            Ok(Some(entry)) => {
                self.position += 1;
                Some(Ok(entry))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Iterator over the elements of a `PackedArray`.
pub struct ArrayIter<'a>(Iter<'a>);

impl<'a> Iterator for ArrayIter<'a> {
    type Item = Result<&'a Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|entry| entry.map(|(_, value)| value))
    }
}

/// Accepts a snapshot as hex text, raw bytes or a sequence of byte values.
struct SnapshotVisitor;

impl<'de> Visitor<'de> for SnapshotVisitor {
    type Value = Vec<u8>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BSON bytes or a hex string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Vec<u8>, E> {
        hex::decode(v).map_err(E::custom)
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> std::result::Result<Vec<u8>, E> {
        Ok(v.to_vec())
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> std::result::Result<Vec<u8>, E> {
        Ok(v)
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Vec<u8>, A::Error> {
        let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(byte) = seq.next_element::<u8>()? {
            bytes.push(byte);
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(hex_str: &str) -> Document {
        Document::from_bytes(hex::decode(hex_str).unwrap()).unwrap()
    }

    // {"a": "abababababab"}
    const STRING_DOC: &str = "190000000261000D0000006162616261626162616261620000";
    // {"a": 1, "b": null, "a": "x"}
    const DUPLICATES: &str = "18000000106100010000000A620002610002000000780000";

    #[test]
    fn test_construction_is_lazy() {
        let d = doc(STRING_DOC);
        assert!(!d.is_indexed());
        assert!(d.has("a").unwrap());
        assert!(d.is_indexed());
        assert!(!d.field("a").unwrap().is_decoded());
        assert_eq!(d.get("a").unwrap(), &Value::String("abababababab".into()));
        assert!(d.field("a").unwrap().is_decoded());
    }

    #[test]
    fn test_bytes_round_trip() {
        let raw = hex::decode(STRING_DOC).unwrap();
        let d = Document::from_slice(&raw).unwrap();
        assert_eq!(d.as_bytes(), raw.as_slice());
        assert_eq!(d.to_bytes(), raw);
        assert_eq!(d.clone().into_bytes(), raw);
        assert_eq!(d.into_bytes(), raw);
    }

    #[test]
    fn test_missing_key() {
        let d = doc(STRING_DOC);
        assert!(!d.has("b").unwrap());
        let err = d.get("b").unwrap_err();
        assert_eq!(err, Error::KeyNotFound("b".into()));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_repeated_reads_return_the_memoized_value() {
        let d = doc("10000000016400000000000000F03F00");
        let first = d.get("d").unwrap() as *const Value;
        let second = d.get("d").unwrap() as *const Value;
        assert_eq!(first, second);
        assert_eq!(d.get_f64("d").unwrap(), 1.0);
    }

    #[test]
    fn test_typed_getters() {
        let d = doc(STRING_DOC);
        assert_eq!(d.get_str("a").unwrap(), "abababababab");
        let err = d.get_i32("a").unwrap_err();
        assert_eq!(
            err,
            Error::UnexpectedType {
                key: "a".into(),
                expected: ElementType::Int32,
                actual: ElementType::String,
            }
        );
        assert!(d.get_i32("zz").unwrap_err().is_not_found());
    }

    #[test]
    fn test_duplicates_iterate_but_lookup_keeps_last() {
        let d = doc(DUPLICATES);
        assert_eq!(d.len().unwrap(), 3);
        assert_eq!(d.keys().unwrap().collect::<Vec<_>>(), ["a", "b", "a"]);
        assert_eq!(d.get_str("a").unwrap(), "x");

        let values: Vec<Value> = d.iter().map(|e| e.unwrap().1.clone()).collect();
        assert_eq!(values, [Value::Int32(1), Value::Null, Value::from("x")]);
    }

    #[test]
    fn test_nested_document() {
        let d = doc("160000000378000E0000000261000200000062000000");
        let inner = d.get_document("x").unwrap();
        assert_eq!(inner.get_str("a").unwrap(), "b");
        assert_eq!(inner.as_bytes(), &hex::decode("0E00000002610002000000620000").unwrap()[..]);
        assert_eq!(d.to_string(), "{\"x\": {\"a\": \"b\"}}");
    }

    #[test]
    fn test_child_inherits_config() {
        let config = DecoderConfig {
            duplicate_key_mode: crate::DuplicateKeyMode::KeepFirst,
            ..DecoderConfig::default()
        };
        let d = Document::from_bytes_with_config(
            hex::decode("160000000378000E0000000261000200000062000000").unwrap(),
            config,
        )
        .unwrap();
        assert_eq!(d.get_document("x").unwrap().config(), config);
    }

    #[test]
    fn test_packed_array() {
        let d = doc("140000000461000C0000001030000A0000000000");
        let array = d.get_array("a").unwrap();
        assert_eq!(array.len().unwrap(), 1);
        assert!(array.has(0).unwrap());
        assert!(!array.has(1).unwrap());
        assert_eq!(array.get_i32(0).unwrap(), 10);
        assert_eq!(array.get(1).unwrap_err(), Error::KeyNotFound("1".into()));
        assert_eq!(array.iter().collect::<Result<Vec<_>>>().unwrap(), [&Value::Int32(10)]);
        assert_eq!(array.to_string(), "[10]");
    }

    #[test]
    fn test_field_ref_goes_stale() {
        let d = doc(STRING_DOC);
        let handle = d.field_ref("a").unwrap();
        assert_eq!(handle.key(), "a");
        assert!(handle.is_valid());

        let clone = d.clone();
        drop(d);
        assert_eq!(handle.value().unwrap(), Value::from("abababababab"));

        drop(clone);
        assert!(!handle.is_valid());
        assert_eq!(handle.value().unwrap_err(), Error::StaleReference);
    }

    #[test]
    fn test_child_outlives_parent() {
        let child = {
            let d = doc("160000000378000E0000000261000200000062000000");
            d.get_document("x").unwrap().clone()
        };
        assert_eq!(child.get_str("a").unwrap(), "b");
    }

    #[test]
    fn test_index_failure_is_reported_and_not_cached() {
        // Valid envelope with an unknown type code inside
        let d = doc("0800000014610000");
        let err = d.has("a").unwrap_err();
        assert_eq!(err.error_type(), "invalid_type");
        assert!(!d.is_indexed());

        let mut it = d.iter();
        assert!(it.next().unwrap().is_err());
        assert!(it.next().is_none());
    }

    #[test]
    fn test_equality_is_byte_equality() {
        assert_eq!(doc(STRING_DOC), doc(STRING_DOC));
        assert_ne!(doc(STRING_DOC), doc(DUPLICATES));
    }

    #[test]
    fn test_snapshot_serde() {
        let d = doc(STRING_DOC);
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, format!("\"{}\"", STRING_DOC.to_lowercase()));

        let restored: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, d);
        assert_eq!(restored.get_str("a").unwrap(), "abababababab");

        // Truncated snapshot is rejected on load
        let err = serde_json::from_str::<Document>("\"0a00000000\"").unwrap_err();
        assert!(err.to_string().contains("invalid BSON length"));
    }

    #[test]
    fn test_value_of_rejects_foreign_field() {
        let a = doc("0C0000001061000100000000");
        let b = doc("0C0000001061000200000000");

        let foreign = a.field("a").unwrap();
        assert_eq!(b.value_of(foreign).unwrap_err().error_type(), "invalid_data");
        assert!(!foreign.is_decoded());

        assert_eq!(a.get_i32("a").unwrap(), 1);
        assert_eq!(b.get_i32("a").unwrap(), 2);
        assert_eq!(a.value_of(foreign).unwrap(), &Value::Int32(1));
    }

    #[test]
    fn test_display_marks_undecodable_fields() {
        // {"o": <5 bytes not ending in NUL>, "k": 9}
        let d = doc("14000000036F000500000001106B000900000000");
        let rendered = d.to_string();
        assert!(rendered.starts_with("{\"o\": <invalid: invalid BSON length"), "{rendered}");
        assert!(rendered.ends_with(", \"k\": 9}"), "{rendered}");

        // The same field seen through a parent value
        let value = Value::Document(d.clone());
        assert!(value.to_string().contains("<invalid: "));

        let broken = doc("0800000014610000");
        assert_eq!(broken.to_string(), "<invalid: invalid BSON type 0x14 at offset 4>");
    }

    #[test]
    fn test_concurrent_first_reads_share_one_value() {
        let owned = doc(STRING_DOC);
        let d = &owned;
        let barrier = &std::sync::Barrier::new(8);

        let values: Vec<&Value> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(move || {
                        barrier.wait();
                        d.get("a").unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(d.is_indexed());
        assert!(d.field("a").unwrap().is_decoded());
        let cached = d.get("a").unwrap();
        for value in values {
            assert!(std::ptr::eq(value, cached));
        }
        assert_eq!(cached, &Value::from("abababababab"));
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Document>();
        assert_send_sync::<PackedArray>();
        assert_send_sync::<Value>();
        assert_send_sync::<FieldRef>();
    }
}
