// ABOUTME: Decodes the payload of a single indexed BSON field into a Value.
// ABOUTME: Also holds the decoder configuration shared by every structure.

#![allow(clippy::missing_errors_doc)]

#[cfg(feature = "tracing")]
use tracing::trace;

use bytes::Bytes;

use crate::decimal128::Decimal128;
use crate::document::{Document, PackedArray};
use crate::error::{Error, Result};
use crate::indexer::RawField;
use crate::reader::Reader;
use crate::types::{
    binary_subtype, limits, Binary, DateTime, DbPointer, ElementType, ObjectId, Regex, Timestamp,
};
use crate::value::{JavaScriptCodeWithScope, Value};

/// Validate and convert bytes to a UTF-8 string.
/// Uses simdutf8 for SIMD-accelerated validation when the feature is enabled.
#[cfg(feature = "simd-utf8")]
#[inline]
pub(crate) fn validate_utf8(bytes: &[u8]) -> Result<&str> {
    simdutf8::basic::from_utf8(bytes)
        .map_err(|_| Error::InvalidData("invalid UTF-8 sequence".into()))
}

#[cfg(not(feature = "simd-utf8"))]
#[inline]
pub(crate) fn validate_utf8(bytes: &[u8]) -> Result<&str> {
    Ok(std::str::from_utf8(bytes)?)
}

/// Which of several fields sharing a key a keyed lookup returns.
///
/// Iteration always sees every field; this only affects `get`/`has`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateKeyMode {
    /// Raise an error when the index is built
    Error,
    /// The first occurrence wins
    KeepFirst,
    /// The last occurrence wins (default)
    #[default]
    KeepLast,
}

/// Configuration options for reading documents.
///
/// A structure passes its configuration on to every child document, array
/// and code-with-scope scope decoded from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// How to handle duplicate keys (default: `KeepLast`)
    pub duplicate_key_mode: DuplicateKeyMode,
    /// Maximum document size in bytes
    pub max_document_size: usize,
    /// Require array keys to be "0", "1", ... in order (default: false)
    pub validate_array_keys: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            duplicate_key_mode: DuplicateKeyMode::default(),
            max_document_size: limits::MAX_DOCUMENT_SIZE,
            validate_array_keys: false,
        }
    }
}

/// Decode the value of `raw` from the document buffer it was scanned from.
pub(crate) fn decode_field(raw: &RawField, source: &Bytes, config: DecoderConfig) -> Result<Value> {
    let value = PayloadDecoder::new(raw, source, config)
        .and_then(|mut decoder| decoder.decode())
        .map_err(|err| with_key(err, raw.key()))?;

    #[cfg(feature = "tracing")]
    trace!(
        key = raw.key(),
        element_type = value.element_type().name(),
        "Decoded field"
    );

    Ok(value)
}

/// Prefix data errors with the key they came from.
fn with_key(err: Error, key: &str) -> Error {
    match err {
        Error::InvalidData(msg) => Error::InvalidData(format!("field \"{key}\": {msg}")),
        other => other,
    }
}

/// Reads one payload. The reader is bounded to the end of the payload, so a
/// length prefix inside it can never reach into the next field.
struct PayloadDecoder<'a> {
    reader: Reader<'a>,
    raw: &'a RawField,
    source: &'a Bytes,
    config: DecoderConfig,
    end: usize,
}

impl<'a> PayloadDecoder<'a> {
    fn new(raw: &'a RawField, source: &'a Bytes, config: DecoderConfig) -> Result<Self> {
        let offset = raw.payload_offset().unwrap_or(0);
        let end = offset
            .checked_add(raw.payload_length())
            .filter(|&end| end <= source.len())
            .ok_or_else(|| {
                Error::InvalidData(format!(
                    "payload of {} bytes at offset {offset} runs past the {}-byte buffer",
                    raw.payload_length(),
                    source.len()
                ))
            })?;
        Ok(Self {
            reader: Reader::at(&source[..end], offset),
            raw,
            source,
            config,
            end,
        })
    }

    fn decode(&mut self) -> Result<Value> {
        Ok(match self.raw.element_type() {
            ElementType::Double => Value::Double(self.reader.read_f64()?),
            ElementType::String => Value::String(self.read_string_payload()?),
            ElementType::JavaScriptCode => Value::JavaScriptCode(self.read_string_payload()?),
            ElementType::Symbol => Value::Symbol(self.read_string_payload()?),
            ElementType::EmbeddedDocument => Value::Document(Document::from_bytes_with_config(
                self.payload_slice(),
                self.config,
            )?),
            ElementType::Array => Value::Array(PackedArray::from_bytes_with_config(
                self.payload_slice(),
                self.config,
            )?),
            ElementType::Binary => Value::Binary(self.read_binary()?),
            ElementType::Undefined => Value::Undefined,
            ElementType::ObjectId => Value::ObjectId(ObjectId::from_bytes(self.reader.read_array()?)),
            ElementType::Boolean => Value::Boolean(self.reader.read_byte()? != 0),
            ElementType::DateTime => Value::DateTime(DateTime::from_millis(self.reader.read_i64()?)),
            ElementType::Null => Value::Null,
            ElementType::RegularExpression => Value::RegularExpression(self.read_regex()?),
            ElementType::DbPointer => Value::DbPointer(self.read_db_pointer()?),
            ElementType::JavaScriptCodeWithScope => {
                Value::JavaScriptCodeWithScope(self.read_code_with_scope()?)
            }
            ElementType::Int32 => Value::Int32(self.reader.read_i32()?),
            ElementType::Timestamp => {
                // Increment comes first on the wire
                let increment = self.reader.read_u32()?;
                let time = self.reader.read_u32()?;
                Value::Timestamp(Timestamp { time, increment })
            }
            ElementType::Int64 => Value::Int64(self.reader.read_i64()?),
            ElementType::Decimal128 => {
                Value::Decimal128(Decimal128::from_bytes(self.reader.read_array()?))
            }
            ElementType::MinKey => Value::MinKey,
            ElementType::MaxKey => Value::MaxKey,
        })
    }

    /// The whole payload as a zero-copy view of the parent buffer.
    fn payload_slice(&self) -> Bytes {
        self.source.slice(self.reader.position()..self.end)
    }

    /// The payload of string, code and symbol fields excludes the NUL already.
    fn read_string_payload(&mut self) -> Result<String> {
        let bytes = self.reader.read_bytes(self.raw.payload_length())?;
        Ok(validate_utf8(bytes)?.to_owned())
    }

    /// Read an int32-prefixed, NUL-terminated string and return it without the NUL.
    fn read_prefixed_string(&mut self) -> Result<String> {
        let at = self.reader.position();
        let len = self.reader.read_length()?;
        let bytes = self.reader.read_bytes(len)?;
        match bytes.split_last() {
            Some((&0, content)) => Ok(validate_utf8(content)?.to_owned()),
            _ => Err(Error::InvalidData(format!(
                "string at offset {at} is not NUL-terminated"
            ))),
        }
    }

    fn read_cstring(&mut self) -> Result<String> {
        let bytes = self.reader.read_cstr()?;
        Ok(validate_utf8(bytes)?.to_owned())
    }

    fn read_binary(&mut self) -> Result<Binary> {
        let subtype = self.reader.read_byte()?;
        let mut len = self.reader.remaining();

        // The old binary subtype repeats the length inside the payload
        if subtype == binary_subtype::BINARY_OLD {
            let at = self.reader.position();
            let inner = self.reader.read_length()?;
            if inner + limits::LENGTH_PREFIX_SIZE != len {
                return Err(Error::InvalidData(format!(
                    "old binary inner length {inner} at offset {at} does not match outer length {len}"
                )));
            }
            len = inner;
        }

        let bytes = self.reader.read_bytes(len)?.to_vec();
        Ok(Binary { subtype, bytes })
    }

    fn read_regex(&mut self) -> Result<Regex> {
        let pattern = self.read_cstring()?;
        let options = self.read_cstring()?;
        Ok(Regex { pattern, options })
    }

    fn read_db_pointer(&mut self) -> Result<DbPointer> {
        let namespace = self.read_prefixed_string()?;
        let id = ObjectId::from_bytes(self.reader.read_array()?);
        Ok(DbPointer { namespace, id })
    }

    fn read_code_with_scope(&mut self) -> Result<JavaScriptCodeWithScope> {
        let code = self.read_prefixed_string()?;
        let scope = Document::from_bytes_with_config(self.payload_slice(), self.config)?;
        Ok(JavaScriptCodeWithScope { code, scope })
    }
}
