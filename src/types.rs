// ABOUTME: Defines BSON type codes, element types and the leaf value types.
// ABOUTME: Type codes map directly to the BSON wire format byte values.

use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime};

/// Type codes for BSON elements.
/// These match the BSON wire format exactly.
pub mod type_code {
    pub const DOUBLE: u8 = 0x01;
    pub const STRING: u8 = 0x02;
    pub const DOCUMENT: u8 = 0x03;
    pub const ARRAY: u8 = 0x04;
    pub const BINARY: u8 = 0x05;
    pub const UNDEFINED: u8 = 0x06;
    pub const OBJECT_ID: u8 = 0x07;
    pub const BOOLEAN: u8 = 0x08;
    pub const DATETIME: u8 = 0x09;
    pub const NULL: u8 = 0x0a;
    pub const REGEX: u8 = 0x0b;
    pub const DB_POINTER: u8 = 0x0c;
    pub const CODE: u8 = 0x0d;
    pub const SYMBOL: u8 = 0x0e;
    pub const CODE_WITH_SCOPE: u8 = 0x0f;
    pub const INT32: u8 = 0x10;
    pub const TIMESTAMP: u8 = 0x11;
    pub const INT64: u8 = 0x12;
    pub const DECIMAL128: u8 = 0x13;

    // Stored as a signed byte on the wire (-1 and 127)
    pub const MIN_KEY: u8 = 0xff;
    pub const MAX_KEY: u8 = 0x7f;

    /// Check if a type code carries no payload bytes at all
    #[inline]
    pub const fn is_empty(code: u8) -> bool {
        matches!(code, UNDEFINED | NULL | MIN_KEY | MAX_KEY)
    }

    /// Check if a type code is stored as an int32-prefixed, NUL-terminated string
    #[inline]
    pub const fn is_string_like(code: u8) -> bool {
        matches!(code, STRING | CODE | SYMBOL)
    }

    /// Check if a type code is defined by the BSON format
    #[inline]
    pub const fn is_known(code: u8) -> bool {
        matches!(code, DOUBLE..=DECIMAL128 | MIN_KEY | MAX_KEY)
    }
}

/// Binary subtypes defined by the BSON format.
pub mod binary_subtype {
    pub const GENERIC: u8 = 0x00;
    pub const FUNCTION: u8 = 0x01;
    pub const BINARY_OLD: u8 = 0x02;
    pub const UUID_OLD: u8 = 0x03;
    pub const UUID: u8 = 0x04;
    pub const MD5: u8 = 0x05;
    pub const ENCRYPTED: u8 = 0x06;
    pub const COLUMN: u8 = 0x07;
    pub const SENSITIVE: u8 = 0x08;
    pub const USER_DEFINED: u8 = 0x80;
}

/// Sizes fixed by the BSON format.
pub mod limits {
    /// Size of the little-endian int32 length prefix
    pub const LENGTH_PREFIX_SIZE: usize = 4;

    /// Smallest valid document: length prefix plus terminating NUL
    pub const MIN_DOCUMENT_SIZE: usize = 5;

    /// Smallest valid code-with-scope payload: total length, string length,
    /// empty code string and an empty scope document
    pub const MIN_CODE_WITH_SCOPE_SIZE: usize = 14;

    pub const OBJECT_ID_SIZE: usize = 12;

    pub const DECIMAL128_SIZE: usize = 16;

    /// Default maximum document size in bytes (the int32 length prefix limit)
    pub const MAX_DOCUMENT_SIZE: usize = i32::MAX as usize;
}

/// How many payload bytes an element of a given type occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSize {
    /// No payload (null, undefined, min-key, max-key)
    Empty,
    /// Always exactly this many bytes
    Fixed(usize),
    /// Determined by a length prefix or terminators inside the payload
    Variable,
}

/// The semantic category of a BSON element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ElementType {
    Double = type_code::DOUBLE,
    String = type_code::STRING,
    EmbeddedDocument = type_code::DOCUMENT,
    Array = type_code::ARRAY,
    Binary = type_code::BINARY,
    Undefined = type_code::UNDEFINED,
    ObjectId = type_code::OBJECT_ID,
    Boolean = type_code::BOOLEAN,
    DateTime = type_code::DATETIME,
    Null = type_code::NULL,
    RegularExpression = type_code::REGEX,
    DbPointer = type_code::DB_POINTER,
    JavaScriptCode = type_code::CODE,
    Symbol = type_code::SYMBOL,
    JavaScriptCodeWithScope = type_code::CODE_WITH_SCOPE,
    Int32 = type_code::INT32,
    Timestamp = type_code::TIMESTAMP,
    Int64 = type_code::INT64,
    Decimal128 = type_code::DECIMAL128,
    MinKey = type_code::MIN_KEY,
    MaxKey = type_code::MAX_KEY,
}

impl ElementType {
    /// Look up the element type for a type code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            type_code::DOUBLE => Self::Double,
            type_code::STRING => Self::String,
            type_code::DOCUMENT => Self::EmbeddedDocument,
            type_code::ARRAY => Self::Array,
            type_code::BINARY => Self::Binary,
            type_code::UNDEFINED => Self::Undefined,
            type_code::OBJECT_ID => Self::ObjectId,
            type_code::BOOLEAN => Self::Boolean,
            type_code::DATETIME => Self::DateTime,
            type_code::NULL => Self::Null,
            type_code::REGEX => Self::RegularExpression,
            type_code::DB_POINTER => Self::DbPointer,
            type_code::CODE => Self::JavaScriptCode,
            type_code::SYMBOL => Self::Symbol,
            type_code::CODE_WITH_SCOPE => Self::JavaScriptCodeWithScope,
            type_code::INT32 => Self::Int32,
            type_code::TIMESTAMP => Self::Timestamp,
            type_code::INT64 => Self::Int64,
            type_code::DECIMAL128 => Self::Decimal128,
            type_code::MIN_KEY => Self::MinKey,
            type_code::MAX_KEY => Self::MaxKey,
            _ => return None,
        })
    }

    /// The wire type code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// The type alias used by MongoDB's `$type` operator.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::String => "string",
            Self::EmbeddedDocument => "object",
            Self::Array => "array",
            Self::Binary => "binData",
            Self::Undefined => "undefined",
            Self::ObjectId => "objectId",
            Self::Boolean => "bool",
            Self::DateTime => "date",
            Self::Null => "null",
            Self::RegularExpression => "regex",
            Self::DbPointer => "dbPointer",
            Self::JavaScriptCode => "javascript",
            Self::Symbol => "symbol",
            Self::JavaScriptCodeWithScope => "javascriptWithScope",
            Self::Int32 => "int",
            Self::Timestamp => "timestamp",
            Self::Int64 => "long",
            Self::Decimal128 => "decimal",
            Self::MinKey => "minKey",
            Self::MaxKey => "maxKey",
        }
    }

    /// How the payload of this element type is sized.
    #[must_use]
    pub const fn payload_size(self) -> PayloadSize {
        match self {
            Self::Undefined | Self::Null | Self::MinKey | Self::MaxKey => PayloadSize::Empty,
            Self::Boolean => PayloadSize::Fixed(1),
            Self::Int32 => PayloadSize::Fixed(4),
            Self::Double | Self::DateTime | Self::Timestamp | Self::Int64 => PayloadSize::Fixed(8),
            Self::ObjectId => PayloadSize::Fixed(limits::OBJECT_ID_SIZE),
            Self::Decimal128 => PayloadSize::Fixed(limits::DECIMAL128_SIZE),
            Self::String
            | Self::EmbeddedDocument
            | Self::Array
            | Self::Binary
            | Self::RegularExpression
            | Self::DbPointer
            | Self::JavaScriptCode
            | Self::Symbol
            | Self::JavaScriptCodeWithScope => PayloadSize::Variable,
        }
    }
}

impl TryFrom<u8> for ElementType {
    type Error = u8;

    fn try_from(code: u8) -> std::result::Result<Self, u8> {
        Self::from_code(code).ok_or(code)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A 12-byte BSON ObjectId.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; limits::OBJECT_ID_SIZE]);

impl ObjectId {
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; limits::OBJECT_ID_SIZE]) -> Self {
        Self(bytes)
    }

    #[inline]
    #[must_use]
    pub const fn bytes(&self) -> [u8; limits::OBJECT_ID_SIZE] {
        self.0
    }

    /// Parse a 24-character hex identifier.
    pub fn parse_str(s: &str) -> Result<Self> {
        let mut bytes = [0u8; limits::OBJECT_ID_SIZE];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|_| Error::InvalidData(format!("invalid ObjectId \"{s}\"")))?;
        Ok(Self(bytes))
    }

    /// The 24-character lowercase hex rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Creation time in seconds since the Unix epoch (big-endian leading 4 bytes).
    #[must_use]
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId(\"{}\")", self.to_hex())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Opaque binary data with its subtype tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binary {
    pub subtype: u8,
    #[serde(with = "serde_bytes_as_slice")]
    pub bytes: Vec<u8>,
}

mod serde_bytes_as_slice {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }
}

/// A BSON replication timestamp.
///
/// On the wire the increment comes first, followed by the seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Timestamp {
    /// Seconds since the Unix epoch
    pub time: u32,
    /// Ordinal within the second
    pub increment: u32,
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}, {})", self.time, self.increment)
    }
}

/// A regular expression with its option flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Regex {
    pub pattern: String,
    pub options: String,
}

impl fmt::Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.pattern, self.options)
    }
}

/// Deprecated reference to a document in another namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DbPointer {
    pub namespace: String,
    pub id: ObjectId,
}

/// Milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DateTime(i64);

impl DateTime {
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    #[inline]
    #[must_use]
    pub const fn timestamp_millis(self) -> i64 {
        self.0
    }

    /// Convert to a `SystemTime`, or `None` if the platform cannot represent it.
    #[must_use]
    pub fn to_system_time(self) -> Option<SystemTime> {
        let offset = Duration::from_millis(self.0.unsigned_abs());
        if self.0 >= 0 {
            SystemTime::UNIX_EPOCH.checked_add(offset)
        } else {
            SystemTime::UNIX_EPOCH.checked_sub(offset)
        }
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DateTime({})", self.0)
    }
}
