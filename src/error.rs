// ABOUTME: Error types for BSON validation, indexing and field decoding.
// ABOUTME: Each variant maps to a stable snake_case name for test matching.

use crate::types::ElementType;
use std::fmt;

/// The result type for BSON operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while validating, indexing or decoding BSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A required field could not be read at its offset (truncated buffer,
    /// inconsistent length prefix, invalid UTF-8, broken descriptor).
    InvalidData(String),

    /// The document envelope is malformed: declared length too small,
    /// not matching the buffer, or no trailing NUL.
    InvalidLength(String),

    /// Unrecognized BSON type code.
    InvalidType {
        /// The offending type byte.
        code: u8,
        /// Offset of the type byte in the owning buffer.
        offset: usize,
    },

    /// Lookup of a key (or array position) that is not present.
    KeyNotFound(String),

    /// A typed getter found a value of a different BSON type.
    UnexpectedType {
        key: String,
        expected: ElementType,
        actual: ElementType,
    },

    /// Duplicate top-level key while `DuplicateKeyMode::Error` is in effect.
    DuplicateKey(String),

    /// A detached field handle was read after its structure was dropped.
    StaleReference,

    /// Custom error message (for serde integration).
    Custom(String),
}

impl Error {
    /// Returns the standardized error type name for test matching.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::InvalidData(_) => "invalid_data",
            Error::InvalidLength(_) => "invalid_length",
            Error::InvalidType { .. } => "invalid_type",
            Error::KeyNotFound(_) => "key_not_found",
            Error::UnexpectedType { .. } => "unexpected_type",
            Error::DuplicateKey(_) => "duplicate_key",
            Error::StaleReference => "stale_reference",
            Error::Custom(_) => "custom",
        }
    }

    /// Returns true for a lookup miss, as opposed to a malformed buffer.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::KeyNotFound(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidData(msg) => write!(f, "invalid BSON data: {msg}"),
            Error::InvalidLength(msg) => write!(f, "invalid BSON length: {msg}"),
            Error::InvalidType { code, offset } => {
                write!(f, "invalid BSON type 0x{code:02x} at offset {offset}")
            }
            Error::KeyNotFound(key) => write!(f, "field \"{key}\" not found in BSON document"),
            Error::UnexpectedType {
                key,
                expected,
                actual,
            } => write!(
                f,
                "field \"{key}\" has type {}, expected {}",
                actual.name(),
                expected.name()
            ),
            Error::DuplicateKey(key) => write!(f, "duplicate key \"{key}\" in BSON document"),
            Error::StaleReference => write!(f, "BSON document is no longer valid"),
            Error::Custom(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Error::InvalidData(format!("invalid UTF-8 sequence: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_types() {
        assert_eq!(Error::InvalidData("x".into()).error_type(), "invalid_data");
        assert_eq!(Error::InvalidLength("x".into()).error_type(), "invalid_length");
        assert_eq!(
            Error::InvalidType { code: 0x14, offset: 4 }.error_type(),
            "invalid_type"
        );
        assert_eq!(Error::StaleReference.error_type(), "stale_reference");
        assert!(Error::KeyNotFound("a".into()).is_not_found());
        assert!(!Error::InvalidData("a".into()).is_not_found());
    }

    #[test]
    fn test_error_display() {
        let err = Error::InvalidType { code: 0x14, offset: 7 };
        assert_eq!(err.to_string(), "invalid BSON type 0x14 at offset 7");

        let err = Error::KeyNotFound("b".into());
        assert_eq!(err.to_string(), "field \"b\" not found in BSON document");

        let err = Error::UnexpectedType {
            key: "a".into(),
            expected: ElementType::Int32,
            actual: ElementType::String,
        };
        assert_eq!(err.to_string(), "field \"a\" has type string, expected int");
    }
}
