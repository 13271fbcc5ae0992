// ABOUTME: Lazily indexed, zero-copy BSON document reader for Rust.
// ABOUTME: Validates on construction, scans fields on first lookup, decodes each field once.

//! # lazy_bson
//!
//! A reader for MongoDB BSON documents that does as little work as possible.
//!
//! - Constructing a [`Document`] only checks the length prefix and trailing NUL.
//! - The first lookup scans the document once and records where every field
//!   lives, without decoding any payload.
//! - Each field is decoded on first access and the result is memoized.
//! - Nested documents and arrays are zero-copy views sharing the parent's
//!   reference-counted buffer.
//!
//! ## Quick Start
//!
//! ```rust
//! use lazy_bson::{Document, Value};
//!
//! // {"a": "abababababab"}
//! let bytes = vec![
//!     0x19, 0x00, 0x00, 0x00, 0x02, b'a', 0x00, 0x0d, 0x00, 0x00, 0x00,
//!     b'a', b'b', b'a', b'b', b'a', b'b', b'a', b'b', b'a', b'b', b'a', b'b', 0x00,
//!     0x00,
//! ];
//!
//! let doc = Document::from_bytes(bytes).unwrap();
//! assert!(doc.has("a").unwrap());
//! assert_eq!(doc.get_str("a").unwrap(), "abababababab");
//! assert!(doc.get("b").unwrap_err().is_not_found());
//! assert_eq!(doc.get("a").unwrap(), &Value::from("abababababab"));
//! ```
//!
//! ## Serde
//!
//! Any `Deserialize` type can be read straight from a document; fields the
//! type does not ask for are never decoded.
//!
//! ```rust
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Row {
//!     a: String,
//! }
//!
//! let bytes = [
//!     0x19, 0x00, 0x00, 0x00, 0x02, b'a', 0x00, 0x0d, 0x00, 0x00, 0x00,
//!     b'a', b'b', b'a', b'b', b'a', b'b', b'a', b'b', b'a', b'b', b'a', b'b', 0x00,
//!     0x00,
//! ];
//! let row: Row = lazy_bson::from_slice(&bytes).unwrap();
//! assert_eq!(row.a, "abababababab");
//! ```
//!
//! ## Features
//!
//! - `simd-utf8`: validate strings with `simdutf8`.
//! - `tracing`: emit `debug!` events when an index is built and `trace!`
//!   events per scanned and decoded field.

pub mod de;
pub mod decimal128;
pub mod decoder;
pub mod document;
pub mod error;
pub mod index;
pub mod indexer;
mod reader;
pub mod types;
pub mod validate;
pub mod value;

// Re-export commonly used items at the crate root
pub use de::{from_document, from_slice, from_slice_with_config, Deserializer};
pub use decimal128::Decimal128;
pub use decoder::{DecoderConfig, DuplicateKeyMode};
pub use document::{ArrayIter, Document, Iter, PackedArray};
pub use error::{Error, Result};
pub use index::{Field, FieldRef, Index};
pub use indexer::{scan, Indexer, RawField};
pub use types::{
    binary_subtype, limits, type_code, Binary, DateTime, DbPointer, ElementType, ObjectId,
    PayloadSize, Regex, Timestamp,
};
pub use validate::validate;
pub use value::{JavaScriptCodeWithScope, MapView, SeqView, Value};

/// Validate `bytes` and wrap them as a lazily indexed document.
pub fn from_bytes(bytes: impl Into<bytes::Bytes>) -> Result<Document> {
    Document::from_bytes(bytes)
}

/// Like [`from_bytes`], with a custom configuration.
pub fn from_bytes_with_config(
    bytes: impl Into<bytes::Bytes>,
    config: DecoderConfig,
) -> Result<Document> {
    Document::from_bytes_with_config(bytes, config)
}
