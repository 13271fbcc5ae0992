// ABOUTME: Single-pass scanner that locates every top-level field of a BSON document.
// ABOUTME: Produces offset/length descriptors without decoding any payload.

#![allow(clippy::missing_errors_doc)]

#[cfg(feature = "tracing")]
use tracing::trace;

use crate::decoder::validate_utf8;
use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::types::{limits, type_code, ElementType, PayloadSize};
use crate::validate::validate;

/// Where one top-level field lives inside its document.
///
/// Offsets are absolute byte positions in the document buffer. The payload of
/// string, code and symbol fields starts after the int32 prefix and its length
/// excludes the terminating NUL. Document, array and db-pointer payloads start
/// at their own length prefix. Code-with-scope payloads start after the total
/// length prefix. Binary payloads start at the subtype byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    key: String,
    element_type: ElementType,
    key_offset: usize,
    key_length: usize,
    payload_offset: Option<usize>,
    payload_length: usize,
}

impl RawField {
    /// Build a descriptor, checking the type code and the offset/length invariants.
    ///
    /// The type byte is taken to sit just before the key when reporting an
    /// unknown code.
    pub fn new(
        key: String,
        type_code: u8,
        key_offset: usize,
        key_length: usize,
        payload_offset: Option<usize>,
        payload_length: usize,
    ) -> Result<Self> {
        let element_type = ElementType::from_code(type_code).ok_or(Error::InvalidType {
            code: type_code,
            offset: key_offset.saturating_sub(1),
        })?;
        let key_end = key_offset.saturating_add(key_length);
        let valid = if type_code::is_empty(type_code) {
            payload_offset.is_none() && payload_length == 0
        } else {
            match payload_offset {
                None => false,
                Some(offset) => {
                    offset > key_end
                        && (payload_length > 0 || type_code::is_string_like(type_code))
                }
            }
        };
        if !valid {
            return Err(Error::InvalidData(format!(
                "invalid payload offset or length for field \"{key}\" at offset {key_offset}"
            )));
        }
        Ok(Self {
            key,
            element_type,
            key_offset,
            key_length,
            payload_offset,
            payload_length,
        })
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    #[must_use]
    pub fn type_code(&self) -> u8 {
        self.element_type.code()
    }

    #[inline]
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    #[inline]
    #[must_use]
    pub fn key_offset(&self) -> usize {
        self.key_offset
    }

    #[inline]
    #[must_use]
    pub fn key_length(&self) -> usize {
        self.key_length
    }

    #[inline]
    #[must_use]
    pub fn payload_offset(&self) -> Option<usize> {
        self.payload_offset
    }

    #[inline]
    #[must_use]
    pub fn payload_length(&self) -> usize {
        self.payload_length
    }
}

/// Streaming field scanner over a validated document.
///
/// Yields one [`RawField`] per top-level element in encounter order and stops
/// after the first error.
#[derive(Debug, Clone)]
pub struct Indexer<'a> {
    body: Reader<'a>,
    failed: bool,
}

impl<'a> Indexer<'a> {
    /// Validate the envelope and position the scanner at the first element.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let len = validate(data)?;
        // Elements may not run into the terminating NUL
        let body = &data[..len - 1];
        Ok(Self {
            body: Reader::at(body, limits::LENGTH_PREFIX_SIZE),
            failed: false,
        })
    }

    fn next_field(&mut self) -> Result<RawField> {
        let r = &mut self.body;
        let type_offset = r.position();
        let code = r.read_byte()?;

        let key_offset = r.position();
        let key_bytes = r.read_cstr()?;
        let key = validate_utf8(key_bytes)
            .map_err(|_| {
                Error::InvalidData(format!("invalid UTF-8 in key at offset {key_offset}"))
            })?
            .to_owned();

        let element_type = ElementType::from_code(code).ok_or(Error::InvalidType {
            code,
            offset: type_offset,
        })?;

        let start = r.position();
        let (payload_offset, payload_length) = match element_type.payload_size() {
            PayloadSize::Empty => (None, 0),
            PayloadSize::Fixed(n) => {
                r.skip(n)?;
                (Some(start), n)
            }
            PayloadSize::Variable => Self::size_variable(r, element_type)?,
        };

        #[cfg(feature = "tracing")]
        trace!(
            key = %key,
            element_type = element_type.name(),
            offset = type_offset,
            payload_length,
            "Scanned field"
        );

        RawField::new(
            key,
            code,
            key_offset,
            key_bytes.len(),
            payload_offset,
            payload_length,
        )
    }

    /// Size a length-prefixed or terminator-delimited payload and move past it.
    fn size_variable(r: &mut Reader<'_>, element_type: ElementType) -> Result<(Option<usize>, usize)> {
        let start = r.position();
        match element_type {
            ElementType::String | ElementType::JavaScriptCode | ElementType::Symbol => {
                let len = r.read_length()?;
                if len < 1 {
                    return Err(Error::InvalidData(format!(
                        "string length {len} at offset {start} must include the NUL terminator"
                    )));
                }
                let content = r.read_bytes(len)?;
                if content[len - 1] != 0 {
                    return Err(Error::InvalidData(format!(
                        "string at offset {start} is not NUL-terminated"
                    )));
                }
                Ok((Some(start + limits::LENGTH_PREFIX_SIZE), len - 1))
            }
            ElementType::EmbeddedDocument | ElementType::Array => {
                let len = r.read_length()?;
                if len < limits::MIN_DOCUMENT_SIZE {
                    return Err(Error::InvalidData(format!(
                        "embedded document length {len} at offset {start} is too small"
                    )));
                }
                r.skip(len - limits::LENGTH_PREFIX_SIZE)?;
                Ok((Some(start), len))
            }
            ElementType::Binary => {
                let len = r.read_length()?;
                // The subtype byte is not counted by the prefix
                let with_subtype = len.checked_add(1).ok_or_else(|| {
                    Error::InvalidData(format!("binary length {len} at offset {start} overflows"))
                })?;
                r.skip(with_subtype)?;
                Ok((Some(start + limits::LENGTH_PREFIX_SIZE), with_subtype))
            }
            ElementType::RegularExpression => {
                r.read_cstr()?;
                r.read_cstr()?;
                Ok((Some(start), r.position() - start))
            }
            ElementType::DbPointer => {
                let len = r.read_length()?;
                if len < 1 {
                    return Err(Error::InvalidData(format!(
                        "db pointer namespace length {len} at offset {start} is too small"
                    )));
                }
                r.skip(len)?;
                r.skip(limits::OBJECT_ID_SIZE)?;
                Ok((Some(start), r.position() - start))
            }
            ElementType::JavaScriptCodeWithScope => {
                let len = r.read_length()?;
                if len < limits::MIN_CODE_WITH_SCOPE_SIZE {
                    return Err(Error::InvalidData(format!(
                        "code with scope length {len} at offset {start} is too small"
                    )));
                }
                r.skip(len - limits::LENGTH_PREFIX_SIZE)?;
                Ok((
                    Some(start + limits::LENGTH_PREFIX_SIZE),
                    len - limits::LENGTH_PREFIX_SIZE,
                ))
            }
            other => Err(Error::InvalidType {
                code: other.code(),
                offset: start,
            }),
        }
    }
}

impl Iterator for Indexer<'_> {
    type Item = Result<RawField>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.body.is_at_end() {
            return None;
        }
        let result = self.next_field();
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

/// Scan every top-level field of `data` in encounter order.
pub fn scan(data: &[u8]) -> Result<Vec<RawField>> {
    Indexer::new(data)?.collect()
}
