// ABOUTME: Field index of a structure: ordered descriptors, key lookup and per-field memo.
// ABOUTME: Also provides FieldRef, a handle that detects when its structure is gone.

#![allow(clippy::missing_errors_doc)]

use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::sync::{OnceLock, Weak};

use crate::decoder::{decode_field, DecoderConfig, DuplicateKeyMode};
use crate::document::Inner;
use crate::error::{Error, Result};
use crate::indexer::{Indexer, RawField};
use crate::types::ElementType;
use crate::value::Value;

/// One indexed field: where it lives, plus its value once decoded.
pub struct Field {
    raw: RawField,
    value: OnceLock<Value>,
}

impl Field {
    pub(crate) fn new(raw: RawField) -> Self {
        Self {
            raw,
            value: OnceLock::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        self.raw.key()
    }

    #[inline]
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        self.raw.element_type()
    }

    /// The offsets and lengths found by the scanner.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &RawField {
        &self.raw
    }

    /// Whether the value has been decoded yet.
    #[must_use]
    pub fn is_decoded(&self) -> bool {
        self.value.get().is_some()
    }

    /// Decode the value on first call and return the memoized value afterwards.
    ///
    /// The decode runs outside the cell. If two threads race, both decode and
    /// the first to publish wins; the loser's result is dropped.
    pub(crate) fn value(&self, source: &Bytes, config: DecoderConfig) -> Result<&Value> {
        if let Some(value) = self.value.get() {
            return Ok(value);
        }
        let decoded = decode_field(&self.raw, source, config)?;
        Ok(self.value.get_or_init(|| decoded))
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("raw", &self.raw)
            .field("decoded", &self.is_decoded())
            .finish()
    }
}

/// Index over the top-level fields of one structure.
#[derive(Debug)]
pub struct Index {
    fields: Vec<Field>,
    /// Key to position. Empty for arrays, which are addressed by position.
    by_key: HashMap<String, usize>,
}

impl Index {
    /// Index a document by key.
    pub(crate) fn for_document(data: &[u8], config: &DecoderConfig) -> Result<Self> {
        let mut fields = Vec::new();
        let mut by_key = HashMap::new();

        for raw in Indexer::new(data)? {
            let raw = raw?;
            let position = fields.len();
            match config.duplicate_key_mode {
                DuplicateKeyMode::KeepLast => {
                    by_key.insert(raw.key().to_owned(), position);
                }
                DuplicateKeyMode::KeepFirst => {
                    by_key.entry(raw.key().to_owned()).or_insert(position);
                }
                DuplicateKeyMode::Error => {
                    if by_key.insert(raw.key().to_owned(), position).is_some() {
                        return Err(Error::DuplicateKey(raw.key().to_owned()));
                    }
                }
            }
            fields.push(Field::new(raw));
        }

        Ok(Self { fields, by_key })
    }

    /// Index an array by position, optionally checking its keys are "0", "1", ...
    pub(crate) fn for_array(data: &[u8], config: &DecoderConfig) -> Result<Self> {
        let mut fields = Vec::new();

        for raw in Indexer::new(data)? {
            let raw = raw?;
            if config.validate_array_keys && !is_position_key(raw.key(), fields.len()) {
                return Err(Error::InvalidData(format!(
                    "array key \"{}\" at offset {} does not match position {}",
                    raw.key(),
                    raw.key_offset(),
                    fields.len()
                )));
            }
            fields.push(Field::new(raw));
        }

        Ok(Self {
            fields,
            by_key: HashMap::new(),
        })
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// All fields in encounter order, duplicates included.
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Position of the field a keyed lookup of `key` resolves to.
    #[must_use]
    pub fn position(&self, key: &str) -> Option<usize> {
        self.by_key.get(key).copied()
    }

    #[inline]
    #[must_use]
    pub fn field(&self, position: usize) -> Option<&Field> {
        self.fields.get(position)
    }
}

fn is_position_key(key: &str, position: usize) -> bool {
    key.parse::<usize>().is_ok_and(|n| n == position) && (key == "0" || !key.starts_with('0'))
}

/// A detached handle to one field of a structure.
///
/// Unlike a `&Field`, a `FieldRef` does not keep its structure alive. Reading
/// through it after every `Document`/`PackedArray` sharing the buffer has been
/// dropped fails with [`Error::StaleReference`].
#[derive(Clone)]
pub struct FieldRef {
    owner: Weak<Inner>,
    position: usize,
    key: String,
    element_type: ElementType,
}

impl FieldRef {
    pub(crate) fn new(owner: Weak<Inner>, position: usize, field: &Field) -> Self {
        Self {
            owner,
            position,
            key: field.key().to_owned(),
            element_type: field.element_type(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Whether the owning structure is still alive.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.owner.strong_count() > 0
    }

    /// Read the field's value, decoding it if no one has yet.
    pub fn value(&self) -> Result<Value> {
        let owner = self.owner.upgrade().ok_or(Error::StaleReference)?;
        owner.value_at(self.position).cloned()
    }
}

impl fmt::Debug for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRef")
            .field("key", &self.key)
            .field("position", &self.position)
            .field("valid", &self.is_valid())
            .finish()
    }
}
