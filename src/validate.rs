// ABOUTME: Envelope validation for a BSON document buffer.
// ABOUTME: Checks the length prefix against the buffer and the trailing NUL.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_sign_loss)]

use crate::decoder::DecoderConfig;
use crate::error::{Error, Result};
use crate::types::limits;

/// Check that `data` is a well-formed document envelope and return its length.
///
/// This looks only at the length prefix and the last byte; the elements in
/// between are checked when the document is indexed.
pub fn validate(data: &[u8]) -> Result<usize> {
    let prefix: [u8; limits::LENGTH_PREFIX_SIZE] = data
        .get(..limits::LENGTH_PREFIX_SIZE)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| {
            Error::InvalidData(format!(
                "need a {}-byte length prefix, got {} bytes",
                limits::LENGTH_PREFIX_SIZE,
                data.len()
            ))
        })?;

    let declared = i32::from_le_bytes(prefix);
    if declared < limits::MIN_DOCUMENT_SIZE as i32 {
        return Err(Error::InvalidLength(format!(
            "declared length {declared} is below the minimum of {}",
            limits::MIN_DOCUMENT_SIZE
        )));
    }

    let declared = declared as usize;
    if declared != data.len() {
        return Err(Error::InvalidLength(format!(
            "declared length {declared} does not match buffer length {}",
            data.len()
        )));
    }

    if data[declared - 1] != 0 {
        return Err(Error::InvalidLength(
            "document is not terminated by a NUL byte".into(),
        ));
    }

    Ok(declared)
}

/// Validate and additionally enforce the configured size limit.
pub(crate) fn validate_with_config(data: &[u8], config: &DecoderConfig) -> Result<usize> {
    if data.len() > config.max_document_size {
        return Err(Error::InvalidLength(format!(
            "document of {} bytes exceeds the maximum of {}",
            data.len(),
            config.max_document_size
        )));
    }
    validate(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_len(declared: u32, tail: &[u8]) -> Vec<u8> {
        let mut v = declared.to_le_bytes().to_vec();
        v.extend_from_slice(tail);
        v
    }

    #[test]
    fn test_empty_buffer_is_invalid_data() {
        assert_eq!(validate(&[]).unwrap_err().error_type(), "invalid_data");
        assert_eq!(validate(&[5, 0, 0]).unwrap_err().error_type(), "invalid_data");
    }

    #[test]
    fn test_declared_length_too_small() {
        let data = doc_with_len(2, &[0]);
        assert_eq!(validate(&data).unwrap_err().error_type(), "invalid_length");

        let negative = doc_with_len(u32::MAX, &[0]);
        assert_eq!(validate(&negative).unwrap_err().error_type(), "invalid_length");
    }

    #[test]
    fn test_declared_length_mismatch() {
        // 5 bytes declaring 10
        let data = doc_with_len(10, &[0]);
        assert_eq!(validate(&data).unwrap_err().error_type(), "invalid_length");

        // 10 bytes declaring 10 but not NUL-terminated
        let data = doc_with_len(10, b"abcdef");
        assert_eq!(validate(&data).unwrap_err().error_type(), "invalid_length");
    }

    #[test]
    fn test_minimal_document() {
        assert_eq!(validate(&[5, 0, 0, 0, 0]).unwrap(), 5);
    }

    #[test]
    fn test_max_document_size() {
        let config = DecoderConfig {
            max_document_size: 4,
            ..DecoderConfig::default()
        };
        let err = validate_with_config(&[5, 0, 0, 0, 0], &config).unwrap_err();
        assert_eq!(err.error_type(), "invalid_length");
        assert!(validate_with_config(&[5, 0, 0, 0, 0], &DecoderConfig::default()).is_ok());
    }
}
