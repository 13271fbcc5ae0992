// ABOUTME: Bounds-checked little-endian cursor over a BSON byte region.
// ABOUTME: Shared by the field scanner and the value decoder; never reads past its slice.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_sign_loss)]

use crate::error::{Error, Result};

/// A cursor over `data` whose positions are absolute offsets into it.
///
/// Callers that must not read past some boundary (the final NUL of a document,
/// the end of a field payload) pass a slice truncated at that boundary. Every
/// read is checked and reports the offset at which it failed.
#[derive(Debug, Clone)]
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    #[inline]
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Start reading at `pos` (which may equal `data.len()`).
    #[inline]
    pub(crate) fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    #[inline]
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    #[inline]
    pub(crate) fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Read a single byte, advancing position.
    #[inline]
    pub(crate) fn read_byte(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| self.truncated(1))?;
        self.pos += 1;
        Ok(byte)
    }

    /// Read exactly n bytes.
    #[inline]
    pub(crate) fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| self.truncated(n))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    #[inline]
    pub(crate) fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_bytes(N)?);
        Ok(buf)
    }

    #[inline]
    pub(crate) fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    #[inline]
    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    #[inline]
    pub(crate) fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    #[inline]
    pub(crate) fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Read an int32 length prefix, rejecting negative values.
    pub(crate) fn read_length(&mut self) -> Result<usize> {
        let at = self.pos;
        let len = self.read_i32()?;
        if len < 0 {
            return Err(Error::InvalidData(format!(
                "negative length {len} at offset {at}"
            )));
        }
        Ok(len as usize)
    }

    /// Read a NUL-terminated byte string, consuming the terminator.
    /// The returned slice excludes the NUL.
    pub(crate) fn read_cstr(&mut self) -> Result<&'a [u8]> {
        let start = self.pos;
        let rest = self.data.get(start..).unwrap_or_default();
        let nul = memchr::memchr(0, rest).ok_or_else(|| {
            Error::InvalidData(format!("unterminated string at offset {start}"))
        })?;
        self.pos = start + nul + 1;
        Ok(&rest[..nul])
    }

    /// Advance past n bytes without looking at them.
    #[inline]
    pub(crate) fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    fn truncated(&self, wanted: usize) -> Error {
        Error::InvalidData(format!(
            "need {wanted} bytes at offset {}, {} available",
            self.pos,
            self.remaining()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_little_endian() {
        let data = [0x2a, 0, 0, 0, 0xff, 0xff, 0xff, 0xff, 1];
        let mut r = Reader::new(&data);
        assert_eq!(r.read_i32().unwrap(), 42);
        assert_eq!(r.read_u32().unwrap(), u32::MAX);
        assert_eq!(r.read_byte().unwrap(), 1);
        assert!(r.is_at_end());
        assert!(r.read_byte().is_err());
    }

    #[test]
    fn test_read_past_end_keeps_position() {
        let data = [1, 2, 3];
        let mut r = Reader::at(&data, 1);
        let err = r.read_i32().unwrap_err();
        assert_eq!(err.error_type(), "invalid_data");
        assert!(err.to_string().contains("offset 1"));
        assert_eq!(r.position(), 1);
        assert_eq!(r.read_bytes(2).unwrap(), &[2, 3]);
    }

    #[test]
    fn test_read_length_rejects_negative() {
        let data = (-1i32).to_le_bytes();
        let err = Reader::new(&data).read_length().unwrap_err();
        assert!(err.to_string().contains("negative length -1"));
    }

    #[test]
    fn test_read_cstr() {
        let data = b"abc\0im\0";
        let mut r = Reader::new(data);
        assert_eq!(r.read_cstr().unwrap(), b"abc");
        assert_eq!(r.read_cstr().unwrap(), b"im");
        assert!(r.is_at_end());

        let mut r = Reader::new(b"abc");
        assert!(r.read_cstr().is_err());
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn test_huge_skip_does_not_overflow() {
        let data = [0u8; 4];
        let mut r = Reader::at(&data, 2);
        assert!(r.skip(usize::MAX).is_err());
    }
}
