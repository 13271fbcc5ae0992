// ABOUTME: IEEE 754-2008 128-bit decimal (BID encoding) as stored by BSON.
// ABOUTME: Keeps the raw 16 bytes and renders the canonical decimal string.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::types::limits::DECIMAL128_SIZE;

const EXPONENT_BIAS: i32 = 6176;
const EXPONENT_MASK: u64 = 0x3fff;
/// Largest canonical coefficient: 10^34 - 1.
const MAX_COEFFICIENT: u128 = 9_999_999_999_999_999_999_999_999_999_999_999;
const COEFFICIENT_MASK: u128 = (1 << 113) - 1;

/// A 128-bit decimal floating point value.
///
/// The value is kept as its little-endian wire bytes. `Display` produces the
/// canonical string form used by the BSON corpus (for example `1E+3`,
/// `0.000001234567890123456789012345678901234`, `-Infinity`, `NaN`).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal128 {
    bytes: [u8; DECIMAL128_SIZE],
}

/// The decoded parts of a finite decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Parts {
    negative: bool,
    coefficient: u128,
    exponent: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Finite(Parts),
    Infinity { negative: bool },
    NaN,
}

impl Decimal128 {
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; DECIMAL128_SIZE]) -> Self {
        Self { bytes }
    }

    #[inline]
    #[must_use]
    pub const fn bytes(&self) -> [u8; DECIMAL128_SIZE] {
        self.bytes
    }

    #[must_use]
    pub fn is_nan(&self) -> bool {
        matches!(self.classify(), Class::NaN)
    }

    #[must_use]
    pub fn is_infinite(&self) -> bool {
        matches!(self.classify(), Class::Infinity { .. })
    }

    #[must_use]
    pub fn is_sign_negative(&self) -> bool {
        self.bytes[DECIMAL128_SIZE - 1] & 0x80 != 0
    }

    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_possible_wrap)]
    fn classify(&self) -> Class {
        let bits = u128::from_le_bytes(self.bytes);
        let high = (bits >> 64) as u64;
        let negative = high >> 63 == 1;
        let combination = (high >> 58) & 0x1f;

        if (high >> 61) & 0b11 == 0b11 {
            match combination {
                0x1e => return Class::Infinity { negative },
                0x1f => return Class::NaN,
                _ => {}
            }
            // The implied coefficient is 0b100 followed by 111 bits, which is
            // always above the canonical maximum and therefore reads as zero.
            let exponent = ((high >> 47) & EXPONENT_MASK) as i32 - EXPONENT_BIAS;
            return Class::Finite(Parts {
                negative,
                coefficient: 0,
                exponent,
            });
        }

        let exponent = ((high >> 49) & EXPONENT_MASK) as i32 - EXPONENT_BIAS;
        let mut coefficient = bits & COEFFICIENT_MASK;
        if coefficient > MAX_COEFFICIENT {
            coefficient = 0;
        }
        Class::Finite(Parts {
            negative,
            coefficient,
            exponent,
        })
    }
}

impl fmt::Display for Decimal128 {
    #[allow(clippy::cast_possible_wrap)]
    #[allow(clippy::cast_possible_truncation)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = match self.classify() {
            Class::NaN => return f.write_str("NaN"),
            Class::Infinity { negative: true } => return f.write_str("-Infinity"),
            Class::Infinity { negative: false } => return f.write_str("Infinity"),
            Class::Finite(parts) => parts,
        };

        if parts.negative {
            f.write_str("-")?;
        }

        let digits = parts.coefficient.to_string();
        let digit_count = digits.len() as i32;
        let scientific_exponent = digit_count - 1 + parts.exponent;

        if parts.exponent > 0 || scientific_exponent < -6 {
            f.write_str(&digits[..1])?;
            if digits.len() > 1 {
                write!(f, ".{}", &digits[1..])?;
            }
            let sign = if scientific_exponent < 0 { '-' } else { '+' };
            return write!(f, "E{sign}{}", scientific_exponent.unsigned_abs());
        }

        if parts.exponent == 0 {
            return f.write_str(&digits);
        }

        let radix_position = digit_count + parts.exponent;
        if radix_position > 0 {
            let split = radix_position as usize;
            write!(f, "{}.{}", &digits[..split], &digits[split..])
        } else {
            f.write_str("0.")?;
            for _ in 0..radix_position.unsigned_abs() {
                f.write_str("0")?;
            }
            f.write_str(&digits)
        }
    }
}

impl fmt::Debug for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal128({self})")
    }
}

impl Serialize for Decimal128 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(hex_str: &str) -> Decimal128 {
        let mut bytes = [0u8; DECIMAL128_SIZE];
        hex::decode_to_slice(hex_str, &mut bytes).unwrap();
        Decimal128::from_bytes(bytes)
    }

    #[test]
    fn test_canonical_strings() {
        let cases = [
            ("00000000000000000000000000004030", "0"),
            ("000000000000000000000000000040B0", "-0"),
            ("01000000000000000000000000004030", "1"),
            ("010000000000000000000000000040B0", "-1"),
            ("01000000000000000000000000003E30", "0.1"),
            ("01000000000000000000000000004630", "1E+3"),
            ("01000000000000000000000000003230", "1E-7"),
            ("01000000000000000000000000003430", "0.000001"),
            ("64000000000000000000000000003CB0", "-1.00"),
            ("39300000000000000000000000003A30", "12.345"),
            (
                "F2AF967ED05C82DE3297FF6FDE3CF22F",
                "0.000001234567890123456789012345678901234",
            ),
        ];
        for (bytes, expected) in cases {
            assert_eq!(dec(bytes).to_string(), expected, "bytes {bytes}");
        }
    }

    #[test]
    fn test_special_values() {
        let inf = dec("00000000000000000000000000000078");
        assert_eq!(inf.to_string(), "Infinity");
        assert!(inf.is_infinite());

        let neg_inf = dec("000000000000000000000000000000F8");
        assert_eq!(neg_inf.to_string(), "-Infinity");
        assert!(neg_inf.is_sign_negative());

        let nan = dec("0000000000000000000000000000007C");
        assert_eq!(nan.to_string(), "NaN");
        assert!(nan.is_nan());
        assert!(!nan.is_infinite());
    }

    #[test]
    fn test_non_canonical_coefficient_reads_as_zero() {
        // Combination bits 11 with a non-special field: implied coefficient overflows
        let d = dec("00000000000000000000000000006C70");
        assert_eq!(d.to_string().trim_start_matches('-').chars().next(), Some('0'));
    }
}
