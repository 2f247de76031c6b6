//! Numeric stack operands.
//!
//! Numbers are little-endian sign-magnitude: the top bit of the last byte is
//! the sign. Operands are limited in length when read, but results are not,
//! so `1 ADD` on the largest four-byte value yields a valid five-byte item
//! that can no longer be used as an operand.

use std::cmp::Ordering;
use std::ops::{Add, Neg, Sub};

use num_bigint::{BigInt, Sign};
use num_traits::{Signed, ToPrimitive, Zero};

use super::error::{InterpreterError, InterpreterErrorCode};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ScriptNumber(BigInt);

impl ScriptNumber {
    pub fn new(val: i64) -> Self {
        ScriptNumber(BigInt::from(val))
    }

    /// Decode a stack item of at most `max_len` bytes.
    ///
    /// With `require_minimal` set, encodings that carry a redundant
    /// trailing byte (including negative zero) are rejected.
    pub fn decode(
        bytes: &[u8],
        max_len: usize,
        require_minimal: bool,
    ) -> Result<Self, InterpreterError> {
        if bytes.len() > max_len {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NumberTooBig,
                format!(
                    "{}-byte operand exceeds the {}-byte limit",
                    bytes.len(),
                    max_len
                ),
            ));
        }
        if require_minimal {
            check_minimal(bytes)?;
        }

        let Some((&last, _)) = bytes.split_last() else {
            return Ok(ScriptNumber::default());
        };
        let mut magnitude = bytes.to_vec();
        let top = magnitude.len() - 1;
        magnitude[top] = last & 0x7f;
        let sign = if last & 0x80 != 0 { Sign::Minus } else { Sign::Plus };
        Ok(ScriptNumber(BigInt::from_bytes_le(sign, &magnitude)))
    }

    /// Minimal encoding; zero is the empty vector.
    pub fn encode(&self) -> Vec<u8> {
        if self.0.is_zero() {
            return Vec::new();
        }
        let (sign, mut out) = self.0.to_bytes_le();
        let sign_bit = if sign == Sign::Minus { 0x80 } else { 0x00 };
        match out.last_mut() {
            Some(msb) if *msb & 0x80 == 0 => *msb |= sign_bit,
            _ => out.push(sign_bit),
        }
        out
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn abs(&self) -> Self {
        ScriptNumber(self.0.abs())
    }

    /// The value saturated to the `i32` range, as OP_PICK and friends use it.
    pub fn to_i32(&self) -> i32 {
        self.0.to_i32().unwrap_or(match self.0.sign() {
            Sign::Minus => i32::MIN,
            _ => i32::MAX,
        })
    }

    /// The value saturated to the `i64` range.
    pub fn to_i64(&self) -> i64 {
        self.0.to_i64().unwrap_or(match self.0.sign() {
            Sign::Minus => i64::MIN,
            _ => i64::MAX,
        })
    }
}

impl From<i64> for ScriptNumber {
    fn from(val: i64) -> Self {
        ScriptNumber::new(val)
    }
}

impl From<bool> for ScriptNumber {
    fn from(val: bool) -> Self {
        ScriptNumber::new(val as i64)
    }
}

impl Add for ScriptNumber {
    type Output = ScriptNumber;

    fn add(self, rhs: ScriptNumber) -> ScriptNumber {
        ScriptNumber(self.0 + rhs.0)
    }
}

impl Sub for ScriptNumber {
    type Output = ScriptNumber;

    fn sub(self, rhs: ScriptNumber) -> ScriptNumber {
        ScriptNumber(self.0 - rhs.0)
    }
}

impl Neg for ScriptNumber {
    type Output = ScriptNumber;

    fn neg(self) -> ScriptNumber {
        ScriptNumber(-self.0)
    }
}

impl PartialEq<i64> for ScriptNumber {
    fn eq(&self, other: &i64) -> bool {
        self.0 == BigInt::from(*other)
    }
}

impl PartialOrd<i64> for ScriptNumber {
    fn partial_cmp(&self, other: &i64) -> Option<Ordering> {
        self.0.partial_cmp(&BigInt::from(*other))
    }
}

/// Reject an operand whose last byte only carries the sign.
///
/// Such a byte is redundant unless the byte below it already uses its
/// high bit for magnitude.
pub fn check_minimal(bytes: &[u8]) -> Result<(), InterpreterError> {
    match bytes {
        [.., last] if last & 0x7f != 0 => Ok(()),
        [] => Ok(()),
        [.., below, _] if below & 0x80 != 0 => Ok(()),
        _ => Err(InterpreterError::new(
            InterpreterErrorCode::MinimalData,
            format!("operand {} is not minimally encoded", hex::encode(bytes)),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_table() {
        let cases: &[(i64, &str)] = &[
            (0, ""),
            (1, "01"),
            (-1, "81"),
            (127, "7f"),
            (-127, "ff"),
            (128, "8000"),
            (-128, "8080"),
            (255, "ff00"),
            (256, "0001"),
            (-256, "0081"),
            (32767, "ff7f"),
            (-32768, "008080"),
            (65535, "ffff00"),
            (8388608, "00008000"),
            (2147483647, "ffffff7f"),
            (-2147483647, "ffffffff"),
            (2147483648, "0000008000"),
            (-4294967295, "ffffffff80"),
            (4294967296, "0000000001"),
            (i64::MAX, "ffffffffffffff7f"),
            (-i64::MAX, "ffffffffffffffff"),
        ];
        for &(value, want) in cases {
            let n = ScriptNumber::new(value);
            assert_eq!(hex::encode(n.encode()), want, "encode {}", value);
            let back = ScriptNumber::decode(&n.encode(), 8, true).unwrap();
            assert_eq!(back, n, "decode {}", want);
        }
    }

    #[test]
    fn test_decode_limits_and_minimality() {
        // (bytes, max_len, minimal, expected value or None for error)
        let cases: &[(&str, usize, bool, Option<i64>)] = &[
            ("80", 4, true, None),
            ("80", 4, false, Some(0)),
            ("00", 4, true, None),
            ("00", 4, false, Some(0)),
            ("0100", 4, true, None),
            ("0100", 4, false, Some(1)),
            ("8000", 4, true, Some(128)),
            ("0080", 4, false, Some(0)),
            ("ffffff7f", 4, true, Some(2147483647)),
            ("0000008000", 4, true, None),
            ("ffffffff7f", 5, true, Some(549755813887)),
            ("ffffffffff", 5, true, Some(-549755813887)),
        ];
        for &(hex_str, max_len, minimal, want) in cases {
            let bytes = hex::decode(hex_str).unwrap();
            let got = ScriptNumber::decode(&bytes, max_len, minimal).ok().map(|n| n.to_i64());
            assert_eq!(got, want, "decode {} (max {}, minimal {})", hex_str, max_len, minimal);
        }
        let err = ScriptNumber::decode(&[1, 2, 3, 4, 5], 4, false).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::NumberTooBig);
    }

    #[test]
    fn test_saturating_conversions() {
        assert_eq!(ScriptNumber::new(2147483648).to_i32(), i32::MAX);
        assert_eq!(ScriptNumber::new(-2147483649).to_i32(), i32::MIN);
        assert_eq!(ScriptNumber::new(-7).to_i32(), -7);
        let huge = ScriptNumber::new(i64::MAX) + ScriptNumber::new(1);
        assert_eq!(huge.to_i64(), i64::MAX);
        assert_eq!((-huge - ScriptNumber::new(1)).to_i64(), i64::MIN);
    }

    #[test]
    fn test_arithmetic_may_overflow_operand_size() {
        let n = ScriptNumber::new(2147483647) + ScriptNumber::new(1);
        assert_eq!(hex::encode(n.encode()), "0000008000");
        assert!(ScriptNumber::decode(&n.encode(), 4, false).is_err());
        assert_eq!(-n.clone(), ScriptNumber::new(-2147483648));
        assert_eq!((-n).abs() - ScriptNumber::new(1), 2147483647);
        assert!(ScriptNumber::new(-2) < 0);
        assert!(ScriptNumber::new(3) > ScriptNumber::new(-3));
        assert_eq!(ScriptNumber::from(true), 1);
    }
}
