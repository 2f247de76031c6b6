//! 32-byte double-SHA256 identifiers.
//!
//! Bytes are kept in wire order. Text forms (`Display`, `FromStr`, serde)
//! use the reversed order in which transaction IDs are usually written.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::hash::sha256d;
use crate::PrimitivesError;

pub const HASH_SIZE: usize = 32;

/// A transaction ID or other double-SHA256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, PartialOrd, Ord)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// Wrap bytes already in wire order.
    pub fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    /// Wrap a wire-order slice, which must be exactly 32 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        <[u8; HASH_SIZE]>::try_from(bytes)
            .map(Hash)
            .map_err(|_| {
                PrimitivesError::InvalidHash(format!(
                    "expected {} bytes, got {}",
                    HASH_SIZE,
                    bytes.len()
                ))
            })
    }

    /// Parse display-order hex, as printed by `Display`.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        let mut bytes = hex::decode(hex_str)?;
        bytes.reverse();
        Self::from_bytes(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }
}

impl From<[u8; HASH_SIZE]> for Hash {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0.iter().rev() {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl FromStr for Hash {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hash::from_hex(s)
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Double SHA-256 of `data` as a `Hash`.
pub fn double_hash_h(data: &[u8]) -> Hash {
    Hash(sha256d(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS: &str = "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f";

    #[test]
    fn test_display_is_reversed() {
        let hash: Hash = GENESIS.parse().unwrap();
        assert_eq!(hash.as_bytes()[0], 0x6f);
        assert_eq!(hash.as_bytes()[31], 0x00);
        assert_eq!(hash.to_string(), GENESIS);
    }

    #[test]
    fn test_invalid_input() {
        assert!(Hash::from_hex(&GENESIS[4..]).is_err());
        assert!(Hash::from_hex(&"00".repeat(33)).is_err());
        assert!(Hash::from_hex("abcdefg").is_err());
        assert!(Hash::from_bytes(&[0u8; 31]).is_err());
        assert_eq!(Hash::from_bytes(&[7u8; 32]).unwrap(), Hash::new([7u8; 32]));
    }

    #[test]
    fn test_serde_uses_display_form() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            txid: Hash,
        }

        let data = Wrapper {
            txid: double_hash_h(b""),
        };
        let json = serde_json::to_string(&data).unwrap();
        assert_eq!(
            json,
            r#"{"txid":"56944c5d3f98413ef45cf54545538103cc9f298e0575820ad3591376e2e0f65d"}"#
        );
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.txid, data.txid);
    }
}
