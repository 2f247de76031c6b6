//! secp256k1 public keys.
//!
//! A key carries the SEC1 form it was read or derived in. Scripts commit to
//! the serialized bytes through HASH160, so the 33-byte and 65-byte forms of
//! one point are different keys as far as spending is concerned.

use std::fmt;

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::VerifyingKey;

use crate::ec::signature::{digest32, Signature};
use crate::hash::hash160;
use crate::PrimitivesError;

#[derive(Clone, Debug)]
pub struct PublicKey {
    point: VerifyingKey,
    compressed: bool,
}

impl PublicKey {
    /// Parse a compressed (`02`/`03` + X) or uncompressed (`04` + X + Y)
    /// key. Hybrid encodings and points off the curve are rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let compressed = match bytes {
            [0x02 | 0x03, rest @ ..] if rest.len() == 32 => true,
            [0x04, rest @ ..] if rest.len() == 64 => false,
            [] => {
                return Err(PrimitivesError::InvalidPublicKey(
                    "no key bytes".to_string(),
                ))
            }
            [prefix, ..] => {
                return Err(PrimitivesError::InvalidPublicKey(format!(
                    "{} bytes with prefix {:#04x} is not a SEC1 key",
                    bytes.len(),
                    prefix
                )))
            }
        };
        let point = VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|_| PrimitivesError::InvalidPublicKey("point is not on the curve".into()))?;
        Ok(PublicKey { point, compressed })
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        Self::from_bytes(&hex::decode(hex_str)?)
    }

    pub(crate) fn from_verifying_key(point: VerifyingKey, compressed: bool) -> Self {
        PublicKey { point, compressed }
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// SEC1 bytes in the key's own form: 33 or 65 bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode(self.compressed)
    }

    /// SEC1 bytes in the requested form, regardless of the key's own.
    pub fn encode(&self, compressed: bool) -> Vec<u8> {
        self.point.to_encoded_point(compressed).as_bytes().to_vec()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// RIPEMD160(SHA256) of the serialized key, as used by P2PKH and P2WPKH.
    pub fn hash160(&self) -> [u8; 20] {
        hash160(&self.to_bytes())
    }

    /// Check `sig` over the 32-byte digest `hash`.
    ///
    /// Both halves of S are accepted; rejecting high S is a script policy.
    pub fn verify(&self, hash: &[u8], sig: &Signature) -> bool {
        self.point
            .verify_prehash(&digest32(hash), &sig.low_s())
            .is_ok()
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.compressed == other.compressed && self.point == other.point
    }
}

impl Eq for PublicKey {}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
