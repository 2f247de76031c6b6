//! Private keys and RFC6979 signing.

use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{self, SigningKey};
use rand::rngs::OsRng;

use crate::ec::public_key::PublicKey;
use crate::ec::signature::{digest32, Signature};
use crate::PrimitivesError;

const PRIVATE_KEY_BYTES_LEN: usize = 32;

/// A secp256k1 signing key.
///
/// The `compressed` flag picks the form of the derived public key, and so
/// the HASH160 a P2PKH output made for it commits to.
#[derive(Clone, Debug)]
pub struct PrivateKey {
    inner: SigningKey,
    compressed: bool,
}

impl PrivateKey {
    /// A fresh key drawn from the OS RNG, compressed form.
    pub fn new() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        PrivateKey {
            inner: signing_key,
            compressed: true,
        }
    }

    /// Load a big-endian 32-byte scalar.
    ///
    /// Zero and values at or above the curve order are rejected. The key
    /// starts out compressed; see `with_compression`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != PRIVATE_KEY_BYTES_LEN {
            return Err(PrimitivesError::InvalidKeyLength {
                expected: PRIVATE_KEY_BYTES_LEN,
                got: bytes.len(),
            });
        }
        let signing_key = SigningKey::from_bytes(bytes.into())
            .map_err(|e| PrimitivesError::InvalidPrivateKey(e.to_string()))?;
        Ok(PrivateKey {
            inner: signing_key,
            compressed: true,
        })
    }

    /// Load a scalar from 64 hex characters.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        if hex_str.is_empty() {
            return Err(PrimitivesError::InvalidPrivateKey(
                "private key hex is empty".to_string(),
            ));
        }
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Return this key with the given public key form.
    ///
    /// # Arguments
    /// * `compressed` - `false` to make `pub_key` return the 65-byte form.
    pub fn with_compression(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    /// Report whether the derived public key is compressed.
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// The scalar, big-endian.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.inner.to_bytes());
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// The matching public key, in this key's compression form.
    pub fn pub_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(*self.inner.verifying_key(), self.compressed)
    }

    /// Sign a 32-byte digest with an RFC6979 nonce.
    ///
    /// The result always has a low S value, and the same key and digest
    /// always give the same signature.
    pub fn sign(&self, hash: &[u8]) -> Result<Signature, PrimitivesError> {
        let sig: ecdsa::Signature = self
            .inner
            .sign_prehash(&digest32(hash))
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
        Ok(Signature::from_k256(sig.normalize_s().unwrap_or(sig)))
    }
}

impl Default for PrivateKey {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        // SigningKey zeroizes itself; this clears the copy made here.
        let mut bytes = self.inner.to_bytes();
        bytes.zeroize();
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.compressed == other.compressed && self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PrivateKey {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256d;

    const SCALAR: &str = "eaf02ca348c524e6392655ba4d29603cd1a7347d9d65cfe93ce1ebffdca22694";

    #[test]
    fn test_bytes_and_hex_agree() {
        let from_hex = PrivateKey::from_hex(SCALAR).unwrap();
        let from_bytes = PrivateKey::from_bytes(&hex::decode(SCALAR).unwrap()).unwrap();
        assert_eq!(from_hex, from_bytes);
        assert_eq!(from_hex.to_hex(), SCALAR);
        assert!(from_hex.is_compressed());

        let fresh = PrivateKey::new();
        assert_eq!(PrivateKey::from_bytes(&fresh.to_bytes()).unwrap(), fresh);
    }

    #[test]
    fn test_signature_checks_under_own_pub_key() {
        let key = PrivateKey::from_hex(SCALAR).unwrap();
        let digest = sha256d(b"spend");
        let sig = key.sign(&digest).unwrap();
        assert!(key.pub_key().verify(&digest, &sig));
        assert_eq!(key.sign(&digest).unwrap(), sig);
    }

    #[test]
    fn test_rejects_bad_input() {
        for bad in ["", "abcd", "zz", &SCALAR[..62]] {
            assert!(PrivateKey::from_hex(bad).is_err(), "{:?}", bad);
        }
        assert!(matches!(
            PrivateKey::from_bytes(&[1u8; 33]),
            Err(PrimitivesError::InvalidKeyLength { expected: 32, got: 33 })
        ));
        assert!(PrivateKey::from_hex(&"00".repeat(32)).is_err());
        assert!(PrivateKey::from_hex(
            "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141"
        )
        .is_err());
    }

    #[test]
    fn test_uncompressed_pub_key() {
        let pk = PrivateKey::from_hex(
            "421c76d77563afa1914846b010bd164f395bd34c2102e5e99e0cb9cf173c1d87",
        )
        .unwrap()
        .with_compression(false);
        assert!(!pk.is_compressed());
        assert_eq!(
            pk.pub_key().to_hex(),
            "04f260c8b554e9d0921c507fb231d0e226ba17462078825c56170facb6567dcec700750bd529f4361da21f59fbfc7d0bce319fdef4e7c524e82d3e313e92b1b347"
        );
        assert_ne!(pk, pk.clone().with_compression(true));
    }
}
