//! ECDSA signatures as they appear in Bitcoin scripts.
//!
//! Parsing is lax in the way consensus requires: the sequence length is
//! ignored, long-form lengths and zero-padded integers are accepted. Strict
//! DER is a script policy enforced by the interpreter, not here.
//! Serialization always emits strict DER with a low S value.

use k256::ecdsa;

use crate::PrimitivesError;

/// An ECDSA signature over secp256k1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature {
    inner: ecdsa::Signature,
}

impl Signature {
    /// Build a signature from big-endian R and S values.
    ///
    /// Fails if either value is zero or not below the curve order.
    pub fn from_scalars(r: [u8; 32], s: [u8; 32]) -> Result<Self, PrimitivesError> {
        let inner = ecdsa::Signature::from_scalars(k256::FieldBytes::from(r), k256::FieldBytes::from(s))
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
        Ok(Signature { inner })
    }

    /// Parse a DER-style signature without the sighash byte.
    pub fn from_der(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let mut der = DerReader { data: bytes, pos: 0 };
        der.expect(0x30)?;
        der.skip_length()?;
        let r = der.read_integer()?;
        let s = der.read_integer()?;
        Self::from_scalars(r, s)
    }

    /// Strict DER encoding of the low-S form.
    pub fn to_der(&self) -> Vec<u8> {
        self.low_s().to_der().as_bytes().to_vec()
    }

    pub fn r(&self) -> [u8; 32] {
        let (r, _) = self.inner.split_bytes();
        let mut out = [0u8; 32];
        out.copy_from_slice(&r);
        out
    }

    pub fn s(&self) -> [u8; 32] {
        let (_, s) = self.inner.split_bytes();
        let mut out = [0u8; 32];
        out.copy_from_slice(&s);
        out
    }

    /// Report whether S is at most half the curve order (BIP62).
    pub fn is_low_s(&self) -> bool {
        self.inner.normalize_s().is_none()
    }

    pub(crate) fn from_k256(inner: ecdsa::Signature) -> Self {
        Signature { inner }
    }

    /// The signature with S mirrored into the lower half of the order.
    pub(crate) fn low_s(&self) -> ecdsa::Signature {
        self.inner.normalize_s().unwrap_or(self.inner)
    }
}

/// Left-pad or truncate a message digest to the 32 bytes secp256k1 signs.
pub(crate) fn digest32(hash: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    if hash.len() >= 32 {
        out.copy_from_slice(&hash[..32]);
    } else {
        out[32 - hash.len()..].copy_from_slice(hash);
    }
    out
}

struct DerReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> DerReader<'a> {
    fn next(&mut self) -> Result<u8, PrimitivesError> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| malformed("unexpected end of signature"))?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], PrimitivesError> {
        if n > self.data.len() - self.pos {
            return Err(malformed("length exceeds signature"));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn expect(&mut self, tag: u8) -> Result<(), PrimitivesError> {
        match self.next()? {
            b if b == tag => Ok(()),
            b => Err(malformed(&format!("expected tag {:#04x}, found {:#04x}", tag, b))),
        }
    }

    /// The sequence length is not checked against the data.
    fn skip_length(&mut self) -> Result<(), PrimitivesError> {
        let b = self.next()?;
        if b & 0x80 != 0 {
            self.take((b & 0x7f) as usize)?;
        }
        Ok(())
    }

    fn read_length(&mut self) -> Result<usize, PrimitivesError> {
        let b = self.next()?;
        if b & 0x80 == 0 {
            return Ok(b as usize);
        }
        let digits = self.take((b & 0x7f) as usize)?;
        let digits = strip_leading_zeros(digits);
        if digits.len() > std::mem::size_of::<u32>() {
            return Err(malformed("integer length too large"));
        }
        Ok(digits.iter().fold(0usize, |acc, &d| (acc << 8) | d as usize))
    }

    fn read_integer(&mut self) -> Result<[u8; 32], PrimitivesError> {
        self.expect(0x02)?;
        let len = self.read_length()?;
        let value = strip_leading_zeros(self.take(len)?);
        if value.len() > 32 {
            return Err(malformed("integer exceeds 32 bytes"));
        }
        let mut out = [0u8; 32];
        out[32 - value.len()..].copy_from_slice(value);
        Ok(out)
    }
}

fn strip_leading_zeros(mut bytes: &[u8]) -> &[u8] {
    while let [0, rest @ ..] = bytes {
        bytes = rest;
    }
    bytes
}

fn malformed(msg: &str) -> PrimitivesError {
    PrimitivesError::InvalidSignature(format!("malformed signature: {}", msg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ec::PrivateKey;
    use crate::hash::{sha256, sha256d};

    const DER_1: &str = "304402204e45e16932b8af514961a1d3a1a25fdf3f4f7732e9d624c6c61548ab5fb8cd410220181522ec8eca07de4860a4acdd12909d831cc56cbbac4622082221a8768d1d09";

    fn scalar(hex_str: &str) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&hex::decode(hex_str).unwrap());
        out
    }

    #[test]
    fn test_der_parsing() {
        let valid = hex::decode(DER_1).unwrap();
        let sig = Signature::from_der(&valid).unwrap();
        assert_eq!(
            hex::encode(sig.r()),
            "4e45e16932b8af514961a1d3a1a25fdf3f4f7732e9d624c6c61548ab5fb8cd41"
        );
        assert_eq!(sig.to_der(), valid);

        assert!(Signature::from_der(&[]).is_err());

        let mut bad_magic = valid.clone();
        bad_magic[0] = 0x31;
        assert!(Signature::from_der(&bad_magic).is_err());

        let mut bad_marker = valid.clone();
        bad_marker[2] = 0x03;
        assert!(Signature::from_der(&bad_marker).is_err());

        assert!(Signature::from_der(&valid[..valid.len() - 1]).is_err());
    }

    #[test]
    fn test_lax_der_is_accepted() {
        let strict = hex::decode(DER_1).unwrap();

        // Long-form lengths and a zero-padded R
        let mut lax = vec![0x30, 0x81, 0x47, 0x02, 0x81, 0x21, 0x00];
        lax.extend_from_slice(&strict[4..36]);
        lax.extend_from_slice(&strict[36..]);
        let sig = Signature::from_der(&lax).unwrap();
        assert_eq!(sig.to_der(), strict);

        // Wrong sequence length is ignored
        let mut wrong_len = strict.clone();
        wrong_len[1] = 0x10;
        assert!(Signature::from_der(&wrong_len).is_ok());
    }

    #[test]
    fn test_zero_and_overflow_rejected() {
        assert!(Signature::from_der(&[0x30, 0x06, 0x02, 0x01, 0x00, 0x02, 0x01, 0x01]).is_err());
        let n = scalar("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141");
        assert!(Signature::from_scalars(n, [1; 32]).is_err());
    }

    #[test]
    fn test_low_s_serialization() {
        let sig = Signature::from_scalars(
            scalar("a196ed0e7ebcbe7b63fe1d8eecbdbde03a67ceba4fc8f6482bdcb9606a911404"),
            scalar("971729c7fa944b465b35250c6570a2f31acbb14b13d1565fab7330dcb2b3dfb1"),
        )
        .unwrap();
        assert!(!sig.is_low_s());
        assert_eq!(
            hex::encode(sig.to_der()),
            "3045022100a196ed0e7ebcbe7b63fe1d8eecbdbde03a67ceba4fc8f6482bdcb9606a911404022068e8d638056bb4b9a4cadaf39a8f5d0b9fe32b9b9b7749dc145f2db01d826190"
        );
    }

    /// RFC6979 vectors from the Trezor and CoreBitcoin test suites.
    #[test]
    fn test_rfc6979() {
        let tests = [
            (
                "cca9fbcc1b41e5a95d369eaa6ddcff73b61a4efaa279cfc6567e8daa39cbaf50",
                "sample",
                "3045022100af340daf02cc15c8d5d08d7735dfe6b98a474ed373bdb5fbecf7571be52b384202205009fb27f37034a9b24b707b7c6b79ca23ddef9e25f7282e8a797efe53a8f124",
            ),
            (
                "0000000000000000000000000000000000000000000000000000000000000001",
                "Satoshi Nakamoto",
                "3045022100934b1ea10a4b3c1757e2b0c017d0b6143ce3c9a7e6a4a49860d7a6ab210ee3d802202442ce9d2b916064108014783e923ec36b49743e2ffa1c4496f01a512aafd9e5",
            ),
            (
                "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364140",
                "Satoshi Nakamoto",
                "3045022100fd567d121db66e382991534ada77a6bd3106f0a1098c231e47993447cd6af2d002206b39cd0eb1bc8603e159ef5c20a5c8ad685a45b06ce9bebed3f153d10d93bed5",
            ),
            (
                "f8b8af8ce3c7cca5e300d33939540c10d45ce001b8f252bfbc57ba0342904181",
                "Alan Turing",
                "304402207063ae83e7f62bbb171798131b4a0564b956930092b33b07b395615d9ec7e15c022058dfcc1e00a35e1572f366ffe34ba0fc47db1e7189759b9fb233c5b05ab388ea",
            ),
        ];

        for (key_hex, msg, expected) in tests {
            let key = PrivateKey::from_hex(key_hex).unwrap();
            let hash = sha256(msg.as_bytes());
            let sig = key.sign(&hash).unwrap();
            assert_eq!(hex::encode(sig.to_der()), expected, "message {:?}", msg);
            assert!(sig.is_low_s());
            assert!(key.pub_key().verify(&hash, &sig));
        }
    }

    #[test]
    fn test_verify_accepts_high_s() {
        let key = PrivateKey::new();
        let hash = sha256d(b"high s");
        let sig = key.sign(&hash).unwrap();

        let high_s: k256::Scalar = -*sig.inner.s();
        let mut s = [0u8; 32];
        s.copy_from_slice(&high_s.to_bytes());
        let high = Signature::from_scalars(sig.r(), s).unwrap();

        assert!(!high.is_low_s());
        assert!(key.pub_key().verify(&hash, &high));
        assert_eq!(high.to_der(), sig.to_der());
    }

    #[test]
    fn test_verify_rejects_wrong_key_and_hash() {
        let a = PrivateKey::new();
        let b = PrivateKey::new();
        let hash = sha256d(b"message");
        let sig = a.sign(&hash).unwrap();
        assert!(!b.pub_key().verify(&hash, &sig));
        assert!(!a.pub_key().verify(&sha256d(b"other"), &sig));
    }
}
