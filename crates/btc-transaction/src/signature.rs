//! Transaction signatures: an ECDSA signature plus the sighash type byte.

use btc_primitives::ec::Signature;

use crate::sighash::SigHashType;
use crate::TransactionError;

/// A signature as it appears in a scriptSig or witness.
///
/// A parsed signature keeps its DER bytes as found, so high-S or loosely
/// encoded signatures are written back unchanged.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionSignature {
    signature: Signature,
    sighash_type: SigHashType,
    der: Vec<u8>,
}

impl TransactionSignature {
    pub fn new(signature: Signature, sighash_type: SigHashType) -> Self {
        TransactionSignature {
            der: signature.to_der(),
            signature,
            sighash_type,
        }
    }

    /// Parse a DER signature followed by its sighash type byte.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let (hash_type, der) = bytes.split_last().ok_or_else(|| {
            TransactionError::SerializationError("empty transaction signature".to_string())
        })?;
        Ok(TransactionSignature {
            signature: Signature::from_der(der)?,
            sighash_type: SigHashType::from_u32(*hash_type as u32),
            der: der.to_vec(),
        })
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn sighash_type(&self) -> SigHashType {
        self.sighash_type
    }

    /// DER followed by the low byte of the sighash type.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.der.clone();
        out.push(self.sighash_type.value() as u8);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_serialize() {
        let hex_sig = "30440220527c02eb17ff3bbe102b3d988a7258b0bdc32f07d0c86dfdcb1dd65708f222a402203bd00b0a524d3a592669a019bdebfd9fc243b913946b387c47415656ca6b735401";
        let bytes = hex::decode(hex_sig).unwrap();
        let sig = TransactionSignature::from_bytes(&bytes).unwrap();
        assert_eq!(sig.sighash_type(), SigHashType::ALL);
        assert_eq!(sig.to_bytes(), bytes);
    }

    #[test]
    fn test_keeps_original_encoding() {
        // S is the curve order minus one
        let high_s = "3026020101022100fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd036414001";
        // Long-form sequence length
        let long_len = "30810602010102010102".to_string();

        for raw in [high_s.to_string(), long_len] {
            let bytes = hex::decode(&raw).unwrap();
            let sig = TransactionSignature::from_bytes(&bytes).unwrap();
            assert_eq!(sig.to_bytes(), bytes, "{}", raw);
            assert_ne!(sig.signature().to_der(), bytes[..bytes.len() - 1]);
        }

        let fresh = TransactionSignature::new(
            Signature::from_scalars([1; 32], [1; 32]).unwrap(),
            SigHashType::NONE,
        );
        assert_eq!(fresh.to_bytes().last(), Some(&0x02));
        assert!(fresh.signature().is_low_s());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(TransactionSignature::from_bytes(&[]).is_err());
        assert!(TransactionSignature::from_bytes(&[0x30, 0x01]).is_err());
    }
}
