/// Failures raised while decoding wire data or handling keys and signatures.
#[derive(Debug, thiserror::Error)]
pub enum PrimitivesError {
    #[error("truncated input")]
    UnexpectedEof,

    #[error("compact size is not minimally encoded")]
    NonCanonicalVarInt,

    #[error("bad hex string: {0}")]
    InvalidHex(String),

    #[error("bad hash: {0}")]
    InvalidHash(String),

    #[error("private key must be {expected} bytes, found {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("bad private key: {0}")]
    InvalidPrivateKey(String),

    #[error("bad public key: {0}")]
    InvalidPublicKey(String),

    #[error("bad signature: {0}")]
    InvalidSignature(String),
}

impl From<hex::FromHexError> for PrimitivesError {
    fn from(e: hex::FromHexError) -> Self {
        PrimitivesError::InvalidHex(e.to_string())
    }
}
