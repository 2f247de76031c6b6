/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The transaction structure is invalid (e.g. an input index out of range).
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
    /// An error occurred during binary/hex serialization or deserialization.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// The output, redeem or witness script is not a type the signer handles.
    #[error("unsignable script: {0}")]
    Unsignable(String),
    /// The private key does not belong to the script being signed.
    #[error("key does not match the script being signed")]
    WrongKey,
    /// A signature already present on the input does not verify.
    #[error("invalid existing signature: {0}")]
    InvalidExistingSignature(String),
    /// Witness scripts only accept compressed public keys.
    #[error("uncompressed keys are disallowed in witness scripts")]
    UncompressedKeyInWitness,
    /// A lock time check in the script cannot pass for this transaction.
    #[error("time lock not satisfied: {0}")]
    TimeLock(String),
    /// The sighash type has no defined base type.
    #[error("invalid sighash type {0:#x}")]
    InvalidSigHashType(u32),
    /// An underlying script error (forwarded from `btc-script`).
    #[error("script error: {0}")]
    Script(#[from] btc_script::ScriptError),
    /// An underlying primitives error (forwarded from `btc-primitives`).
    #[error("primitives error: {0}")]
    Primitives(#[from] btc_primitives::PrimitivesError),
}
