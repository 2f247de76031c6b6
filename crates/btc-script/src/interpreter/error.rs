//! Evaluation failures.

/// Why a script failed. Names follow the consensus error they stand for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterErrorCode {
    Internal,
    InvalidFlags,
    EmptyStack,
    EvalFalse,
    ScriptTooBig,
    ElementTooBig,
    TooManyOperations,
    StackOverflow,
    InvalidPubKeyCount,
    InvalidSignatureCount,
    NumberTooBig,
    Verify,
    EqualVerify,
    NumEqualVerify,
    CheckSigVerify,
    CheckMultiSigVerify,
    EarlyReturn,
    DisabledOpcode,
    ReservedOpcode,
    BadOpcode,
    MalformedPush,
    InvalidStackOperation,
    InvalidAltStackOperation,
    UnbalancedConditional,
    MinimalData,
    MinimalIf,
    InvalidSigHashType,
    SigDer,
    SigHighS,
    NotPushOnly,
    SigNullDummy,
    PubKeyType,
    CleanStack,
    NullFail,
    DiscourageUpgradableNOPs,
    DiscourageUpgradableWitnessProgram,
    NegativeLockTime,
    UnsatisfiedLockTime,
    WitnessProgramWrongLength,
    WitnessProgramWitnessEmpty,
    WitnessProgramMismatch,
    WitnessMalleated,
    WitnessMalleatedP2SH,
    WitnessUnexpected,
    WitnessPubKeyType,
}

/// A failed evaluation: what went wrong, and where or why in words.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code:?}: {description}")]
pub struct InterpreterError {
    pub code: InterpreterErrorCode,
    pub description: String,
}

impl InterpreterError {
    pub fn new(code: InterpreterErrorCode, description: String) -> Self {
        InterpreterError { code, description }
    }

    pub fn is_error_code(&self, code: InterpreterErrorCode) -> bool {
        self.code == code
    }
}
