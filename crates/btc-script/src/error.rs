/// Failures while parsing, building or qualifying scripts.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Invalid opcode data encountered during ASM parsing.
    #[error("invalid opcode data: {0}")]
    InvalidOpcodeData(String),

    /// Attempted to use append_opcodes for a push data opcode.
    #[error("use append_push_data for push data opcodes: {0}")]
    InvalidOpcodeType(String),

    /// Hex decoding error.
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// Not enough data in script to complete a push operation.
    #[error("not enough data")]
    DataTooSmall,

    /// Push data exceeds maximum allowed size.
    #[error("data too big")]
    DataTooBig,

    /// A multisig template was requested with invalid parameters.
    #[error("invalid multisig: {0}")]
    InvalidMultisig(String),

    /// A redeem or witness script is needed but was not supplied.
    #[error("missing {0}")]
    MissingScript(&'static str),

    /// A supplied script does not hash to the committed value.
    #[error("{0} does not match the committed hash")]
    ScriptHashMismatch(&'static str),

    /// A redeem or witness script was supplied but is not needed.
    #[error("superfluous {0}")]
    SuperfluousScript(&'static str),

    /// Existing input data contradicts the supplied sign data.
    #[error("qualification failed: {0}")]
    Qualification(String),

    /// A push-only script could not be evaluated.
    #[error("evaluation failed: {0}")]
    Interpreter(#[from] crate::interpreter::InterpreterError),
}
