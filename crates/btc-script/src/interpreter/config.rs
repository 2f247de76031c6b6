//! Consensus limits enforced by the interpreter.

/// Maximum number of non-push operations per script.
pub const MAX_OPS_PER_SCRIPT: usize = 201;
/// Maximum combined depth of the main and alt stacks.
pub const MAX_STACK_SIZE: usize = 1000;
/// Maximum serialized script size in bytes.
pub const MAX_SCRIPT_SIZE: usize = 10_000;
/// Maximum size of a single pushed element in bytes.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;
/// Default maximum byte length of a numeric operand.
pub const MAX_SCRIPT_NUMBER_LENGTH: usize = 4;
/// Operand length accepted by OP_CHECKLOCKTIMEVERIFY and OP_CHECKSEQUENCEVERIFY.
pub const LOCKTIME_NUMBER_LENGTH: usize = 5;
/// Maximum number of public keys in a single OP_CHECKMULTISIG.
pub const MAX_PUB_KEYS_PER_MULTISIG: usize = 20;
/// Lock times below this value are block heights, at or above are UNIX times.
pub const LOCKTIME_THRESHOLD: i64 = 500_000_000;

/// Sequence value that marks an input as final.
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;
/// When set in a sequence number, relative lock-time is disabled.
pub const SEQUENCE_LOCKTIME_DISABLE_FLAG: u32 = 1 << 31;
/// When set, the relative lock-time is a time span rather than a block count.
pub const SEQUENCE_LOCKTIME_TYPE_FLAG: u32 = 1 << 22;
/// Bits of the sequence number that carry the relative lock-time value.
pub const SEQUENCE_LOCKTIME_MASK: u32 = 0x0000_ffff;
