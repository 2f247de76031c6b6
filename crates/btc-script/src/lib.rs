/// Bitcoin SDK - Script model, classification, qualification and execution.
///
/// Provides the Bitcoin Script type, opcode definitions, script chunk parsing,
/// standard template classification, redeem/witness script qualification and
/// a full consensus script interpreter.

pub mod script;
pub mod opcodes;
pub mod chunk;
pub mod classify;
pub mod qualify;
pub mod timelock;
pub mod interpreter;

mod error;
pub use error::ScriptError;
pub use script::Script;
pub use chunk::ScriptChunk;
pub use classify::{classify, OutputData, OutputSolution, ScriptType};
pub use qualify::{FullyQualifiedScript, SigValues, SignData};
pub use timelock::{split_time_locks, TimeLock};
