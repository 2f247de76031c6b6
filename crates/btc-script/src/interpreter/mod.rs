//! Full Bitcoin script interpreter.
//!
//! Executes scriptSig, scriptPubKey, P2SH redeem scripts and witness
//! programs under a set of consensus flags.
//!
//! # Architecture
//!
//! The interpreter does not depend on the transaction crate. Callers provide
//! a [`SignatureChecker`] that computes signature hashes and exposes the
//! lock-time fields of the spending transaction. [`NullSignatureChecker`]
//! rejects every signature and is used for push-only decoding.
//!
//! # Example
//!
//! ```ignore
//! use btc_script::interpreter::{verify_script, NullSignatureChecker, ScriptFlags};
//!
//! verify_script(
//!     &script_sig,
//!     &script_pubkey,
//!     &[],
//!     ScriptFlags::P2SH,
//!     &NullSignatureChecker,
//! )?;
//! ```

pub mod config;
pub mod error;
pub mod flags;
pub mod parsed_opcode;
pub mod scriptnum;
pub mod stack;
pub mod thread;

mod ops_arithmetic;
mod ops_crypto;
mod ops_data;
mod ops_flow;
mod ops_stack;

pub use error::{InterpreterError, InterpreterErrorCode};
pub use flags::ScriptFlags;
pub use ops_crypto::check_der_encoding;
pub use ops_flow::{check_lock_time, check_sequence};
pub use parsed_opcode::{ParsedOpcode, ParsedScript};
pub use scriptnum::ScriptNumber;
pub use stack::{as_bool, Stack};

use crate::opcodes::OP_CODESEPARATOR;
use crate::Script;
use config::{MAX_SCRIPT_ELEMENT_SIZE, SEQUENCE_FINAL};
use thread::Thread;

/// Which signature hashing rules apply to the script being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SigVersion {
    /// Legacy scripts: scriptSig, scriptPubKey and P2SH redeem scripts.
    #[default]
    Base,
    /// Version 0 witness programs (BIP143).
    WitnessV0,
}

/// Signature and lock-time checks against the spending transaction.
///
/// Implementors hold the transaction, the input index and, for witness
/// inputs, the amount being spent.
pub trait SignatureChecker {
    /// Verify `full_sig` (DER signature plus hash type byte) by `pub_key`
    /// over the signature hash of `script_code`.
    ///
    /// Any failure, including an empty or unparseable signature, is `false`.
    fn check_sig(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        script_code: &Script,
        sig_version: SigVersion,
    ) -> bool;

    /// The spending transaction's lock time.
    fn lock_time(&self) -> u32;

    /// The spending transaction's version.
    fn tx_version(&self) -> i32;

    /// The sequence number of the input being verified.
    fn input_sequence(&self) -> u32;
}

/// A checker with no transaction: every signature check fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSignatureChecker;

impl SignatureChecker for NullSignatureChecker {
    fn check_sig(&self, _: &[u8], _: &[u8], _: &Script, _: SigVersion) -> bool {
        false
    }

    fn lock_time(&self) -> u32 {
        0
    }

    fn tx_version(&self) -> i32 {
        1
    }

    fn input_sequence(&self) -> u32 {
        SEQUENCE_FINAL
    }
}

/// Run one script over `stack`, leaving the result in place.
///
/// The caller decides whether the final stack is acceptable.
pub fn eval_script(
    stack: &mut Vec<Vec<u8>>,
    script: &Script,
    flags: ScriptFlags,
    checker: &dyn SignatureChecker,
    sig_version: SigVersion,
) -> Result<(), InterpreterError> {
    let mut thread = Thread::new(script, std::mem::take(stack), flags, sig_version, checker)?;
    thread.execute()?;
    *stack = thread.into_stack();
    Ok(())
}

/// Evaluate a push-only script and return the values it pushes.
///
/// Small integer opcodes yield their script-number encoding, so `OP_0` is an
/// empty vector and `OP_1NEGATE` is `[0x81]`.
pub fn eval_push_only(script: &Script) -> Result<Vec<Vec<u8>>, InterpreterError> {
    if !script.is_push_only() {
        return Err(InterpreterError::new(
            InterpreterErrorCode::NotPushOnly,
            "script is not push only".to_string(),
        ));
    }
    let mut stack = Vec::new();
    eval_script(
        &mut stack,
        script,
        ScriptFlags::NONE,
        &NullSignatureChecker,
        SigVersion::Base,
    )?;
    Ok(stack)
}

/// Strip every OP_CODESEPARATOR from a script.
///
/// Legacy signature hashing signs the script code without them. Bytes past
/// a truncated push are kept as they are.
pub fn remove_code_separators(script: &Script) -> Script {
    let (parsed, _) = parsed_opcode::parse_script_partial(script);
    let consumed: usize = parsed.iter().map(|op| op.to_bytes().len()).sum();
    let mut bytes = parsed_opcode::unparse(&parsed_opcode::remove_opcode(
        &parsed,
        OP_CODESEPARATOR,
    ))
    .into_bytes();
    bytes.extend_from_slice(&script.to_bytes()[consumed.min(script.len())..]);
    Script::from_bytes(&bytes)
}

fn eval_false() -> InterpreterError {
    InterpreterError::new(
        InterpreterErrorCode::EvalFalse,
        "false stack entry at end of script execution".to_string(),
    )
}

fn check_truthy_top(stack: &[Vec<u8>]) -> Result<(), InterpreterError> {
    match stack.last() {
        Some(top) if as_bool(top) => Ok(()),
        _ => Err(eval_false()),
    }
}

/// Verify that `script_sig` and `witness` satisfy `script_pubkey`.
///
/// Runs scriptSig, then scriptPubKey on the resulting stack, then, as
/// enabled by `flags`, the witness program and the P2SH redeem script.
pub fn verify_script(
    script_sig: &Script,
    script_pubkey: &Script,
    witness: &[Vec<u8>],
    flags: ScriptFlags,
    checker: &dyn SignatureChecker,
) -> Result<(), InterpreterError> {
    let result = verify_script_inner(script_sig, script_pubkey, witness, flags, checker);
    if let Err(ref e) = result {
        log::debug!(
            "script verification failed: {} (scriptPubKey {}, flags {:?})",
            e,
            script_pubkey.to_hex(),
            flags
        );
    }
    result
}

fn verify_script_inner(
    script_sig: &Script,
    script_pubkey: &Script,
    witness: &[Vec<u8>],
    flags: ScriptFlags,
    checker: &dyn SignatureChecker,
) -> Result<(), InterpreterError> {
    let p2sh = flags.has_flag(ScriptFlags::P2SH);
    let use_witness = flags.has_flag(ScriptFlags::WITNESS);

    // Clean stack is only meaningful once every script type is evaluated
    if (flags.has_flag(ScriptFlags::CLEANSTACK) && !(p2sh && use_witness))
        || (use_witness && !p2sh)
    {
        return Err(InterpreterError::new(
            InterpreterErrorCode::InvalidFlags,
            format!("invalid script flag combination {:?}", flags),
        ));
    }

    if flags.has_flag(ScriptFlags::SIGPUSHONLY) && !script_sig.is_push_only() {
        return Err(InterpreterError::new(
            InterpreterErrorCode::NotPushOnly,
            "signature script is not push only".to_string(),
        ));
    }

    let mut stack = Vec::new();
    eval_script(&mut stack, script_sig, flags, checker, SigVersion::Base)?;
    let stack_copy = if p2sh { stack.clone() } else { Vec::new() };

    eval_script(&mut stack, script_pubkey, flags, checker, SigVersion::Base)?;
    check_truthy_top(&stack)?;

    let mut had_witness = false;

    if use_witness {
        if let Some((version, program)) = script_pubkey.witness_program() {
            had_witness = true;
            if !script_sig.is_empty() {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::WitnessMalleated,
                    "native witness program with non-empty scriptSig".to_string(),
                ));
            }
            verify_witness_program(witness, version, program, flags, checker)?;
            stack.truncate(1);
        }
    }

    if p2sh && script_pubkey.is_p2sh() {
        if !script_sig.is_push_only() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NotPushOnly,
                "pay to script hash is not push only".to_string(),
            ));
        }

        stack = stack_copy;
        // Non-empty, since the scriptPubKey hashed its top item
        let redeem_bytes = stack.pop().ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::EmptyStack,
                "no redeem script on stack".to_string(),
            )
        })?;
        let redeem_script = Script::from_bytes(&redeem_bytes);

        eval_script(&mut stack, &redeem_script, flags, checker, SigVersion::Base)?;
        check_truthy_top(&stack)?;

        if use_witness {
            if let Some((version, program)) = redeem_script.witness_program() {
                had_witness = true;
                if *script_sig != Script::push_all(&[redeem_bytes.clone()]) {
                    return Err(InterpreterError::new(
                        InterpreterErrorCode::WitnessMalleatedP2SH,
                        "P2SH witness program scriptSig is not a single push".to_string(),
                    ));
                }
                verify_witness_program(witness, version, program, flags, checker)?;
                stack.truncate(1);
            }
        }
    }

    if flags.has_flag(ScriptFlags::CLEANSTACK) && stack.len() != 1 {
        return Err(InterpreterError::new(
            InterpreterErrorCode::CleanStack,
            format!("stack contains {} unexpected items", stack.len().saturating_sub(1)),
        ));
    }

    if use_witness && !had_witness && !witness.is_empty() {
        return Err(InterpreterError::new(
            InterpreterErrorCode::WitnessUnexpected,
            "witness supplied for a non-witness script".to_string(),
        ));
    }

    Ok(())
}

/// Verify a witness program against its witness stack.
///
/// Version 0 programs are 20-byte key hashes or 32-byte script hashes.
/// Other versions succeed unless upgradable programs are discouraged.
pub fn verify_witness_program(
    witness: &[Vec<u8>],
    version: u8,
    program: &[u8],
    flags: ScriptFlags,
    checker: &dyn SignatureChecker,
) -> Result<(), InterpreterError> {
    let (script, mut stack) = match (version, program.len()) {
        (0, 32) => {
            let (script_bytes, items) = witness.split_last().ok_or_else(|| {
                InterpreterError::new(
                    InterpreterErrorCode::WitnessProgramWitnessEmpty,
                    "witness program requires a witness script".to_string(),
                )
            })?;
            if btc_primitives::hash::sha256(script_bytes)[..] != *program {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::WitnessProgramMismatch,
                    "witness script does not match the program hash".to_string(),
                ));
            }
            (Script::from_bytes(script_bytes), items.to_vec())
        }
        (0, 20) => {
            if witness.len() != 2 {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::WitnessProgramMismatch,
                    format!("key hash witness has {} items instead of 2", witness.len()),
                ));
            }
            let mut hash = [0u8; 20];
            hash.copy_from_slice(program);
            (Script::p2pkh(&hash), witness.to_vec())
        }
        (0, len) => {
            return Err(InterpreterError::new(
                InterpreterErrorCode::WitnessProgramWrongLength,
                format!("version 0 witness program of {} bytes", len),
            ));
        }
        _ => {
            if flags.has_flag(ScriptFlags::DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM) {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::DiscourageUpgradableWitnessProgram,
                    format!("witness version {} reserved for soft-fork upgrades", version),
                ));
            }
            return Ok(());
        }
    };

    if let Some(item) = stack.iter().find(|i| i.len() > MAX_SCRIPT_ELEMENT_SIZE) {
        return Err(InterpreterError::new(
            InterpreterErrorCode::ElementTooBig,
            format!(
                "witness element size {} exceeds max allowed size {}",
                item.len(),
                MAX_SCRIPT_ELEMENT_SIZE
            ),
        ));
    }

    eval_script(&mut stack, &script, flags, checker, SigVersion::WitnessV0)?;

    if stack.len() != 1 {
        return Err(eval_false());
    }
    check_truthy_top(&stack)
}

/// The script execution engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Engine
    }

    /// Verify an input, returning the error on failure.
    pub fn execute(
        &self,
        script_sig: &Script,
        script_pubkey: &Script,
        witness: &[Vec<u8>],
        flags: ScriptFlags,
        checker: &dyn SignatureChecker,
    ) -> Result<(), InterpreterError> {
        verify_script(script_sig, script_pubkey, witness, flags, checker)
    }

    /// Verify an input, reporting only success or failure.
    pub fn verify(
        &self,
        script_sig: &Script,
        script_pubkey: &Script,
        witness: &[Vec<u8>],
        flags: ScriptFlags,
        checker: &dyn SignatureChecker,
    ) -> bool {
        self.execute(script_sig, script_pubkey, witness, flags, checker)
            .is_ok()
    }
}
