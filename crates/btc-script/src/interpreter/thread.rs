//! Execution of a single script.
//!
//! A thread runs one script over a caller-supplied stack. The rules that
//! chain several scripts together (P2SH, witness programs, clean stack)
//! live in `verify_script`, which drives one thread per script.

use crate::opcodes::*;
use crate::Script;

use super::config::{MAX_OPS_PER_SCRIPT, MAX_SCRIPT_ELEMENT_SIZE, MAX_SCRIPT_SIZE, MAX_STACK_SIZE};
use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::ops_crypto::HashType;
use super::parsed_opcode::{parse_script_partial, ParsedOpcode, ParsedScript};
use super::scriptnum::ScriptNumber;
use super::stack::Stack;
use super::{SigVersion, SignatureChecker};

pub struct Thread<'a> {
    pub dstack: Stack,
    pub astack: Stack,
    /// One entry per open IF/NOTIF; `false` marks a skipped branch.
    pub cond_stack: Vec<bool>,
    /// Opcodes up to the first malformed push.
    pub script: ParsedScript,
    /// Raised once execution runs past the parsed opcodes.
    pub parse_error: Option<InterpreterError>,
    pub script_off: usize,
    /// Start of the script code signed by OP_CHECKSIG, moved by OP_CODESEPARATOR.
    pub begin_code_hash: usize,
    /// Non-push opcodes executed so far, plus multisig key counts.
    pub num_ops: usize,
    pub flags: ScriptFlags,
    pub sig_version: SigVersion,
    pub checker: &'a dyn SignatureChecker,
}

impl<'a> Thread<'a> {
    /// Prepare `script` to run over `stack`, bottom item first.
    pub fn new(
        script: &Script,
        stack: Vec<Vec<u8>>,
        flags: ScriptFlags,
        sig_version: SigVersion,
        checker: &'a dyn SignatureChecker,
    ) -> Result<Self, InterpreterError> {
        if script.len() > MAX_SCRIPT_SIZE {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ScriptTooBig,
                format!("script is {} bytes, limit {}", script.len(), MAX_SCRIPT_SIZE),
            ));
        }

        let require_minimal = flags.has_flag(ScriptFlags::MINIMALDATA);
        let (parsed, parse_error) = parse_script_partial(script);

        Ok(Thread {
            dstack: Stack::new(stack, require_minimal),
            astack: Stack::new(Vec::new(), require_minimal),
            cond_stack: Vec::new(),
            script: parsed,
            parse_error,
            script_off: 0,
            begin_code_hash: 0,
            num_ops: 0,
            flags,
            sig_version,
            checker,
        })
    }

    pub fn has_flag(&self, flag: ScriptFlags) -> bool {
        self.flags.has_flag(flag)
    }

    pub fn is_branch_executing(&self) -> bool {
        self.cond_stack.iter().all(|&v| v)
    }

    /// Run to the end of the script. Whether the resulting stack counts as
    /// success is for the caller to decide.
    pub fn execute(&mut self) -> Result<(), InterpreterError> {
        while let Some(pop) = self.script.get(self.script_off).cloned() {
            log::trace!(
                "step {}: {} depth {}",
                self.script_off,
                pop.name(),
                self.dstack.len()
            );
            self.step(&pop)?;

            let combined = self.dstack.len() + self.astack.len();
            if combined > MAX_STACK_SIZE {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::StackOverflow,
                    format!("{} stack items, limit {}", combined, MAX_STACK_SIZE),
                ));
            }
            self.script_off += 1;
        }

        if let Some(e) = self.parse_error.take() {
            return Err(e);
        }
        if !self.cond_stack.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                format!("{} conditionals left open", self.cond_stack.len()),
            ));
        }
        Ok(())
    }

    /// The main stack, bottom to top.
    pub fn into_stack(self) -> Vec<Vec<u8>> {
        self.dstack.into_items()
    }

    /// Script code from the last executed OP_CODESEPARATOR onwards.
    pub(crate) fn sub_script(&self) -> ParsedScript {
        self.script[self.begin_code_hash.min(self.script.len())..].to_vec()
    }

    fn step(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if pop.data.len() > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ElementTooBig,
                format!("{}-byte push, limit {}", pop.data.len(), MAX_SCRIPT_ELEMENT_SIZE),
            ));
        }

        if pop.opcode > OP_16 {
            self.count_ops(1)?;
        }

        if pop.is_disabled() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DisabledOpcode,
                format!("{} is disabled", pop.name()),
            ));
        }

        let executing = self.is_branch_executing();
        if !executing && !pop.is_conditional() {
            return Ok(());
        }

        if pop.opcode <= OP_PUSHDATA4 {
            if self.dstack.require_minimal() {
                pop.enforce_minimum_data_push()?;
            }
            self.dstack.push(pop.data.clone());
            return Ok(());
        }

        self.dispatch(pop)
    }

    /// Add `n` to the operation count, failing past the per-script limit.
    pub(crate) fn count_ops(&mut self, n: usize) -> Result<(), InterpreterError> {
        self.num_ops += n;
        if self.num_ops > MAX_OPS_PER_SCRIPT {
            return Err(InterpreterError::new(
                InterpreterErrorCode::TooManyOperations,
                format!("more than {} operations", MAX_OPS_PER_SCRIPT),
            ));
        }
        Ok(())
    }

    fn dispatch(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        match pop.opcode {
            OP_1NEGATE => {
                self.dstack.push_num(&ScriptNumber::new(-1));
                Ok(())
            }
            OP_1..=OP_16 => {
                let n = ScriptNumber::new((pop.opcode - OP_1 + 1) as i64);
                self.dstack.push_num(&n);
                Ok(())
            }
            OP_NOP => Ok(()),
            OP_RESERVED | OP_VER | OP_RESERVED1 | OP_RESERVED2 => self.op_reserved(pop),
            OP_IF | OP_NOTIF => self.op_if(pop),
            OP_ELSE => self.op_else(pop),
            OP_ENDIF => self.op_endif(pop),
            OP_VERIFY => self.op_verify(pop),
            OP_RETURN => self.op_return(),
            OP_CHECKLOCKTIMEVERIFY => self.op_check_locktime_verify(pop),
            OP_CHECKSEQUENCEVERIFY => self.op_check_sequence_verify(pop),
            OP_NOP1 | OP_NOP4..=OP_NOP10 => self.op_upgradable_nop(pop),

            OP_TOALTSTACK..=OP_TUCK => self.op_stack(pop),

            OP_SIZE => self.op_size(),
            OP_EQUAL | OP_EQUALVERIFY => self.op_equal(pop),

            OP_1ADD | OP_1SUB | OP_NEGATE | OP_ABS | OP_NOT | OP_0NOTEQUAL => {
                self.op_unary_num(pop)
            }
            OP_ADD | OP_SUB | OP_BOOLAND..=OP_MAX => self.op_binary_num(pop),
            OP_WITHIN => self.op_within(pop),

            OP_RIPEMD160 => self.op_hash(HashType::Ripemd160),
            OP_SHA1 => self.op_hash(HashType::Sha1),
            OP_SHA256 => self.op_hash(HashType::Sha256),
            OP_HASH160 => self.op_hash(HashType::Hash160),
            OP_HASH256 => self.op_hash(HashType::Hash256),
            OP_CODESEPARATOR => {
                self.begin_code_hash = self.script_off + 1;
                Ok(())
            }
            OP_CHECKSIG | OP_CHECKSIGVERIFY => self.op_checksig(pop),
            OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => self.op_checkmultisig(pop),

            // VERIF, VERNOTIF and unassigned bytes
            _ => self.op_bad(pop),
        }
    }
}
