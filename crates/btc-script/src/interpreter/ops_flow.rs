//! Flow control and lock-time opcodes.

use crate::opcodes::OP_NOTIF;

use super::config::{
    LOCKTIME_NUMBER_LENGTH, LOCKTIME_THRESHOLD, SEQUENCE_FINAL, SEQUENCE_LOCKTIME_DISABLE_FLAG,
    SEQUENCE_LOCKTIME_MASK, SEQUENCE_LOCKTIME_TYPE_FLAG,
};
use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::parsed_opcode::ParsedOpcode;
use super::stack::as_bool;
use super::thread::Thread;
use super::{SigVersion, SignatureChecker};

fn err(code: InterpreterErrorCode, description: String) -> InterpreterError {
    InterpreterError::new(code, description)
}

impl<'a> Thread<'a> {
    pub(crate) fn op_reserved(&self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        Err(err(
            InterpreterErrorCode::ReservedOpcode,
            format!("{} is reserved", pop.name()),
        ))
    }

    pub(crate) fn op_bad(&self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        Err(err(
            InterpreterErrorCode::BadOpcode,
            format!("invalid opcode {} (0x{:02x})", pop.name(), pop.opcode),
        ))
    }

    pub(crate) fn op_upgradable_nop(&self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if self.has_flag(ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS) {
            return Err(err(
                InterpreterErrorCode::DiscourageUpgradableNOPs,
                format!("{} is reserved for soft forks", pop.name()),
            ));
        }
        Ok(())
    }

    /// OP_IF and OP_NOTIF. In a skipped branch nothing is popped and the
    /// new branch is skipped too.
    pub(crate) fn op_if(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        let mut taken = false;
        if self.is_branch_executing() {
            let Ok(arg) = self.dstack.pop() else {
                return Err(err(
                    InterpreterErrorCode::UnbalancedConditional,
                    format!("{} on an empty stack", pop.name()),
                ));
            };
            // Witness scripts under MINIMALIF accept only "" and 0x01.
            if self.sig_version == SigVersion::WitnessV0
                && self.has_flag(ScriptFlags::MINIMALIF)
                && !matches!(arg.as_slice(), [] | [1])
            {
                return Err(err(
                    InterpreterErrorCode::MinimalIf,
                    format!("{} argument {} is not minimal", pop.name(), hex::encode(&arg)),
                ));
            }
            taken = as_bool(&arg) != (pop.opcode == OP_NOTIF);
        }
        self.cond_stack.push(taken);
        Ok(())
    }

    /// Flip the innermost branch. A second OP_ELSE flips it back.
    pub(crate) fn op_else(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        let top = self.cond_stack.last_mut().ok_or_else(|| unbalanced(pop))?;
        *top = !*top;
        Ok(())
    }

    pub(crate) fn op_endif(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.cond_stack.pop().map(drop).ok_or_else(|| unbalanced(pop))
    }

    pub(crate) fn op_verify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.abstract_verify(pop, InterpreterErrorCode::Verify)
    }

    /// Pop the top item and fail with `code` unless it is true.
    pub(crate) fn abstract_verify(
        &mut self,
        pop: &ParsedOpcode,
        code: InterpreterErrorCode,
    ) -> Result<(), InterpreterError> {
        if !self.dstack.pop_bool()? {
            return Err(err(code, format!("{} failed", pop.name())));
        }
        Ok(())
    }

    pub(crate) fn op_return(&mut self) -> Result<(), InterpreterError> {
        Err(err(
            InterpreterErrorCode::EarlyReturn,
            "OP_RETURN executed".to_string(),
        ))
    }

    /// The lock-time operand, left on the stack. Five bytes are allowed so
    /// that times past 2038 stay expressible.
    fn peek_locktime_operand(&self, pop: &ParsedOpcode) -> Result<i64, InterpreterError> {
        self.require_depth(1, pop)?;
        let n = self.dstack.peek_num(0, LOCKTIME_NUMBER_LENGTH)?;
        if n.is_negative() {
            return Err(err(
                InterpreterErrorCode::NegativeLockTime,
                format!("{} operand {} is negative", pop.name(), n.to_i64()),
            ));
        }
        Ok(n.to_i64())
    }

    pub(crate) fn op_check_locktime_verify(
        &mut self,
        pop: &ParsedOpcode,
    ) -> Result<(), InterpreterError> {
        if !self.has_flag(ScriptFlags::CHECKLOCKTIMEVERIFY) {
            return self.op_upgradable_nop(pop);
        }

        let lock_time = self.peek_locktime_operand(pop)?;
        check_lock_time(self.checker, lock_time)
    }

    pub(crate) fn op_check_sequence_verify(
        &mut self,
        pop: &ParsedOpcode,
    ) -> Result<(), InterpreterError> {
        if !self.has_flag(ScriptFlags::CHECKSEQUENCEVERIFY) {
            return self.op_upgradable_nop(pop);
        }

        let sequence = self.peek_locktime_operand(pop)?;
        check_sequence(self.checker, sequence)
    }
}

fn unbalanced(pop: &ParsedOpcode) -> InterpreterError {
    err(
        InterpreterErrorCode::UnbalancedConditional,
        format!("{} without a matching OP_IF", pop.name()),
    )
}

/// The absolute lock time test behind OP_CHECKLOCKTIMEVERIFY, for a
/// non-negative `lock_time` operand.
pub fn check_lock_time(
    checker: &dyn SignatureChecker,
    lock_time: i64,
) -> Result<(), InterpreterError> {
    verify_lock_time(checker.lock_time() as i64, LOCKTIME_THRESHOLD, lock_time)?;

    // A final input opts out of lock time enforcement altogether.
    if checker.input_sequence() == SEQUENCE_FINAL {
        return Err(err(
            InterpreterErrorCode::UnsatisfiedLockTime,
            "input sequence is final".to_string(),
        ));
    }
    Ok(())
}

/// The relative lock time test behind OP_CHECKSEQUENCEVERIFY, for a
/// non-negative `sequence` operand. Operands with the disable flag pass.
pub fn check_sequence(
    checker: &dyn SignatureChecker,
    sequence: i64,
) -> Result<(), InterpreterError> {
    let disabled = SEQUENCE_LOCKTIME_DISABLE_FLAG as i64;
    if sequence & disabled != 0 {
        return Ok(());
    }

    let tx_version = checker.tx_version();
    if tx_version < 2 {
        return Err(err(
            InterpreterErrorCode::UnsatisfiedLockTime,
            format!("relative lock time needs version 2, tx is version {}", tx_version),
        ));
    }

    let tx_sequence = checker.input_sequence() as i64;
    if tx_sequence & disabled != 0 {
        return Err(err(
            InterpreterErrorCode::UnsatisfiedLockTime,
            format!("input sequence 0x{:08x} disables relative lock time", tx_sequence),
        ));
    }

    let mask = (SEQUENCE_LOCKTIME_TYPE_FLAG | SEQUENCE_LOCKTIME_MASK) as i64;
    verify_lock_time(
        tx_sequence & mask,
        SEQUENCE_LOCKTIME_TYPE_FLAG as i64,
        sequence & mask,
    )
}

/// Both values must be on the same side of `threshold` (heights or times),
/// and the required one must not exceed the transaction's.
fn verify_lock_time(
    tx_lock_time: i64,
    threshold: i64,
    lock_time: i64,
) -> Result<(), InterpreterError> {
    if (tx_lock_time < threshold) != (lock_time < threshold) {
        return Err(err(
            InterpreterErrorCode::UnsatisfiedLockTime,
            format!(
                "lock time {} and transaction lock time {} are of different kinds",
                lock_time, tx_lock_time
            ),
        ));
    }
    if lock_time > tx_lock_time {
        return Err(err(
            InterpreterErrorCode::UnsatisfiedLockTime,
            format!("lock time {} not reached, transaction has {}", lock_time, tx_lock_time),
        ));
    }
    Ok(())
}
