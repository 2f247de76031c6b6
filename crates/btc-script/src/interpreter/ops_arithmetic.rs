//! Numeric opcodes. Operands are at most four bytes; results may be longer.

use crate::opcodes::*;

use super::error::{InterpreterError, InterpreterErrorCode};
use super::parsed_opcode::ParsedOpcode;
use super::scriptnum::ScriptNumber;
use super::thread::Thread;

impl<'a> Thread<'a> {
    pub(crate) fn op_unary_num(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.require_depth(1, pop)?;
        let n = self.dstack.pop_num()?;
        let result = match pop.opcode {
            OP_1ADD => n + ScriptNumber::new(1),
            OP_1SUB => n - ScriptNumber::new(1),
            OP_NEGATE => -n,
            OP_ABS => n.abs(),
            OP_NOT => ScriptNumber::from(n.is_zero()),
            OP_0NOTEQUAL => ScriptNumber::from(!n.is_zero()),
            _ => return Err(not_numeric(pop)),
        };
        self.dstack.push_num(&result);
        Ok(())
    }

    /// Binary operators see the deeper operand as `a` and the top as `b`.
    pub(crate) fn op_binary_num(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.require_depth(2, pop)?;
        let b = self.dstack.pop_num()?;
        let a = self.dstack.pop_num()?;
        let result = match pop.opcode {
            OP_ADD => a + b,
            OP_SUB => a - b,
            OP_BOOLAND => ScriptNumber::from(!a.is_zero() && !b.is_zero()),
            OP_BOOLOR => ScriptNumber::from(!a.is_zero() || !b.is_zero()),
            OP_NUMEQUAL | OP_NUMEQUALVERIFY => ScriptNumber::from(a == b),
            OP_NUMNOTEQUAL => ScriptNumber::from(a != b),
            OP_LESSTHAN => ScriptNumber::from(a < b),
            OP_GREATERTHAN => ScriptNumber::from(a > b),
            OP_LESSTHANOREQUAL => ScriptNumber::from(a <= b),
            OP_GREATERTHANOREQUAL => ScriptNumber::from(a >= b),
            OP_MIN => a.min(b),
            OP_MAX => a.max(b),
            _ => return Err(not_numeric(pop)),
        };
        self.dstack.push_num(&result);
        if pop.opcode == OP_NUMEQUALVERIFY {
            return self.abstract_verify(pop, InterpreterErrorCode::NumEqualVerify);
        }
        Ok(())
    }

    /// `x min max -> (min <= x < max)`
    pub(crate) fn op_within(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.require_depth(3, pop)?;
        let max = self.dstack.pop_num()?;
        let min = self.dstack.pop_num()?;
        let x = self.dstack.pop_num()?;
        self.dstack.push_bool(min <= x && x < max);
        Ok(())
    }
}

fn not_numeric(pop: &ParsedOpcode) -> InterpreterError {
    InterpreterError::new(
        InterpreterErrorCode::Internal,
        format!("{} is not a numeric opcode", pop.name()),
    )
}
