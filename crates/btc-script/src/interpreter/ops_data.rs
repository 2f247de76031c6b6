//! OP_SIZE and the equality opcodes, the only splice and bitwise
//! operations still enabled.

use crate::opcodes::OP_EQUALVERIFY;

use super::error::{InterpreterError, InterpreterErrorCode};
use super::parsed_opcode::ParsedOpcode;
use super::scriptnum::ScriptNumber;
use super::thread::Thread;

impl<'a> Thread<'a> {
    pub(crate) fn op_size(&mut self) -> Result<(), InterpreterError> {
        let size = self.dstack.peek(0)?.len();
        self.dstack.push_num(&ScriptNumber::new(size as i64));
        Ok(())
    }

    pub(crate) fn op_equal(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.require_depth(2, pop)?;
        let b = self.dstack.pop()?;
        let a = self.dstack.pop()?;
        self.dstack.push_bool(a == b);
        if pop.opcode == OP_EQUALVERIFY {
            return self.abstract_verify(pop, InterpreterErrorCode::EqualVerify);
        }
        Ok(())
    }
}
