//! Stack manipulation opcodes.

use crate::opcodes::*;

use super::error::{InterpreterError, InterpreterErrorCode};
use super::parsed_opcode::ParsedOpcode;
use super::scriptnum::ScriptNumber;
use super::stack::as_bool;
use super::thread::Thread;

impl<'a> Thread<'a> {
    /// Fail with `InvalidStackOperation` unless the main stack holds `n` items.
    pub(crate) fn require_depth(&self, n: usize, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if self.dstack.len() < n {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidStackOperation,
                format!("{} needs {} items, stack has {}", pop.name(), n, self.dstack.len()),
            ));
        }
        Ok(())
    }

    pub(crate) fn op_stack(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        let s = &mut self.dstack;
        match pop.opcode {
            OP_2DROP => s.drop_top(2),
            OP_DROP => s.drop_top(1),
            OP_DUP => s.copy_group(1, 0),
            OP_2DUP => s.copy_group(2, 1),
            OP_3DUP => s.copy_group(3, 2),
            OP_OVER => s.copy_group(1, 1),
            OP_2OVER => s.copy_group(2, 3),
            OP_SWAP => s.move_group(1, 1),
            OP_2SWAP => s.move_group(2, 3),
            OP_ROT => s.move_group(1, 2),
            OP_2ROT => s.move_group(2, 5),
            OP_NIP => s.remove(1).map(drop),
            OP_TUCK => s.tuck(),
            OP_IFDUP => {
                let top = s.peek(0)?;
                if as_bool(top) {
                    let top = top.to_vec();
                    s.push(top);
                }
                Ok(())
            }
            OP_DEPTH => {
                let depth = ScriptNumber::new(s.len() as i64);
                s.push_num(&depth);
                Ok(())
            }
            OP_TOALTSTACK => {
                let item = s.pop()?;
                self.astack.push(item);
                Ok(())
            }
            OP_FROMALTSTACK => {
                let item = self.astack.pop().map_err(|_| {
                    InterpreterError::new(
                        InterpreterErrorCode::InvalidAltStackOperation,
                        "alt stack is empty".to_string(),
                    )
                })?;
                s.push(item);
                Ok(())
            }
            OP_PICK | OP_ROLL => {
                self.require_depth(2, pop)?;
                let n = self.dstack.pop_num()?;
                let depth = usize::try_from(n.to_i64()).map_err(|_| {
                    InterpreterError::new(
                        InterpreterErrorCode::InvalidStackOperation,
                        format!("{} with negative depth {}", pop.name(), n.to_i64()),
                    )
                })?;
                if pop.opcode == OP_PICK {
                    self.dstack.copy_group(1, depth)
                } else {
                    self.dstack.move_group(1, depth)
                }
            }
            _ => Err(InterpreterError::new(
                InterpreterErrorCode::Internal,
                format!("{} is not a stack opcode", pop.name()),
            )),
        }
    }
}
