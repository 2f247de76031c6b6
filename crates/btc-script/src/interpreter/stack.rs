//! The main and alternate stacks.
//!
//! Items are raw bytes; numeric and boolean readings are decoded on demand.
//! Positions are depths: 0 is the top item.

use super::config::MAX_SCRIPT_NUMBER_LENGTH;
use super::error::{InterpreterError, InterpreterErrorCode};
use super::scriptnum::ScriptNumber;

/// Truth value of a stack item. Any non-zero byte is true, except that a
/// lone sign bit in the last byte (negative zero) is still false.
pub fn as_bool(item: &[u8]) -> bool {
    match item.split_last() {
        Some((&last, rest)) => last & 0x7f != 0 || rest.iter().any(|&b| b != 0),
        None => false,
    }
}

fn out_of_range(depth: usize, len: usize) -> InterpreterError {
    InterpreterError::new(
        InterpreterErrorCode::InvalidStackOperation,
        format!("depth {} on a stack of {} items", depth, len),
    )
}

#[derive(Debug, Clone, Default)]
pub struct Stack {
    items: Vec<Vec<u8>>,
    /// Reject numeric operands that are not minimally encoded.
    require_minimal: bool,
}

impl Stack {
    /// A stack holding `items`, bottom first.
    pub fn new(items: Vec<Vec<u8>>, require_minimal: bool) -> Self {
        Stack {
            items,
            require_minimal,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn require_minimal(&self) -> bool {
        self.require_minimal
    }

    pub fn push(&mut self, item: Vec<u8>) {
        self.items.push(item);
    }

    pub fn push_num(&mut self, n: &ScriptNumber) {
        self.push(n.encode());
    }

    /// True is `[0x01]`, false the empty vector.
    pub fn push_bool(&mut self, val: bool) {
        self.push(if val { vec![1] } else { Vec::new() });
    }

    pub fn pop(&mut self) -> Result<Vec<u8>, InterpreterError> {
        self.items.pop().ok_or_else(|| out_of_range(0, 0))
    }

    /// Pop a numeric operand of at most four bytes.
    pub fn pop_num(&mut self) -> Result<ScriptNumber, InterpreterError> {
        let item = self.pop()?;
        ScriptNumber::decode(&item, MAX_SCRIPT_NUMBER_LENGTH, self.require_minimal)
    }

    pub fn pop_bool(&mut self) -> Result<bool, InterpreterError> {
        Ok(as_bool(&self.pop()?))
    }

    fn index(&self, depth: usize) -> Result<usize, InterpreterError> {
        self.items
            .len()
            .checked_sub(depth + 1)
            .ok_or_else(|| out_of_range(depth, self.items.len()))
    }

    pub fn peek(&self, depth: usize) -> Result<&[u8], InterpreterError> {
        Ok(&self.items[self.index(depth)?])
    }

    /// Read the item at `depth` as a number of at most `max_len` bytes,
    /// leaving it in place.
    pub fn peek_num(&self, depth: usize, max_len: usize) -> Result<ScriptNumber, InterpreterError> {
        ScriptNumber::decode(self.peek(depth)?, max_len, self.require_minimal)
    }

    pub fn remove(&mut self, depth: usize) -> Result<Vec<u8>, InterpreterError> {
        let idx = self.index(depth)?;
        Ok(self.items.remove(idx))
    }

    /// Drop the top `n` items.
    pub fn drop_top(&mut self, n: usize) -> Result<(), InterpreterError> {
        let keep = self
            .items
            .len()
            .checked_sub(n)
            .ok_or_else(|| out_of_range(n, self.items.len()))?;
        self.items.truncate(keep);
        Ok(())
    }

    /// Push copies of `n` consecutive items whose deepest member sits at
    /// `depth`, preserving their order. OP_DUP, OP_2DUP, OP_3DUP, OP_OVER
    /// and OP_2OVER are all instances of this.
    pub fn copy_group(&mut self, n: usize, depth: usize) -> Result<(), InterpreterError> {
        let start = self.index(depth)?;
        if depth + 1 < n {
            return Err(out_of_range(depth, self.items.len()));
        }
        self.items.extend_from_within(start..start + n);
        Ok(())
    }

    /// Move `n` consecutive items whose deepest member sits at `depth` to
    /// the top, preserving their order. OP_SWAP, OP_ROT and their
    /// two-item forms are instances of this.
    pub fn move_group(&mut self, n: usize, depth: usize) -> Result<(), InterpreterError> {
        let start = self.index(depth)?;
        if depth + 1 < n {
            return Err(out_of_range(depth, self.items.len()));
        }
        let moved: Vec<_> = self.items.drain(start..start + n).collect();
        self.items.extend(moved);
        Ok(())
    }

    /// Copy the top item below the second: `a b -> b a b`.
    pub fn tuck(&mut self) -> Result<(), InterpreterError> {
        let top = self.peek(0)?.to_vec();
        let idx = self.index(1)?;
        self.items.insert(idx, top);
        Ok(())
    }

    /// Items bottom to top.
    pub fn items(&self) -> &[Vec<u8>] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Vec<u8>> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack(items: &[u8]) -> Stack {
        Stack::new(items.iter().map(|&b| vec![b]).collect(), false)
    }

    fn flat(s: &Stack) -> Vec<u8> {
        s.items().iter().map(|i| i[0]).collect()
    }

    #[test]
    fn test_as_bool() {
        let cases: [(&[u8], bool); 8] = [
            (&[], false),
            (&[0x00], false),
            (&[0x80], false),
            (&[0x00, 0x00], false),
            (&[0x00, 0x80], false),
            (&[0x01], true),
            (&[0x00, 0x01], true),
            (&[0x01, 0x80], true),
        ];
        for (item, want) in cases {
            assert_eq!(as_bool(item), want, "{:02x?}", item);
        }
    }

    #[test]
    fn test_push_pop_peek() {
        let mut s = Stack::default();
        assert!(s.pop().is_err());
        s.push(vec![1, 2, 3]);
        s.push_bool(false);
        s.push_num(&ScriptNumber::new(-1));
        assert_eq!(s.len(), 3);
        assert_eq!(s.peek(0).unwrap(), &[0x81]);
        assert_eq!(s.peek(2).unwrap(), &[1, 2, 3]);
        assert!(s.peek(3).is_err());
        assert_eq!(s.pop_num().unwrap(), -1);
        assert!(!s.pop_bool().unwrap());
    }

    #[test]
    fn test_groups() {
        // OP_2DUP
        let mut s = stack(&[1, 2, 3]);
        s.copy_group(2, 1).unwrap();
        assert_eq!(flat(&s), [1, 2, 3, 2, 3]);

        // OP_2OVER
        let mut s = stack(&[1, 2, 3, 4]);
        s.copy_group(2, 3).unwrap();
        assert_eq!(flat(&s), [1, 2, 3, 4, 1, 2]);

        // OP_ROT
        let mut s = stack(&[1, 2, 3]);
        s.move_group(1, 2).unwrap();
        assert_eq!(flat(&s), [2, 3, 1]);

        // OP_2SWAP
        let mut s = stack(&[1, 2, 3, 4]);
        s.move_group(2, 3).unwrap();
        assert_eq!(flat(&s), [3, 4, 1, 2]);

        let mut s = stack(&[1, 2]);
        assert!(s.copy_group(3, 2).is_err());
        assert!(s.move_group(2, 2).is_err());
        assert_eq!(flat(&s), [1, 2]);
    }

    #[test]
    fn test_tuck_remove_drop() {
        let mut s = stack(&[1, 2]);
        s.tuck().unwrap();
        assert_eq!(flat(&s), [2, 1, 2]);
        assert_eq!(s.remove(1).unwrap(), vec![1]);
        s.drop_top(2).unwrap();
        assert!(s.is_empty());
        assert!(s.drop_top(1).is_err());
        assert!(stack(&[1]).tuck().is_err());
    }

    #[test]
    fn test_peek_num_respects_minimal_data() {
        let strict = Stack::new(vec![vec![0x05, 0x00]], true);
        assert_eq!(
            strict.peek_num(0, 4).unwrap_err().code,
            InterpreterErrorCode::MinimalData
        );
        let mut lax = Stack::new(vec![vec![0x05, 0x00]], false);
        assert_eq!(lax.peek_num(0, 4).unwrap(), 5);
        assert_eq!(lax.pop_num().unwrap(), 5);
    }
}
