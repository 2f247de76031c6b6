//! Lock-time prefixes on locking scripts.
//!
//! A script such as `<n> OP_CHECKLOCKTIMEVERIFY OP_DROP <key> OP_CHECKSIG`
//! guards a standard template behind lock time checks. The checks leave the
//! stack as they found it, so the template underneath is solved as if it
//! stood alone.

use crate::chunk::{decode_script, ScriptChunk};
use crate::interpreter::config::LOCKTIME_NUMBER_LENGTH;
use crate::interpreter::{
    check_lock_time, check_sequence, InterpreterError, ScriptFlags, ScriptNumber,
    SignatureChecker,
};
use crate::opcodes::*;
use crate::Script;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeLock {
    /// OP_CHECKLOCKTIMEVERIFY: a block height or a Unix time.
    Absolute(i64),
    /// OP_CHECKSEQUENCEVERIFY: a BIP68 relative lock.
    Relative(i64),
}

impl TimeLock {
    pub fn value(&self) -> i64 {
        match *self {
            TimeLock::Absolute(n) | TimeLock::Relative(n) => n,
        }
    }

    /// Run the lock against the spending input. A lock whose verify flag is
    /// not in `flags` is a NOP and passes.
    pub fn check(
        &self,
        checker: &dyn SignatureChecker,
        flags: ScriptFlags,
    ) -> Result<(), InterpreterError> {
        match *self {
            TimeLock::Absolute(n) if flags.has_flag(ScriptFlags::CHECKLOCKTIMEVERIFY) => {
                check_lock_time(checker, n)
            }
            TimeLock::Relative(n) if flags.has_flag(ScriptFlags::CHECKSEQUENCEVERIFY) => {
                check_sequence(checker, n)
            }
            _ => Ok(()),
        }
    }
}

/// Split the leading `<n> OP_CHECKLOCKTIMEVERIFY OP_DROP` and
/// `<n> OP_CHECKSEQUENCEVERIFY OP_DROP` groups off `script`.
///
/// Returns the locks in script order and the rest of the script. A script
/// with no such prefix, or one that does not decode, comes back whole.
pub fn split_time_locks(script: &Script) -> (Vec<TimeLock>, Script) {
    let bytes = script.to_bytes();
    let Ok(chunks) = decode_script(bytes) else {
        return (Vec::new(), script.clone());
    };

    let mut locks = Vec::new();
    let mut offset = 0;
    for group in chunks.chunks_exact(3) {
        let lock = match (lock_operand(&group[0]), group[1].op, group[2].op) {
            (Some(n), OP_CHECKLOCKTIMEVERIFY, OP_DROP) => TimeLock::Absolute(n),
            (Some(n), OP_CHECKSEQUENCEVERIFY, OP_DROP) => TimeLock::Relative(n),
            _ => break,
        };
        locks.push(lock);
        offset += group.iter().map(|c| c.to_bytes().len()).sum::<usize>();
    }

    (locks, Script::from_bytes(&bytes[offset..]))
}

/// A minimally encoded, non-negative operand of at most five bytes.
fn lock_operand(chunk: &ScriptChunk) -> Option<i64> {
    if let Some(n) = decode_small_int(chunk.op) {
        return Some(n as i64);
    }
    let n = ScriptNumber::decode(chunk.data.as_ref()?, LOCKTIME_NUMBER_LENGTH, true).ok()?;
    (!n.is_negative()).then(|| n.to_i64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::config::SEQUENCE_FINAL;

    struct Spend {
        lock_time: u32,
        version: i32,
        sequence: u32,
    }

    impl SignatureChecker for Spend {
        fn check_sig(&self, _: &[u8], _: &[u8], _: &Script, _: crate::interpreter::SigVersion) -> bool {
            false
        }

        fn lock_time(&self) -> u32 {
            self.lock_time
        }

        fn tx_version(&self) -> i32 {
            self.version
        }

        fn input_sequence(&self) -> u32 {
            self.sequence
        }
    }

    const KEY: &str = "02ce0b14fb842b1ba549fdd675c98075f12e9c510f8ef52bd021a9a1f4809d3b4d";

    #[test]
    fn test_split() {
        let script = Script::from_asm(&format!(
            "OP_16 OP_CHECKLOCKTIMEVERIFY OP_DROP 00e1f505 OP_CHECKSEQUENCEVERIFY OP_DROP {} OP_CHECKSIG",
            KEY
        ))
        .unwrap();
        let (locks, rest) = split_time_locks(&script);
        assert_eq!(locks, vec![TimeLock::Absolute(16), TimeLock::Relative(100_000_000)]);
        assert_eq!(rest.to_asm(), format!("{} OP_CHECKSIG", KEY));
    }

    #[test]
    fn test_split_leaves_other_scripts_whole() {
        let cases = [
            format!("{} OP_CHECKSIG", KEY),
            // Negative operand
            format!("81 OP_CHECKLOCKTIMEVERIFY OP_DROP {} OP_CHECKSIG", KEY),
            // Not minimally encoded
            format!("0100 OP_CHECKLOCKTIMEVERIFY OP_DROP {} OP_CHECKSIG", KEY),
            // No OP_DROP
            format!("OP_5 OP_CHECKLOCKTIMEVERIFY {} OP_CHECKSIG", KEY),
        ];
        for asm in cases {
            let script = Script::from_asm(&asm).unwrap();
            let (locks, rest) = split_time_locks(&script);
            assert!(locks.is_empty(), "{}", asm);
            assert_eq!(rest, script);
        }

        let truncated = Script::from_bytes(&[OP_5, OP_CHECKLOCKTIMEVERIFY, OP_DROP, 0x05, 0x01]);
        assert_eq!(split_time_locks(&truncated), (Vec::new(), truncated.clone()));
    }

    #[test]
    fn test_check() {
        let spend = Spend {
            lock_time: 600_000,
            version: 2,
            sequence: 10,
        };
        let flags = ScriptFlags::CHECKLOCKTIMEVERIFY | ScriptFlags::CHECKSEQUENCEVERIFY;

        assert!(TimeLock::Absolute(600_000).check(&spend, flags).is_ok());
        assert!(TimeLock::Absolute(600_001).check(&spend, flags).is_err());
        // Time-based lock against a height-based lock time
        assert!(TimeLock::Absolute(500_000_000).check(&spend, flags).is_err());
        assert!(TimeLock::Relative(10).check(&spend, flags).is_ok());
        assert!(TimeLock::Relative(11).check(&spend, flags).is_err());

        // Without the flags both are NOPs
        assert!(TimeLock::Absolute(600_001).check(&spend, ScriptFlags::NONE).is_ok());
        assert!(TimeLock::Relative(11).check(&spend, ScriptFlags::NONE).is_ok());

        let final_input = Spend {
            sequence: SEQUENCE_FINAL,
            version: 1,
            ..spend
        };
        assert!(TimeLock::Absolute(1).check(&final_input, flags).is_err());
        assert!(TimeLock::Relative(1).check(&final_input, flags).is_err());
        assert!(TimeLock::Relative(1 << 31).check(&final_input, flags).is_ok());
    }
}
