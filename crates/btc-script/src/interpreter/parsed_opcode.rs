//! Scripts as the interpreter walks them: one entry per opcode, with the
//! pushed bytes attached.

use crate::chunk::ScriptChunk;
use crate::opcodes::*;
use crate::Script;

use super::error::{InterpreterError, InterpreterErrorCode};

#[derive(Debug, Clone)]
pub struct ParsedOpcode {
    pub opcode: u8,
    /// Pushed bytes; empty for everything but data pushes.
    pub data: Vec<u8>,
}

impl ParsedOpcode {
    pub fn name(&self) -> String {
        opcode_to_string(self.opcode)
    }

    /// Disabled opcodes fail even in an unexecuted branch.
    pub fn is_disabled(&self) -> bool {
        is_disabled(self.opcode)
    }

    /// IF, NOTIF, VERIF, VERNOTIF, ELSE and ENDIF run even when the
    /// current branch is skipped.
    pub fn is_conditional(&self) -> bool {
        (OP_IF..=OP_ENDIF).contains(&self.opcode)
    }

    /// The opcode a minimal encoding of this push would use.
    fn minimal_opcode(&self) -> u8 {
        match self.data.as_slice() {
            [] => OP_0,
            [v @ 1..=16] => OP_1 + v - 1,
            [0x81] => OP_1NEGATE,
            data => ScriptChunk::push(data).op,
        }
    }

    /// Under MINIMALDATA a push must use the shortest encoding, and a
    /// single byte in 1..=16 or 0x81 must use its small integer opcode.
    pub fn enforce_minimum_data_push(&self) -> Result<(), InterpreterError> {
        let want = self.minimal_opcode();
        if self.opcode != want {
            return Err(InterpreterError::new(
                InterpreterErrorCode::MinimalData,
                format!(
                    "{}-byte push uses {} instead of {}",
                    self.data.len(),
                    self.name(),
                    opcode_to_string(want)
                ),
            ));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        ScriptChunk {
            op: self.opcode,
            data: Some(self.data.clone()),
        }
        .to_bytes()
    }
}

pub type ParsedScript = Vec<ParsedOpcode>;

/// Drop every opcode that serializes exactly to `pattern`.
///
/// This is how a signature's own push leaves the legacy script code. A
/// push of the same bytes with a different prefix stays.
pub fn remove_opcode_by_data(script: &[ParsedOpcode], pattern: &[u8]) -> ParsedScript {
    script
        .iter()
        .filter(|pop| pop.to_bytes() != pattern)
        .cloned()
        .collect()
}

pub fn remove_opcode(script: &[ParsedOpcode], opcode: u8) -> ParsedScript {
    script
        .iter()
        .filter(|pop| pop.opcode != opcode)
        .cloned()
        .collect()
}

pub fn unparse(script: &[ParsedOpcode]) -> Script {
    let bytes: Vec<u8> = script.iter().flat_map(ParsedOpcode::to_bytes).collect();
    Script::from_bytes(&bytes)
}

/// Parse a whole script, failing with `MalformedPush` on a truncated push.
pub fn parse_script(script: &Script) -> Result<ParsedScript, InterpreterError> {
    match parse_script_partial(script) {
        (parsed, None) => Ok(parsed),
        (_, Some(e)) => Err(e),
    }
}

/// Parse up to the first truncated push, returning what was read and the
/// failure, if any.
///
/// Execution reports the failure only when it reaches that point, so an
/// earlier error in the script wins.
pub fn parse_script_partial(script: &Script) -> (ParsedScript, Option<InterpreterError>) {
    let mut rest = script.to_bytes();
    let mut parsed = Vec::new();

    while let Some((&opcode, tail)) = rest.split_first() {
        rest = tail;
        let len = match opcode {
            OP_DATA_1..=OP_DATA_75 => opcode as usize,
            OP_PUSHDATA1 | OP_PUSHDATA2 | OP_PUSHDATA4 => {
                let width = match opcode {
                    OP_PUSHDATA1 => 1,
                    OP_PUSHDATA2 => 2,
                    _ => 4,
                };
                if rest.len() < width {
                    return (parsed, Some(malformed(opcode, "length")));
                }
                let (le, tail) = rest.split_at(width);
                rest = tail;
                le.iter().rev().fold(0usize, |acc, &b| (acc << 8) | b as usize)
            }
            _ => 0,
        };
        if rest.len() < len {
            return (parsed, Some(malformed(opcode, "payload")));
        }
        let (data, tail) = rest.split_at(len);
        rest = tail;
        parsed.push(ParsedOpcode {
            opcode,
            data: data.to_vec(),
        });
    }

    (parsed, None)
}

fn malformed(opcode: u8, part: &str) -> InterpreterError {
    InterpreterError::new(
        InterpreterErrorCode::MalformedPush,
        format!("{} {} runs past the end of the script", opcode_to_string(opcode), part),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_hex(h: &str) -> Result<ParsedScript, InterpreterError> {
        parse_script(&Script::from_hex(h).unwrap())
    }

    #[test]
    fn test_parse_and_unparse() {
        let hex = "4c0203ff4d0100aa76a914000000000000000000000000000000000000000088ac6a0102";
        let parsed = parse_hex(hex).unwrap();
        assert_eq!(parsed[0].opcode, OP_PUSHDATA1);
        assert_eq!(parsed[0].data, vec![0x03, 0xff]);
        assert_eq!(parsed[1].data, vec![0xaa]);
        assert_eq!(parsed[parsed.len() - 2].opcode, OP_RETURN);
        assert_eq!(parsed[parsed.len() - 1].data, vec![0x02]);
        assert_eq!(unparse(&parsed).to_hex(), hex);
    }

    #[test]
    fn test_partial_parse_keeps_prefix() {
        let (parsed, err) = parse_script_partial(&Script::from_hex("51ac4c05aa").unwrap());
        assert_eq!(parsed.len(), 2);
        assert!(err.unwrap().is_error_code(InterpreterErrorCode::MalformedPush));

        for hex in ["01", "4c", "4c05aa", "4d01", "4d0200aa", "4e010000", "4e02000000aa"] {
            let err = parse_hex(hex).unwrap_err();
            assert!(err.is_error_code(InterpreterErrorCode::MalformedPush), "{}", hex);
        }
    }

    #[test]
    fn test_minimal_push() {
        let cases = [
            ("00", true),
            ("4c00", false),
            ("0101", false),
            ("0110", false),
            ("0111", true),
            ("0181", false),
            ("0100", true),
            ("4c0100", false),
            ("024142", true),
        ];
        for (hex, ok) in cases {
            let parsed = parse_hex(hex).unwrap();
            assert_eq!(parsed[0].enforce_minimum_data_push().is_ok(), ok, "{}", hex);
        }
        let big = ParsedOpcode {
            opcode: OP_PUSHDATA2,
            data: vec![0u8; 200],
        };
        assert!(big.enforce_minimum_data_push().is_err());
    }

    #[test]
    fn test_remove_by_data() {
        let parsed = parse_hex("02aabb4c02aabb5102aabbac").unwrap();
        let stripped = remove_opcode_by_data(&parsed, &[0x02, 0xaa, 0xbb]);
        assert_eq!(unparse(&stripped).to_hex(), "4c02aabb51ac");
        let no_sep = remove_opcode(&parse_hex("ab51abac").unwrap(), OP_CODESEPARATOR);
        assert_eq!(unparse(&no_sep).to_hex(), "51ac");
    }
}
