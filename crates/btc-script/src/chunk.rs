//! Splitting raw script bytes into opcodes and pushes.

use crate::opcodes::*;
use crate::ScriptError;

/// One element of a script: a bare opcode, or a push with its payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptChunk {
    /// The opcode byte. For direct pushes this is also the payload length.
    pub op: u8,
    pub data: Option<Vec<u8>>,
}

impl ScriptChunk {
    pub fn opcode(op: u8) -> Self {
        ScriptChunk { op, data: None }
    }

    /// A push of `data` with the shortest prefix that fits it.
    ///
    /// Empty data becomes OP_0.
    pub fn push(data: &[u8]) -> Self {
        let op = match data.len() {
            0 => return ScriptChunk::opcode(OP_0),
            n if n <= OP_DATA_75 as usize => n as u8,
            n if n <= u8::MAX as usize => OP_PUSHDATA1,
            n if n <= u16::MAX as usize => OP_PUSHDATA2,
            _ => OP_PUSHDATA4,
        };
        ScriptChunk {
            op,
            data: Some(data.to_vec()),
        }
    }

    /// True for every opcode up to OP_16, OP_RESERVED included.
    pub fn is_push(&self) -> bool {
        self.op <= OP_16
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let data = self.data.as_deref().unwrap_or_default();
        let mut out = Vec::with_capacity(5 + data.len());
        out.push(self.op);
        match self.op {
            OP_PUSHDATA1 => out.push(data.len() as u8),
            OP_PUSHDATA2 => out.extend_from_slice(&(data.len() as u16).to_le_bytes()),
            OP_PUSHDATA4 => out.extend_from_slice(&(data.len() as u32).to_le_bytes()),
            _ => {}
        }
        out.extend_from_slice(data);
        out
    }

    /// Hex for a non-empty push, the opcode name otherwise.
    pub fn to_asm_string(&self) -> String {
        match &self.data {
            Some(data) if self.op != OP_0 => hex::encode(data),
            _ => opcode_to_string(self.op),
        }
    }
}

/// Number of length bytes that follow `op`, if it is an extended push.
fn length_width(op: u8) -> Option<usize> {
    match op {
        OP_PUSHDATA1 => Some(1),
        OP_PUSHDATA2 => Some(2),
        OP_PUSHDATA4 => Some(4),
        _ => None,
    }
}

fn split(bytes: &[u8], n: usize) -> Result<(&[u8], &[u8]), ScriptError> {
    if n > bytes.len() {
        return Err(ScriptError::DataTooSmall);
    }
    Ok(bytes.split_at(n))
}

/// Parse a whole script. A push that runs past the end is an error;
/// every other byte, OP_RETURN and unassigned values included, is a chunk.
pub fn decode_script(bytes: &[u8]) -> Result<Vec<ScriptChunk>, ScriptError> {
    let mut chunks = Vec::new();
    let mut rest = bytes;

    while let Some((&op, tail)) = rest.split_first() {
        rest = tail;
        let len = match (op, length_width(op)) {
            (OP_DATA_1..=OP_DATA_75, _) => op as usize,
            (_, Some(width)) => {
                let (le, tail) = split(rest, width)?;
                rest = tail;
                le.iter().rev().fold(0usize, |acc, &b| (acc << 8) | b as usize)
            }
            _ => {
                chunks.push(ScriptChunk::opcode(op));
                continue;
            }
        };
        let (data, tail) = split(rest, len)?;
        rest = tail;
        chunks.push(ScriptChunk {
            op,
            data: Some(data.to_vec()),
        });
    }

    Ok(chunks)
}

/// The bytes that must precede a push of `data_len` bytes.
pub fn push_data_prefix(data_len: usize) -> Result<Vec<u8>, ScriptError> {
    let len = u32::try_from(data_len).map_err(|_| ScriptError::DataTooBig)?;
    Ok(match len {
        0..=75 => vec![len as u8],
        76..=0xff => vec![OP_PUSHDATA1, len as u8],
        0x100..=0xffff => {
            let mut buf = vec![OP_PUSHDATA2];
            buf.extend_from_slice(&(len as u16).to_le_bytes());
            buf
        }
        _ => {
            let mut buf = vec![OP_PUSHDATA4];
            buf.extend_from_slice(&len.to_le_bytes());
            buf
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_direct_pushes() {
        let bytes = hex::decode("05000102030401ff02abcd").unwrap();
        let chunks = decode_script(&bytes).unwrap();
        let payloads: Vec<_> = chunks.iter().map(|c| c.data.clone().unwrap()).collect();
        assert_eq!(
            payloads,
            vec![vec![0, 1, 2, 3, 4], vec![0xff], vec![0xab, 0xcd]]
        );
        let rebuilt: Vec<u8> = chunks.iter().flat_map(|c| c.to_bytes()).collect();
        assert_eq!(rebuilt, bytes);

        assert!(decode_script(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_decode_multisig_with_pushdata1() {
        let script_hex = "524c53ff0488b21e000000000000000000362f7a9030543db8751401c387d6a71e870f1895b3a62569d455e8ee5f5f5e5f03036624c6df96984db6b4e625b6707c017eb0e0d137cd13a0c989bfa77a4473fd000000004c53ff0488b21e0000000000000000008b20425398995f3c866ea6ce5c1828a516b007379cf97b136bffbdc86f75df14036454bad23b019eae34f10aff8b8d6d8deb18cb31354e5a169ee09d8a4560e8250000000052ae";
        let chunks = decode_script(&hex::decode(script_hex).unwrap()).unwrap();
        let ops: Vec<u8> = chunks.iter().map(|c| c.op).collect();
        assert_eq!(ops, vec![OP_2, OP_PUSHDATA1, OP_PUSHDATA1, OP_2, OP_CHECKMULTISIG]);
        assert_eq!(chunks[1].data.as_ref().unwrap().len(), 0x53);
    }

    #[test]
    fn test_truncated_pushes() {
        let cases: [&[u8]; 8] = [
            &[0x05, 0, 0, 0],
            &[OP_PUSHDATA1],
            &[OP_PUSHDATA1, 0x05, 0, 0, 0, 0],
            &[OP_PUSHDATA2],
            &[OP_PUSHDATA2, 0x01],
            &[OP_PUSHDATA2, 0x02, 0x00, 0xaa],
            &[OP_PUSHDATA4, 0x01, 0x00, 0x00],
            &[OP_PUSHDATA4, 0x01, 0x00, 0x00, 0x00],
        ];
        for bytes in cases {
            assert!(
                matches!(decode_script(bytes), Err(ScriptError::DataTooSmall)),
                "{:02x?}",
                bytes
            );
        }
    }

    #[test]
    fn test_extended_push_lengths_are_little_endian() {
        let mut bytes = vec![OP_PUSHDATA2, 0x01, 0x01];
        bytes.extend(std::iter::repeat(0x11).take(257));
        let chunks = decode_script(&bytes).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].data.as_ref().unwrap().len(), 257);
    }

    #[test]
    fn test_push_data_prefix_boundaries() {
        let cases: [(usize, &[u8]); 7] = [
            (0, &[0]),
            (20, &[20]),
            (75, &[75]),
            (76, &[OP_PUSHDATA1, 76]),
            (255, &[OP_PUSHDATA1, 255]),
            (256, &[OP_PUSHDATA2, 0x00, 0x01]),
            (65536, &[OP_PUSHDATA4, 0x00, 0x00, 0x01, 0x00]),
        ];
        for (len, want) in cases {
            assert_eq!(push_data_prefix(len).unwrap(), want, "len {}", len);
        }
    }

    #[test]
    fn test_op_return_keeps_following_pushes() {
        let chunks = decode_script(&hex::decode("6a0568656c6c6f").unwrap()).unwrap();
        assert_eq!(chunks[0], ScriptChunk::opcode(OP_RETURN));
        assert_eq!(chunks[1].data.as_deref(), Some(&b"hello"[..]));
        assert_eq!(chunks[1].to_asm_string(), "68656c6c6f");
        assert_eq!(chunks[0].to_asm_string(), "OP_RETURN");
    }

    #[test]
    fn test_push_picks_shortest_prefix() {
        for (len, op) in [
            (0usize, OP_0),
            (1, OP_DATA_1),
            (75, OP_DATA_75),
            (76, OP_PUSHDATA1),
            (256, OP_PUSHDATA2),
            (65536, OP_PUSHDATA4),
        ] {
            let chunk = ScriptChunk::push(&vec![0x11u8; len]);
            assert_eq!(chunk.op, op, "len {}", len);
            assert!(chunk.is_push());
            assert_eq!(decode_script(&chunk.to_bytes()).unwrap(), vec![chunk]);
        }
    }

    #[test]
    fn test_is_push() {
        assert!(ScriptChunk::opcode(OP_16).is_push());
        assert!(ScriptChunk::opcode(OP_1NEGATE).is_push());
        assert!(ScriptChunk::opcode(OP_RESERVED).is_push());
        assert!(!ScriptChunk::opcode(OP_NOP).is_push());
        assert_eq!(ScriptChunk::opcode(OP_DUP).to_bytes(), vec![OP_DUP]);
    }
}
