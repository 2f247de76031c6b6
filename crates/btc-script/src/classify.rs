//! Standard output script classification.
//!
//! Recognises the standard script templates and extracts the data each one
//! commits to: a public key, a key hash, a script hash, multisig keys, or the
//! payload of a data carrier.

use std::fmt;

use crate::chunk::ScriptChunk;
use crate::opcodes::*;
use crate::Script;

/// The payload a standard script template commits to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputSolution {
    /// `<pubkey> OP_CHECKSIG`, carrying the serialized key.
    PayToPubkey(Vec<u8>),
    /// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`.
    PayToPubkeyHash([u8; 20]),
    /// `OP_m <key>... OP_n OP_CHECKMULTISIG`.
    Multisig {
        /// Signatures required.
        m: usize,
        /// Serialized keys in script order.
        keys: Vec<Vec<u8>>,
    },
    /// `OP_HASH160 <hash> OP_EQUAL`.
    PayToScriptHash([u8; 20]),
    /// `OP_0 <20 bytes>`.
    WitnessKeyHash([u8; 20]),
    /// `OP_0 <32 bytes>`.
    WitnessScriptHash([u8; 32]),
    /// `OP_RETURN <push>...`, carrying each pushed value.
    NullData(Vec<Vec<u8>>),
    /// Anything else, including malformed scripts.
    Unknown,
}

impl OutputSolution {
    /// The data-free tag for this solution.
    pub fn script_type(&self) -> ScriptType {
        match self {
            OutputSolution::PayToPubkey(_) => ScriptType::PayToPubkey,
            OutputSolution::PayToPubkeyHash(_) => ScriptType::PayToPubkeyHash,
            OutputSolution::Multisig { .. } => ScriptType::Multisig,
            OutputSolution::PayToScriptHash(_) => ScriptType::PayToScriptHash,
            OutputSolution::WitnessKeyHash(_) => ScriptType::WitnessKeyHash,
            OutputSolution::WitnessScriptHash(_) => ScriptType::WitnessScriptHash,
            OutputSolution::NullData(_) => ScriptType::NullData,
            OutputSolution::Unknown => ScriptType::Unknown,
        }
    }
}

/// Tag identifying a standard script template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScriptType {
    PayToPubkey,
    PayToPubkeyHash,
    Multisig,
    PayToScriptHash,
    WitnessKeyHash,
    WitnessScriptHash,
    NullData,
    Unknown,
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScriptType::PayToPubkey => "pubkey",
            ScriptType::PayToPubkeyHash => "pubkeyhash",
            ScriptType::Multisig => "multisig",
            ScriptType::PayToScriptHash => "scripthash",
            ScriptType::WitnessKeyHash => "witness_v0_keyhash",
            ScriptType::WitnessScriptHash => "witness_v0_scripthash",
            ScriptType::NullData => "nulldata",
            ScriptType::Unknown => "nonstandard",
        };
        f.write_str(s)
    }
}

/// A script paired with its classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputData {
    script: Script,
    solution: OutputSolution,
}

impl OutputData {
    /// Classify `script` and keep both together.
    pub fn decode(script: &Script) -> Self {
        OutputData {
            script: script.clone(),
            solution: classify(script),
        }
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn solution(&self) -> &OutputSolution {
        &self.solution
    }

    pub fn script_type(&self) -> ScriptType {
        self.solution.script_type()
    }
}

/// Classify an output script.
///
/// Templates are tried in a fixed order: P2SH, witness key hash, witness
/// script hash, P2PKH, P2PK, multisig, null data. A script matching none of
/// them, or one that fails to parse, is `Unknown`.
pub fn classify(script: &Script) -> OutputSolution {
    let b = script.to_bytes();
    if script.is_p2sh() {
        return OutputSolution::PayToScriptHash(hash20(&b[2..22]));
    }
    if script.is_p2wpkh() {
        return OutputSolution::WitnessKeyHash(hash20(&b[2..22]));
    }
    if script.is_p2wsh() {
        let mut h = [0u8; 32];
        h.copy_from_slice(&b[2..34]);
        return OutputSolution::WitnessScriptHash(h);
    }
    if script.is_p2pkh() {
        return OutputSolution::PayToPubkeyHash(hash20(&b[3..23]));
    }

    let chunks = match script.chunks() {
        Ok(c) => c,
        Err(_) => return OutputSolution::Unknown,
    };
    if let Some(key) = decode_p2pk(&chunks) {
        return OutputSolution::PayToPubkey(key);
    }
    if let Some((m, keys)) = decode_multisig(&chunks) {
        return OutputSolution::Multisig { m, keys };
    }
    if let Some(items) = decode_null_data(&chunks) {
        return OutputSolution::NullData(items);
    }
    OutputSolution::Unknown
}

/// Report whether `bytes` is a syntactically valid SEC1 public key:
/// 33 bytes with prefix 0x02/0x03, or 65 bytes with prefix 0x04.
///
/// The point itself is not checked.
pub fn is_pub_key_encoding(bytes: &[u8]) -> bool {
    match bytes.len() {
        33 => bytes[0] == 0x02 || bytes[0] == 0x03,
        65 => bytes[0] == 0x04,
        _ => false,
    }
}

pub(crate) fn decode_p2pk(chunks: &[ScriptChunk]) -> Option<Vec<u8>> {
    match chunks {
        [key, check] if check.op == OP_CHECKSIG => match key.data {
            Some(ref k) if is_pub_key_encoding(k) => Some(k.clone()),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn decode_multisig(chunks: &[ScriptChunk]) -> Option<(usize, Vec<Vec<u8>>)> {
    if chunks.len() < 4 {
        return None;
    }
    let last = chunks.len() - 1;
    if chunks[last].op != OP_CHECKMULTISIG {
        return None;
    }
    let m = small_int_value(chunks[0].op)?;
    let n = small_int_value(chunks[last - 1].op)?;

    let mut keys = Vec::with_capacity(last - 2);
    for chunk in &chunks[1..last - 1] {
        match chunk.data {
            Some(ref k) if is_pub_key_encoding(k) => keys.push(k.clone()),
            _ => return None,
        }
    }
    if m > n || n != keys.len() {
        return None;
    }
    Some((m, keys))
}

pub(crate) fn decode_null_data(chunks: &[ScriptChunk]) -> Option<Vec<Vec<u8>>> {
    let (first, rest) = chunks.split_first()?;
    if first.op != OP_RETURN || !rest.iter().all(ScriptChunk::is_push) {
        return None;
    }
    Some(rest.iter().map(push_value).collect())
}

// OP_1..OP_16 only; a zero count is not a valid multisig parameter.
fn small_int_value(op: u8) -> Option<usize> {
    match decode_small_int(op) {
        Some(n) if n > 0 => Some(n as usize),
        _ => None,
    }
}

fn push_value(chunk: &ScriptChunk) -> Vec<u8> {
    if let Some(ref data) = chunk.data {
        return data.clone();
    }
    match chunk.op {
        OP_1NEGATE => vec![0x81],
        op => match decode_small_int(op) {
            Some(n) if n > 0 => vec![n],
            _ => Vec::new(),
        },
    }
}

fn hash20(b: &[u8]) -> [u8; 20] {
    let mut h = [0u8; 20];
    h.copy_from_slice(b);
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use btc_primitives::ec::PublicKey;

    const PK1: &str = "04f260c8b554e9d0921c507fb231d0e226ba17462078825c56170facb6567dcec700750bd529f4361da21f59fbfc7d0bce319fdef4e7c524e82d3e313e92b1b347";
    const PK_C: &str = "02ce0b14fb842b1ba549fdd675c98075f12e9c510f8ef52bd021a9a1f4809d3b4d";

    #[test]
    fn test_classify_templates() {
        let pk = PublicKey::from_hex(PK1).unwrap();
        let pkc = PublicKey::from_hex(PK_C).unwrap();

        assert_eq!(
            classify(&Script::p2pkh(&[7u8; 20])),
            OutputSolution::PayToPubkeyHash([7u8; 20])
        );
        assert_eq!(
            classify(&Script::p2sh(&[8u8; 20])),
            OutputSolution::PayToScriptHash([8u8; 20])
        );
        assert_eq!(
            classify(&Script::p2wpkh(&[9u8; 20])),
            OutputSolution::WitnessKeyHash([9u8; 20])
        );
        assert_eq!(
            classify(&Script::p2wsh(&[10u8; 32])),
            OutputSolution::WitnessScriptHash([10u8; 32])
        );
        assert_eq!(
            classify(&Script::p2pk(&pk)),
            OutputSolution::PayToPubkey(pk.to_bytes())
        );

        let ms = Script::multisig(1, &[pk.clone(), pkc.clone()], false).unwrap();
        assert_eq!(
            classify(&ms),
            OutputSolution::Multisig {
                m: 1,
                keys: vec![pk.to_bytes(), pkc.to_bytes()]
            }
        );

        let nd = Script::from_bytes(&[OP_RETURN, 0x02, 0xbe, 0xef, OP_5]);
        assert_eq!(
            classify(&nd),
            OutputSolution::NullData(vec![vec![0xbe, 0xef], vec![5]])
        );
    }

    #[test]
    fn test_classify_unknown() {
        // truncated push
        assert_eq!(classify(&Script::from_bytes(&[0x05, 0x01])), OutputSolution::Unknown);
        assert_eq!(classify(&Script::new()), OutputSolution::Unknown);
        assert_eq!(
            classify(&Script::from_bytes(&[OP_RETURN, OP_DUP])),
            OutputSolution::Unknown
        );
        // witness v1 is not a standard template here
        let v1 = Script::from_bytes(&[&[OP_1, OP_DATA_32][..], &[0u8; 32][..]].concat());
        assert_eq!(classify(&v1), OutputSolution::Unknown);
    }

    #[test]
    fn test_classify_bad_multisig() {
        let pk = hex::decode(PK_C).unwrap();
        let mut s = Script::from_bytes(&[OP_2]);
        s.append_push_data(&pk).unwrap();
        s.append_opcodes(&[OP_1, OP_CHECKMULTISIG]).unwrap();
        // m > n
        assert_eq!(classify(&s), OutputSolution::Unknown);

        let mut s = Script::from_bytes(&[OP_1]);
        s.append_push_data(&pk).unwrap();
        s.append_opcodes(&[OP_2, OP_CHECKMULTISIG]).unwrap();
        // n does not match key count
        assert_eq!(classify(&s), OutputSolution::Unknown);

        let mut s = Script::from_bytes(&[OP_1]);
        s.append_push_data(&pk[..32]).unwrap();
        s.append_opcodes(&[OP_1, OP_CHECKMULTISIG]).unwrap();
        // not a key encoding
        assert_eq!(classify(&s), OutputSolution::Unknown);

        let mut s = Script::from_bytes(&[OP_0]);
        s.append_push_data(&pk).unwrap();
        s.append_opcodes(&[OP_1, OP_CHECKMULTISIG]).unwrap();
        assert_eq!(classify(&s), OutputSolution::Unknown);
    }

    #[test]
    fn test_output_data_and_display() {
        let data = OutputData::decode(&Script::p2wpkh(&[1u8; 20]));
        assert_eq!(data.script_type(), ScriptType::WitnessKeyHash);
        assert_eq!(data.script(), &Script::p2wpkh(&[1u8; 20]));
        assert_eq!(data.script_type().to_string(), "witness_v0_keyhash");
        assert_eq!(ScriptType::Unknown.to_string(), "nonstandard");
        assert_eq!(ScriptType::PayToScriptHash.to_string(), "scripthash");
    }

    #[test]
    fn test_pub_key_encoding() {
        assert!(is_pub_key_encoding(&hex::decode(PK1).unwrap()));
        assert!(is_pub_key_encoding(&hex::decode(PK_C).unwrap()));
        assert!(!is_pub_key_encoding(&[0x06; 65]));
        assert!(!is_pub_key_encoding(&[]));
    }
}
