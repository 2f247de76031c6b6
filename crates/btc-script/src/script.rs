//! The script byte string and its standard templates.
//!
//! A `Script` holds raw bytes and is never validated on construction; a
//! truncated push only shows up when the script is decoded or executed.

use std::fmt;

use btc_primitives::ec::PublicKey;
use btc_primitives::hash::{hash160, sha256};

use crate::chunk::{decode_script, push_data_prefix, ScriptChunk};
use crate::classify;
use crate::interpreter;
use crate::opcodes::*;
use crate::ScriptError;

#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Script(Vec<u8>);

impl Script {
    pub fn new() -> Self {
        Script(Vec::new())
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        Ok(Script(hex::decode(hex_str)?))
    }

    /// Parse space separated ASM. Opcode names may omit the `OP_` prefix;
    /// any other token is hex data, pushed with the shortest prefix.
    pub fn from_asm(asm: &str) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        for token in asm.split_whitespace() {
            if let Some(op) = string_to_opcode(token) {
                script.0.push(op);
                continue;
            }
            let data =
                hex::decode(token).map_err(|_| ScriptError::InvalidOpcodeData(token.to_string()))?;
            script.append_push_data(&data)?;
        }
        Ok(script)
    }

    fn template(parts: &[&[u8]]) -> Self {
        Script(parts.concat())
    }

    /// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
    pub fn p2pkh(pub_key_hash: &[u8; 20]) -> Self {
        Self::template(&[
            &[OP_DUP, OP_HASH160, OP_DATA_20],
            pub_key_hash,
            &[OP_EQUALVERIFY, OP_CHECKSIG],
        ])
    }

    /// `<pubkey> OP_CHECKSIG`, with the key in its own form.
    pub fn p2pk(pub_key: &PublicKey) -> Self {
        let mut script = Script::new();
        script.append_chunk(&ScriptChunk::push(&pub_key.to_bytes()));
        script.0.push(OP_CHECKSIG);
        script
    }

    /// `OP_HASH160 <hash> OP_EQUAL`
    pub fn p2sh(script_hash: &[u8; 20]) -> Self {
        Self::template(&[&[OP_HASH160, OP_DATA_20], script_hash, &[OP_EQUAL]])
    }

    /// `OP_0 <20-byte key hash>`
    pub fn p2wpkh(pub_key_hash: &[u8; 20]) -> Self {
        Self::template(&[&[OP_0, OP_DATA_20], pub_key_hash])
    }

    /// `OP_0 <32-byte script hash>`
    pub fn p2wsh(script_hash: &[u8; 32]) -> Self {
        Self::template(&[&[OP_0, OP_DATA_32], script_hash])
    }

    /// `OP_m <key>... OP_n OP_CHECKMULTISIG` for 1 <= m <= n <= 16.
    ///
    /// With `sort`, keys are ordered by their serialized bytes so that the
    /// same key set always yields the same script.
    pub fn multisig(m: usize, keys: &[PublicKey], sort: bool) -> Result<Self, ScriptError> {
        let n = keys.len();
        let small = |v: usize| u8::try_from(v).ok().and_then(encode_small_int);
        let (m_op, n_op) = match (small(m), small(n)) {
            (Some(m_op), Some(n_op)) if m >= 1 && m <= n => (m_op, n_op),
            _ => {
                return Err(ScriptError::InvalidMultisig(format!(
                    "{} of {} keys (at most 16 keys, at least one signature)",
                    m, n
                )))
            }
        };

        let mut encoded: Vec<Vec<u8>> = keys.iter().map(PublicKey::to_bytes).collect();
        if sort {
            encoded.sort_unstable();
        }

        let mut script = Script(vec![m_op]);
        encoded
            .iter()
            .for_each(|k| script.append_chunk(&ScriptChunk::push(k)));
        script.0.extend([n_op, OP_CHECKMULTISIG]);
        Ok(script)
    }

    /// `OP_RETURN <item>...`, unspendable.
    pub fn null_data(items: &[&[u8]]) -> Result<Self, ScriptError> {
        let mut script = Script(vec![OP_RETURN]);
        for item in items {
            script.append_push_data(item)?;
        }
        Ok(script)
    }

    /// Push each item with its shortest prefix; empty items become `OP_0`.
    pub fn push_all(items: &[Vec<u8>]) -> Self {
        let mut script = Script::new();
        items
            .iter()
            .for_each(|item| script.append_chunk(&ScriptChunk::push(item)));
        script
    }

    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Opcode names and hex pushes. A script that does not decode renders
    /// as the empty string.
    pub fn to_asm(&self) -> String {
        let Ok(chunks) = self.chunks() else {
            return String::new();
        };
        chunks
            .iter()
            .map(ScriptChunk::to_asm_string)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode into chunks; `DataTooSmall` on a truncated push.
    pub fn chunks(&self) -> Result<Vec<ScriptChunk>, ScriptError> {
        decode_script(&self.0)
    }

    /// The hash a P2SH output commits to.
    pub fn script_hash(&self) -> [u8; 20] {
        hash160(&self.0)
    }

    /// The hash a P2WSH output commits to.
    pub fn witness_script_hash(&self) -> [u8; 32] {
        sha256(&self.0)
    }

    pub fn is_p2pkh(&self) -> bool {
        matches!(
            self.0.as_slice(),
            [OP_DUP, OP_HASH160, OP_DATA_20, hash @ .., OP_EQUALVERIFY, OP_CHECKSIG] if hash.len() == 20
        )
    }

    pub fn is_p2pk(&self) -> bool {
        matches!(self.chunks(), Ok(c) if classify::decode_p2pk(&c).is_some())
    }

    pub fn is_p2sh(&self) -> bool {
        matches!(
            self.0.as_slice(),
            [OP_HASH160, OP_DATA_20, hash @ .., OP_EQUAL] if hash.len() == 20
        )
    }

    pub fn is_p2wpkh(&self) -> bool {
        matches!(self.witness_program(), Some((0, p)) if p.len() == 20)
    }

    pub fn is_p2wsh(&self) -> bool {
        matches!(self.witness_program(), Some((0, p)) if p.len() == 32)
    }

    pub fn is_witness_program(&self) -> bool {
        self.witness_program().is_some()
    }

    /// Version and program of a witness program: a small integer opcode
    /// followed by a single direct push of 2 to 40 bytes.
    pub fn witness_program(&self) -> Option<(u8, &[u8])> {
        if !(4..=42).contains(&self.0.len()) {
            return None;
        }
        match self.0.as_slice() {
            [version, len, program @ ..] if *len as usize == program.len() => {
                Some((decode_small_int(*version)?, program))
            }
            _ => None,
        }
    }

    pub fn is_multisig(&self) -> bool {
        matches!(self.chunks(), Ok(c) if classify::decode_multisig(&c).is_some())
    }

    pub fn is_null_data(&self) -> bool {
        matches!(self.chunks(), Ok(c) if classify::decode_null_data(&c).is_some())
    }

    /// Every opcode is OP_16 or below. A truncated script is not push-only.
    pub fn is_push_only(&self) -> bool {
        self.chunks()
            .map(|chunks| chunks.iter().all(ScriptChunk::is_push))
            .unwrap_or(false)
    }

    /// The stack a push-only script leaves behind, bottom first. Small
    /// integer opcodes come out as script numbers.
    pub fn push_data_items(&self) -> Result<Vec<Vec<u8>>, ScriptError> {
        Ok(interpreter::eval_push_only(self)?)
    }

    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        self.0.extend(push_data_prefix(data.len())?);
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append non-push opcodes. Data push opcodes are refused because they
    /// need their payload; use `append_push_data` for those.
    pub fn append_opcodes(&mut self, opcodes: &[u8]) -> Result<(), ScriptError> {
        if let Some(&op) = opcodes
            .iter()
            .find(|op| (OP_DATA_1..=OP_PUSHDATA4).contains(*op))
        {
            return Err(ScriptError::InvalidOpcodeType(opcode_to_string(op)));
        }
        self.0.extend_from_slice(opcodes);
        Ok(())
    }

    pub fn append_chunk(&mut self, chunk: &ScriptChunk) {
        self.0.extend(chunk.to_bytes());
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self)
    }
}

impl serde::Serialize for Script {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
