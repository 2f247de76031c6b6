//! Hashing and signature opcodes.

use btc_primitives::hash;

use crate::chunk::ScriptChunk;
use crate::classify::is_pub_key_encoding;
use crate::opcodes::{OP_CHECKMULTISIGVERIFY, OP_CHECKSIGVERIFY};

use super::config::{MAX_PUB_KEYS_PER_MULTISIG, MAX_SCRIPT_NUMBER_LENGTH};
use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::parsed_opcode::*;
use super::thread::Thread;
use super::SigVersion;

/// Half the secp256k1 group order; larger S values are malleable.
const HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

const SIGHASH_ALL: u8 = 0x01;
const SIGHASH_SINGLE: u8 = 0x03;
const SIGHASH_ANYONECANPAY: u8 = 0x80;

pub(crate) enum HashType {
    Ripemd160,
    Sha1,
    Sha256,
    Hash160,
    Hash256,
}

impl<'a> Thread<'a> {
    pub(crate) fn op_hash(&mut self, hash_type: HashType) -> Result<(), InterpreterError> {
        let buf = self.dstack.pop()?;
        let digest = match hash_type {
            HashType::Ripemd160 => hash::ripemd160(&buf).to_vec(),
            HashType::Sha1 => hash::sha1(&buf).to_vec(),
            HashType::Sha256 => hash::sha256(&buf).to_vec(),
            HashType::Hash160 => hash::hash160(&buf).to_vec(),
            HashType::Hash256 => hash::sha256d(&buf).to_vec(),
        };
        self.dstack.push(digest);
        Ok(())
    }

    /// The script code a signature commits to, with the pushes of `sigs`
    /// removed. Witness scripts sign their code unmodified.
    fn script_code_without(&self, sigs: &[Vec<u8>]) -> crate::Script {
        let mut code = self.sub_script();
        if self.sig_version == SigVersion::Base {
            for sig in sigs {
                code = remove_opcode_by_data(&code, &ScriptChunk::push(sig).to_bytes());
            }
        }
        unparse(&code)
    }

    /// OP_CHECKSIG and OP_CHECKSIGVERIFY: `sig pubkey -> bool`.
    pub(crate) fn op_checksig(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.require_depth(2, pop)?;
        let pub_key = self.dstack.pop()?;
        let sig = self.dstack.pop()?;

        let script_code = self.script_code_without(std::slice::from_ref(&sig));
        self.check_signature_encoding(&sig)?;
        self.check_pub_key_encoding(&pub_key)?;

        let valid = self
            .checker
            .check_sig(&sig, &pub_key, &script_code, self.sig_version);
        if !valid && !sig.is_empty() && self.has_flag(ScriptFlags::NULLFAIL) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NullFail,
                "failed signature check with a non-empty signature".to_string(),
            ));
        }

        self.dstack.push_bool(valid);
        if pop.opcode == OP_CHECKSIGVERIFY {
            return self.abstract_verify(pop, InterpreterErrorCode::CheckSigVerify);
        }
        Ok(())
    }

    /// OP_CHECKMULTISIG and its VERIFY form.
    ///
    /// Stack, top first: `n key_n..key_1 m sig_m..sig_1 dummy`. Signatures
    /// must follow the order of their keys; each key is tried once and a
    /// key that fails is never revisited.
    pub(crate) fn op_checkmultisig(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.require_depth(1, pop)?;
        let n = self.dstack.peek_num(0, MAX_SCRIPT_NUMBER_LENGTH)?.to_i64();
        let n_keys = usize::try_from(n)
            .ok()
            .filter(|&k| k <= MAX_PUB_KEYS_PER_MULTISIG)
            .ok_or_else(|| {
                InterpreterError::new(
                    InterpreterErrorCode::InvalidPubKeyCount,
                    format!("{} keys, allowed 0..={}", n, MAX_PUB_KEYS_PER_MULTISIG),
                )
            })?;
        self.count_ops(n_keys)?;

        // Depth of the signature count
        let m_depth = 1 + n_keys;
        self.require_depth(m_depth + 1, pop)?;
        let m = self.dstack.peek_num(m_depth, MAX_SCRIPT_NUMBER_LENGTH)?.to_i64();
        let n_sigs = usize::try_from(m)
            .ok()
            .filter(|&s| s <= n_keys)
            .ok_or_else(|| {
                InterpreterError::new(
                    InterpreterErrorCode::InvalidSignatureCount,
                    format!("{} signatures for {} keys", m, n_keys),
                )
            })?;
        let consumed = m_depth + 1 + n_sigs;
        // One more for the dummy item below the signatures
        self.require_depth(consumed + 1, pop)?;

        // Both lists top first, which is the order they are tried in
        let keys: Vec<Vec<u8>> = (1..=n_keys)
            .map(|d| self.dstack.peek(d).map(<[u8]>::to_vec))
            .collect::<Result<_, _>>()?;
        let sigs: Vec<Vec<u8>> = (m_depth + 1..consumed)
            .map(|d| self.dstack.peek(d).map(<[u8]>::to_vec))
            .collect::<Result<_, _>>()?;

        let script_code = self.script_code_without(&sigs);

        let mut remaining_keys = keys.iter();
        let mut success = true;
        for (i, sig) in sigs.iter().enumerate() {
            let mut matched = false;
            // Keep at least as many keys as there are unmatched signatures
            while remaining_keys.len() >= n_sigs - i {
                let Some(key) = remaining_keys.next() else { break };
                self.check_signature_encoding(sig)?;
                self.check_pub_key_encoding(key)?;
                if self
                    .checker
                    .check_sig(sig, key, &script_code, self.sig_version)
                {
                    matched = true;
                    break;
                }
            }
            if !matched {
                success = false;
                break;
            }
        }

        if !success
            && self.has_flag(ScriptFlags::NULLFAIL)
            && sigs.iter().any(|s| !s.is_empty())
        {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NullFail,
                "failed multisig check with a non-empty signature".to_string(),
            ));
        }

        self.dstack.drop_top(consumed)?;

        let dummy = self.dstack.pop()?;
        if !dummy.is_empty() && self.has_flag(ScriptFlags::NULLDUMMY) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigNullDummy,
                format!("multisig dummy is {} bytes, not empty", dummy.len()),
            ));
        }

        self.dstack.push_bool(success);
        if pop.opcode == OP_CHECKMULTISIGVERIFY {
            return self.abstract_verify(pop, InterpreterErrorCode::CheckMultiSigVerify);
        }
        Ok(())
    }

    pub(crate) fn check_pub_key_encoding(&self, pub_key: &[u8]) -> Result<(), InterpreterError> {
        if self.has_flag(ScriptFlags::STRICTENC) && !is_pub_key_encoding(pub_key) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::PubKeyType,
                format!("unsupported public key encoding {}", hex::encode(pub_key)),
            ));
        }
        if self.sig_version == SigVersion::WitnessV0
            && self.has_flag(ScriptFlags::WITNESS_PUBKEYTYPE)
            && !matches!(pub_key, [0x02 | 0x03, rest @ ..] if rest.len() == 32)
        {
            return Err(InterpreterError::new(
                InterpreterErrorCode::WitnessPubKeyType,
                "witness v0 scripts take only compressed keys".to_string(),
            ));
        }
        Ok(())
    }

    /// Policy checks on a signature with its hash type byte. The empty
    /// signature always passes, so scripts can fail a check on purpose.
    pub(crate) fn check_signature_encoding(&self, full_sig: &[u8]) -> Result<(), InterpreterError> {
        let Some((&hash_type, sig)) = full_sig.split_last() else {
            return Ok(());
        };

        if self.flags.has_any(&[
            ScriptFlags::DERSIG,
            ScriptFlags::LOW_S,
            ScriptFlags::STRICTENC,
        ]) {
            check_der_encoding(sig)?;
        }

        if self.has_flag(ScriptFlags::LOW_S) && !is_low_s(der_s_value(sig)) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigHighS,
                "S value is above half the group order".to_string(),
            ));
        }

        if self.has_flag(ScriptFlags::STRICTENC)
            && !(SIGHASH_ALL..=SIGHASH_SINGLE).contains(&(hash_type & !SIGHASH_ANYONECANPAY))
        {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSigHashType,
                format!("undefined hash type 0x{:02x}", hash_type),
            ));
        }

        Ok(())
    }
}

fn is_low_s(s: &[u8]) -> bool {
    let first = s.iter().position(|&b| b != 0).unwrap_or(s.len());
    let s = &s[first..];
    if s.len() != HALF_ORDER.len() {
        return s.len() < HALF_ORDER.len();
    }
    s <= &HALF_ORDER[..]
}

fn sig_der(msg: &str) -> InterpreterError {
    InterpreterError::new(
        InterpreterErrorCode::SigDer,
        format!("non-canonical DER signature: {}", msg),
    )
}

/// Check one DER INTEGER body: non-empty, non-negative, no excess padding.
fn check_der_integer(name: &str, value: &[u8]) -> Result<(), InterpreterError> {
    match value {
        [] => Err(sig_der(&format!("{} is empty", name))),
        [first, ..] if first & 0x80 != 0 => Err(sig_der(&format!("{} is negative", name))),
        [0x00, next, ..] if next & 0x80 == 0 => {
            Err(sig_der(&format!("{} has excess padding", name)))
        }
        _ => Ok(()),
    }
}

/// Strict DER (BIP66) for a signature without its hash type byte:
/// `0x30 len 0x02 rlen R 0x02 slen S`.
pub fn check_der_encoding(sig: &[u8]) -> Result<(), InterpreterError> {
    if !(8..=72).contains(&sig.len()) {
        return Err(sig_der(&format!("length {} outside 8..=72", sig.len())));
    }
    if sig[0] != 0x30 {
        return Err(sig_der("missing sequence tag"));
    }
    if sig[1] as usize != sig.len() - 2 {
        return Err(sig_der("sequence length does not cover the signature"));
    }
    if sig[2] != 0x02 {
        return Err(sig_der("R is not an integer"));
    }

    let r_len = sig[3] as usize;
    let s_tag = 4 + r_len;
    if s_tag + 1 >= sig.len() {
        return Err(sig_der("S is missing"));
    }
    let s_len = sig[s_tag + 1] as usize;
    if s_tag + 2 + s_len != sig.len() {
        return Err(sig_der("S length does not reach the end"));
    }
    if sig[s_tag] != 0x02 {
        return Err(sig_der("S is not an integer"));
    }

    check_der_integer("R", &sig[4..s_tag])?;
    check_der_integer("S", &sig[s_tag + 2..])
}

/// The S bytes of a signature already accepted by `check_der_encoding`.
fn der_s_value(sig: &[u8]) -> &[u8] {
    let s_start = 6 + sig[3] as usize;
    sig.get(s_start..).unwrap_or_default()
}
