//! Signature hashes.
//!
//! Legacy inputs hash a trimmed copy of the transaction. Version 0 witness
//! inputs use BIP143, which also commits to the spent amount and lets the
//! transaction-wide parts be hashed once for all inputs.

use std::fmt;
use std::ops::BitOr;

use btc_primitives::hash::sha256d;
use btc_primitives::util::{ByteWriter, VarInt};
use btc_script::interpreter::{remove_code_separators, SigVersion};
use btc_script::Script;

use crate::output::TransactionOutput;
use crate::transaction::Transaction;
use crate::TransactionError;

/// Which parts of the transaction a signature covers.
///
/// The low five bits select ALL, NONE or SINGLE; bit 0x80 is ANYONECANPAY.
/// The whole value is hashed and stored after the DER signature, so
/// undefined combinations still produce a hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SigHashType(u32);

impl SigHashType {
    pub const ALL: SigHashType = SigHashType(0x01);
    /// No outputs are covered.
    pub const NONE: SigHashType = SigHashType(0x02);
    /// Only the output at the signed input's index is covered.
    pub const SINGLE: SigHashType = SigHashType(0x03);
    /// Only the signed input is covered.
    pub const ANYONECANPAY: SigHashType = SigHashType(0x80);

    const BASE_MASK: u32 = 0x1f;

    pub fn from_u32(value: u32) -> Self {
        SigHashType(value)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn base_type(self) -> u32 {
        self.0 & Self::BASE_MASK
    }

    pub fn anyone_can_pay(self) -> bool {
        self.0 & Self::ANYONECANPAY.0 != 0
    }

    pub fn is_none(self) -> bool {
        self.base_type() == Self::NONE.0
    }

    pub fn is_single(self) -> bool {
        self.base_type() == Self::SINGLE.0
    }

    /// ALL, NONE or SINGLE, optionally with ANYONECANPAY, and no other bits.
    pub fn is_defined(self) -> bool {
        matches!(self.0 & !Self::ANYONECANPAY.0, 0x01..=0x03)
    }
}

impl Default for SigHashType {
    fn default() -> Self {
        SigHashType::ALL
    }
}

impl BitOr for SigHashType {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        SigHashType(self.0 | rhs.0)
    }
}

impl fmt::Debug for SigHashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigHashType(")?;
        match self.base_type() {
            0x01 => f.write_str("ALL")?,
            0x02 => f.write_str("NONE")?,
            0x03 => f.write_str("SINGLE")?,
            other => write!(f, "{:#x}", other)?,
        }
        if self.anyone_can_pay() {
            f.write_str("|ANYONECANPAY")?;
        }
        f.write_str(")")
    }
}

/// `hashPrevouts`, `hashSequence` and `hashOutputs` of a transaction.
///
/// They depend only on the transaction, so a signer computes them once and
/// passes them by reference for every witness input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrecomputedHashes {
    pub hash_prevouts: [u8; 32],
    pub hash_sequence: [u8; 32],
    pub hash_outputs: [u8; 32],
}

impl PrecomputedHashes {
    pub fn new(tx: &Transaction) -> Self {
        let mut prevouts = ByteWriter::with_capacity(36 * tx.inputs.len());
        let mut sequences = ByteWriter::with_capacity(4 * tx.inputs.len());
        for input in &tx.inputs {
            input.prev_out.write_to(&mut prevouts);
            sequences.write_u32_le(input.sequence);
        }
        PrecomputedHashes {
            hash_prevouts: sha256d(prevouts.as_bytes()),
            hash_sequence: sha256d(sequences.as_bytes()),
            hash_outputs: outputs_hash(&tx.outputs),
        }
    }
}

/// Hash input `input_index` for signing under `sig_version`'s rules.
///
/// `amount` is ignored by the legacy algorithm. Without `cache` the BIP143
/// hashes are computed for this call only.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    amount: u64,
    sighash_type: SigHashType,
    sig_version: SigVersion,
    cache: Option<&PrecomputedHashes>,
) -> Result<[u8; 32], TransactionError> {
    match sig_version {
        SigVersion::Base => Ok(legacy_signature_hash(tx, input_index, script_code, sighash_type)),
        SigVersion::WitnessV0 => {
            let preimage =
                witness_v0_preimage(tx, input_index, script_code, amount, sighash_type, cache)?;
            Ok(sha256d(&preimage))
        }
    }
}

/// Returned instead of a hash when the input or, for SINGLE, the matching
/// output does not exist: the integer one, little-endian.
const ONE: [u8; 32] = {
    let mut one = [0u8; 32];
    one[0] = 1;
    one
};

/// The original signature hash.
///
/// `script_code`, minus its OP_CODESEPARATORs, takes the place of the
/// signed input's scriptSig and every other scriptSig is emptied. NONE and
/// SINGLE zero the other inputs' sequences. SINGLE keeps outputs up to the
/// input's index, blanking all but the last.
pub fn legacy_signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    sighash_type: SigHashType,
) -> [u8; 32] {
    let single = sighash_type.is_single();
    let none = sighash_type.is_none();
    if input_index >= tx.inputs.len() || (single && input_index >= tx.outputs.len()) {
        return ONE;
    }

    let script_code = remove_code_separators(script_code);
    let mut w = ByteWriter::with_capacity(128 + script_code.len());
    w.write_u32_le(tx.version);

    let signed = if sighash_type.anyone_can_pay() {
        input_index..input_index + 1
    } else {
        0..tx.inputs.len()
    };
    w.write_varint(VarInt::from(signed.len()));
    for (i, input) in tx.inputs.iter().enumerate().filter(|(i, _)| signed.contains(i)) {
        input.prev_out.write_to(&mut w);
        if i == input_index {
            w.write_var_bytes(script_code.to_bytes());
            w.write_u32_le(input.sequence);
        } else {
            w.write_var_bytes(&[]);
            w.write_u32_le(if single || none { 0 } else { input.sequence });
        }
    }

    let kept = if none {
        &tx.outputs[..0]
    } else if single {
        &tx.outputs[..=input_index]
    } else {
        &tx.outputs[..]
    };
    w.write_varint(VarInt::from(kept.len()));
    for (i, output) in kept.iter().enumerate() {
        if single && i != input_index {
            // value -1, empty script
            w.write_u64_le(u64::MAX);
            w.write_var_bytes(&[]);
        } else {
            output.write_to(&mut w);
        }
    }

    w.write_u32_le(tx.lock_time);
    w.write_u32_le(sighash_type.value());
    sha256d(w.as_bytes())
}

/// The BIP143 message before double hashing.
///
/// `version | hashPrevouts | hashSequence | outpoint | scriptCode | amount |
/// nSequence | hashOutputs | lockTime | sighashType`. ANYONECANPAY zeroes
/// `hashPrevouts`; it, NONE and SINGLE zero `hashSequence`. SINGLE hashes
/// only the matching output, or zeroes when there is none.
pub fn witness_v0_preimage(
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    amount: u64,
    sighash_type: SigHashType,
    cache: Option<&PrecomputedHashes>,
) -> Result<Vec<u8>, TransactionError> {
    let input = tx.inputs.get(input_index).ok_or_else(|| {
        TransactionError::InvalidTransaction(format!(
            "no input {} to sign, transaction has {}",
            input_index,
            tx.inputs.len()
        ))
    })?;

    let hashes = match cache {
        Some(hashes) => *hashes,
        None => PrecomputedHashes::new(tx),
    };
    let acp = sighash_type.anyone_can_pay();
    let single = sighash_type.is_single();
    let none = sighash_type.is_none();
    let zero = [0u8; 32];

    let hash_prevouts = if acp { zero } else { hashes.hash_prevouts };
    let hash_sequence = if acp || single || none {
        zero
    } else {
        hashes.hash_sequence
    };
    let hash_outputs = match tx.outputs.get(input_index) {
        _ if !single && !none => hashes.hash_outputs,
        Some(output) if single => outputs_hash(std::slice::from_ref(output)),
        _ => zero,
    };

    let mut w = ByteWriter::with_capacity(160 + script_code.len());
    w.write_u32_le(tx.version);
    w.write_bytes(&hash_prevouts);
    w.write_bytes(&hash_sequence);
    input.prev_out.write_to(&mut w);
    w.write_var_bytes(script_code.to_bytes());
    w.write_u64_le(amount);
    w.write_u32_le(input.sequence);
    w.write_bytes(&hash_outputs);
    w.write_u32_le(tx.lock_time);
    w.write_u32_le(sighash_type.value());
    Ok(w.into_bytes())
}

fn outputs_hash(outputs: &[TransactionOutput]) -> [u8; 32] {
    let mut w = ByteWriter::new();
    outputs.iter().for_each(|o| o.write_to(&mut w));
    sha256d(w.as_bytes())
}
