//! Signature checking against a real transaction.
//!
//! Connects the script interpreter to the signature hash calculator: the
//! interpreter hands over the signature, key and script code, and this
//! checker hashes the spending transaction and verifies the ECDSA signature.

use btc_primitives::ec::PublicKey;
use btc_script::interpreter::config::SEQUENCE_FINAL;
use btc_script::interpreter::{SigVersion, SignatureChecker};
use btc_script::Script;

use crate::sighash::{signature_hash, PrecomputedHashes};
use crate::signature::TransactionSignature;
use crate::transaction::Transaction;

/// Checks signatures for one input of a transaction.
#[derive(Clone, Copy, Debug)]
pub struct TransactionSignatureChecker<'a> {
    tx: &'a Transaction,
    input_index: usize,
    amount: u64,
    hashes: Option<&'a PrecomputedHashes>,
}

impl<'a> TransactionSignatureChecker<'a> {
    /// `amount` is the value of the output being spent; only witness
    /// signatures commit to it.
    pub fn new(tx: &'a Transaction, input_index: usize, amount: u64) -> Self {
        TransactionSignatureChecker {
            tx,
            input_index,
            amount,
            hashes: None,
        }
    }

    /// Reuse precomputed BIP143 hashes instead of rebuilding them per check.
    pub fn with_precomputed(mut self, hashes: &'a PrecomputedHashes) -> Self {
        self.hashes = Some(hashes);
        self
    }
}

impl SignatureChecker for TransactionSignatureChecker<'_> {
    fn check_sig(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        script_code: &Script,
        sig_version: SigVersion,
    ) -> bool {
        if full_sig.is_empty() {
            return false;
        }
        let sig = match TransactionSignature::from_bytes(full_sig) {
            Ok(s) => s,
            Err(_) => return false,
        };
        let key = match PublicKey::from_bytes(pub_key) {
            Ok(k) => k,
            Err(_) => return false,
        };
        let hash = match signature_hash(
            self.tx,
            self.input_index,
            script_code,
            self.amount,
            sig.sighash_type(),
            sig_version,
            self.hashes,
        ) {
            Ok(h) => h,
            Err(_) => return false,
        };
        key.verify(&hash, sig.signature())
    }

    fn lock_time(&self) -> u32 {
        self.tx.lock_time
    }

    fn tx_version(&self) -> i32 {
        self.tx.version as i32
    }

    fn input_sequence(&self) -> u32 {
        self.tx
            .inputs
            .get(self.input_index)
            .map_or(SEQUENCE_FINAL, |i| i.sequence)
    }
}
