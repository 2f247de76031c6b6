//! Input signing.
//!
//! An `InputSigner` qualifies the scripts guarding one input, recovers any
//! signatures already present on it, adds new ones and serializes the result
//! back into a scriptSig and witness. A `TxSigner` holds one `InputSigner`
//! per input and shares a single set of precomputed BIP143 hashes between
//! them.
//!
//! The signed template may sit behind `OP_CHECKLOCKTIMEVERIFY` and
//! `OP_CHECKSEQUENCEVERIFY` prefixes. Unless `SignerOptions` says otherwise,
//! an input whose locks the transaction cannot satisfy is refused up front.

use btc_primitives::ec::{PrivateKey, PublicKey};
use btc_script::interpreter::{verify_script, ScriptFlags, SigVersion};
use btc_script::{
    classify, split_time_locks, FullyQualifiedScript, OutputSolution, ScriptType, SigValues,
    SignData, TimeLock,
};

use crate::checker::TransactionSignatureChecker;
use crate::output::TransactionOutput;
use crate::sighash::{signature_hash, PrecomputedHashes, SigHashType};
use crate::signature::TransactionSignature;
use crate::transaction::Transaction;
use crate::TransactionError;

/// Flags used to verify signatures when `SignData` sets no policy.
pub const DEFAULT_SIGNER_FLAGS: ScriptFlags = ScriptFlags(
    ScriptFlags::P2SH.0
        | ScriptFlags::DERSIG.0
        | ScriptFlags::CHECKLOCKTIMEVERIFY.0
        | ScriptFlags::CHECKSEQUENCEVERIFY.0
        | ScriptFlags::WITNESS.0,
);

/// Templates the signer can solve, once any lock time prefix is removed.
const SIGNABLE: [ScriptType; 3] = [
    ScriptType::PayToPubkeyHash,
    ScriptType::PayToPubkey,
    ScriptType::Multisig,
];

/// Behaviour switches shared by `InputSigner` and `TxSigner`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignerOptions {
    /// Write a partially signed multisig input with one item per key, empty
    /// where the key has not signed, and read such inputs back by position.
    pub pad_unsigned_multisigs: bool,
    /// Treat script keys that are not valid curve points as absent instead
    /// of refusing the input.
    pub tolerate_invalid_public_key: bool,
    /// Refuse an input whose lock time checks the transaction cannot pass.
    pub check_time_locks: bool,
}

impl Default for SignerOptions {
    fn default() -> Self {
        SignerOptions {
            pad_unsigned_multisigs: false,
            tolerate_invalid_public_key: false,
            check_time_locks: true,
        }
    }
}

/// Progress of an input towards being fully signed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignerState {
    /// No signer has been set up for the input.
    Unclassified,
    /// Scripts are qualified but no signature is present.
    Solved,
    /// Some but not all required signatures are present.
    PartiallySigned,
    /// Every required signature is present.
    FullySigned,
}

/// Signs a single transaction input.
#[derive(Clone, Debug)]
pub struct InputSigner<'a> {
    tx: &'a Transaction,
    hashes: &'a PrecomputedHashes,
    input_index: usize,
    txout: TransactionOutput,
    flags: ScriptFlags,
    options: SignerOptions,
    qualified: FullyQualifiedScript,
    time_locks: Vec<TimeLock>,
    solution: OutputSolution,
    public_keys: Vec<Option<PublicKey>>,
    signatures: Vec<Option<TransactionSignature>>,
    required_sigs: usize,
}

impl<'a> InputSigner<'a> {
    /// Set up a signer for input `input_index` of `tx`, which spends `txout`,
    /// with the default options.
    ///
    /// Signatures already on the input are extracted and verified.
    ///
    /// # Errors
    /// `Unsignable` for script types the signer does not handle,
    /// qualification failures as `Script` errors,
    /// `InvalidExistingSignature` if a present signature does not verify, and
    /// `TimeLock` if a lock time check in the script cannot pass.
    pub fn new(
        tx: &'a Transaction,
        hashes: &'a PrecomputedHashes,
        input_index: usize,
        txout: &TransactionOutput,
        sign_data: &SignData,
    ) -> Result<Self, TransactionError> {
        Self::with_options(
            tx,
            hashes,
            input_index,
            txout,
            sign_data,
            SignerOptions::default(),
        )
    }

    /// As [`InputSigner::new`], with explicit `options`.
    pub fn with_options(
        tx: &'a Transaction,
        hashes: &'a PrecomputedHashes,
        input_index: usize,
        txout: &TransactionOutput,
        sign_data: &SignData,
        options: SignerOptions,
    ) -> Result<Self, TransactionError> {
        let input = tx.inputs.get(input_index).ok_or_else(|| {
            TransactionError::InvalidTransaction(format!(
                "input index {} out of range (tx has {} inputs)",
                input_index,
                tx.inputs.len()
            ))
        })?;

        let qualified = FullyQualifiedScript::from_tx_data(
            &txout.script_pubkey,
            &input.script_sig,
            &input.witness,
            sign_data,
        )?;
        let (time_locks, body) = split_time_locks(qualified.sign_script().script());
        let solution = classify(&body);
        if !SIGNABLE.contains(&solution.script_type()) {
            return Err(TransactionError::Unsignable(format!(
                "{} type {}",
                sign_level(&qualified),
                solution.script_type()
            )));
        }

        let flags = sign_data
            .signature_policy()
            .unwrap_or(DEFAULT_SIGNER_FLAGS);
        if options.check_time_locks {
            let checker = TransactionSignatureChecker::new(tx, input_index, txout.value);
            for lock in &time_locks {
                lock.check(&checker, flags)
                    .map_err(|e| TransactionError::TimeLock(e.to_string()))?;
            }
        }

        let parse_key = |bytes: &[u8]| match PublicKey::from_bytes(bytes) {
            Ok(key) => Ok(Some(key)),
            Err(_) if options.tolerate_invalid_public_key => Ok(None),
            Err(e) => Err(TransactionError::Unsignable(format!(
                "invalid public key in script: {}",
                e
            ))),
        };
        let (public_keys, required_sigs) = match &solution {
            OutputSolution::Multisig { m, keys } => (
                keys.iter()
                    .map(|k| parse_key(k))
                    .collect::<Result<Vec<_>, _>>()?,
                *m,
            ),
            OutputSolution::PayToPubkey(key) => (vec![parse_key(key)?], 1),
            _ => (vec![None], 1),
        };

        let mut signer = InputSigner {
            tx,
            hashes,
            input_index,
            txout: txout.clone(),
            flags,
            options,
            signatures: vec![None; public_keys.len()],
            public_keys,
            qualified,
            time_locks,
            solution,
            required_sigs,
        };

        let stack = signer
            .qualified
            .extract_stack(&input.script_sig, &input.witness)?;
        signer.extract_signatures(stack)?;

        log::debug!(
            "input {}: {} script with {} time locks, {} of {} signatures present",
            input_index,
            signer.solution.script_type(),
            signer.time_locks.len(),
            signer.sig_count(),
            signer.required_sigs
        );
        Ok(signer)
    }

    fn extract_signatures(&mut self, stack: Vec<Vec<u8>>) -> Result<(), TransactionError> {
        match self.solution.clone() {
            OutputSolution::PayToPubkeyHash(hash) => {
                if stack.len() < 2 {
                    return Ok(());
                }
                let sig_bytes = &stack[stack.len() - 2];
                let key_bytes = &stack[stack.len() - 1];
                let key = PublicKey::from_bytes(key_bytes).map_err(|e| {
                    TransactionError::InvalidExistingSignature(format!("public key: {}", e))
                })?;
                if key.to_bytes() != *key_bytes || key.hash160() != hash {
                    return Err(TransactionError::InvalidExistingSignature(
                        "public key does not match the key hash".to_string(),
                    ));
                }
                let sig = self.parse_existing(sig_bytes)?;
                if !self.check_signature(&sig, &key) {
                    return Err(TransactionError::InvalidExistingSignature(
                        "signature does not verify".to_string(),
                    ));
                }
                self.public_keys[0] = Some(key);
                self.signatures[0] = Some(sig);
            }
            OutputSolution::PayToPubkey(_) => {
                let Some(sig_bytes) = stack.last() else {
                    return Ok(());
                };
                let sig = self.parse_existing(sig_bytes)?;
                let verified = self.public_keys[0]
                    .as_ref()
                    .is_some_and(|key| self.check_signature(&sig, key));
                if !verified {
                    return Err(TransactionError::InvalidExistingSignature(
                        "signature does not verify".to_string(),
                    ));
                }
                self.signatures[0] = Some(sig);
            }
            OutputSolution::Multisig { m, keys } => {
                let padded = self.options.pad_unsigned_multisigs
                    && stack.len() == keys.len() + 1
                    && stack[1..].iter().any(Vec::is_empty);
                if padded {
                    self.extract_padded(&stack[1..])?;
                } else {
                    // The bottom item is the dummy consumed by OP_CHECKMULTISIG
                    let count = m.min(stack.len().saturating_sub(1));
                    let candidates = &stack[stack.len() - count..];
                    self.sort_multisig(candidates)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Read a padded multisig: one item per key in script order, empty where
    /// the key has not signed.
    fn extract_padded(&mut self, slots: &[Vec<u8>]) -> Result<(), TransactionError> {
        let present = slots.iter().filter(|s| !s.is_empty()).count();
        if present >= self.required_sigs {
            return Err(TransactionError::InvalidExistingSignature(
                "padding on a fully signed multisig".to_string(),
            ));
        }
        for (k, sig_bytes) in slots.iter().enumerate() {
            if sig_bytes.is_empty() {
                continue;
            }
            let sig = self.parse_existing(sig_bytes)?;
            let verified = self.public_keys[k]
                .as_ref()
                .is_some_and(|key| self.check_signature(&sig, key));
            if !verified {
                return Err(TransactionError::InvalidExistingSignature(format!(
                    "padded signature {} does not verify",
                    k
                )));
            }
            self.signatures[k] = Some(sig);
        }
        Ok(())
    }

    /// Match signatures to keys in script order, the way OP_CHECKMULTISIG
    /// consumes them.
    fn sort_multisig(&mut self, candidates: &[Vec<u8>]) -> Result<(), TransactionError> {
        let mut ikey = 0;
        for sig_bytes in candidates.iter().filter(|s| !s.is_empty()) {
            let sig = self.parse_existing(sig_bytes)?;
            let matched = (ikey..self.public_keys.len()).find(|&k| {
                self.public_keys[k]
                    .as_ref()
                    .is_some_and(|key| self.check_signature(&sig, key))
            });
            match matched {
                Some(k) => {
                    self.signatures[k] = Some(sig);
                    ikey = k + 1;
                }
                None => {
                    return Err(TransactionError::InvalidExistingSignature(
                        "multisig signature matches no remaining key".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }

    fn parse_existing(&self, bytes: &[u8]) -> Result<TransactionSignature, TransactionError> {
        TransactionSignature::from_bytes(bytes)
            .map_err(|e| TransactionError::InvalidExistingSignature(e.to_string()))
    }

    fn check_signature(&self, sig: &TransactionSignature, key: &PublicKey) -> bool {
        match self.signature_hash(sig.sighash_type()) {
            Ok(hash) => key.verify(&hash, sig.signature()),
            Err(_) => false,
        }
    }

    /// The signature hash for this input under `sighash_type`.
    pub fn signature_hash(&self, sighash_type: SigHashType) -> Result<[u8; 32], TransactionError> {
        signature_hash(
            self.tx,
            self.input_index,
            self.qualified.sign_script().script(),
            self.txout.value,
            sighash_type,
            self.qualified.sig_version(),
            Some(self.hashes),
        )
    }

    /// Sign with `key`, filling the slot for its public key.
    ///
    /// Signing an input that is already fully signed, or a slot that already
    /// holds a signature, does nothing.
    ///
    /// # Errors
    /// `WrongKey` if the key does not belong to the script (state is left
    /// unchanged), `UncompressedKeyInWitness` for an uncompressed key in a
    /// witness script, `InvalidSigHashType` for an undefined sighash type.
    pub fn sign(&mut self, key: &PrivateKey, sighash_type: SigHashType) -> Result<(), TransactionError> {
        if !sighash_type.is_defined() {
            return Err(TransactionError::InvalidSigHashType(sighash_type.value()));
        }
        if self.is_fully_signed() {
            return Ok(());
        }
        if self.qualified.sig_version() == SigVersion::WitnessV0 && !key.is_compressed() {
            return Err(TransactionError::UncompressedKeyInWitness);
        }

        let pub_key = key.pub_key();
        let slots: Vec<usize> = match &self.solution {
            OutputSolution::PayToPubkeyHash(hash) if pub_key.hash160() == *hash => vec![0],
            OutputSolution::PayToPubkey(bytes) if pub_key.to_bytes() == *bytes => vec![0],
            OutputSolution::Multisig { keys, .. } => keys
                .iter()
                .enumerate()
                .filter(|(_, k)| **k == pub_key.to_bytes())
                .map(|(i, _)| i)
                .collect(),
            _ => Vec::new(),
        };
        if slots.is_empty() {
            return Err(TransactionError::WrongKey);
        }

        let hash = self.signature_hash(sighash_type)?;
        let signature = TransactionSignature::new(key.sign(&hash)?, sighash_type);
        for slot in slots {
            if self.signatures[slot].is_none() {
                self.signatures[slot] = Some(signature.clone());
            }
            if self.public_keys[slot].is_none() {
                self.public_keys[slot] = Some(pub_key.clone());
            }
        }

        log::debug!(
            "input {}: signed with {:?}, {} of {} signatures",
            self.input_index,
            sighash_type,
            self.sig_count(),
            self.required_sigs
        );
        Ok(())
    }

    /// Encode the signatures held so far as a scriptSig and witness.
    pub fn serialize_signatures(&self) -> SigValues {
        let mut stack = Vec::new();
        match self.solution.script_type() {
            ScriptType::PayToPubkeyHash => {
                if let (Some(sig), Some(key)) = (&self.signatures[0], &self.public_keys[0]) {
                    stack.push(sig.to_bytes());
                    stack.push(key.to_bytes());
                }
            }
            ScriptType::PayToPubkey => {
                if let Some(sig) = &self.signatures[0] {
                    stack.push(sig.to_bytes());
                }
            }
            ScriptType::Multisig => {
                stack.push(Vec::new());
                if self.options.pad_unsigned_multisigs && !self.is_fully_signed() {
                    stack.extend(
                        self.signatures
                            .iter()
                            .map(|s| s.as_ref().map(TransactionSignature::to_bytes).unwrap_or_default()),
                    );
                } else {
                    stack.extend(self.signatures.iter().flatten().map(|s| s.to_bytes()));
                }
            }
            _ => {}
        }
        self.qualified.encode_stack(stack)
    }

    /// Run the script interpreter over the serialized signatures.
    pub fn verify(&self) -> bool {
        let mut flags = self.flags | ScriptFlags::P2SH;
        if self.qualified.sig_version() == SigVersion::WitnessV0 {
            flags |= ScriptFlags::WITNESS;
        }
        let values = self.serialize_signatures();
        let checker = TransactionSignatureChecker::new(self.tx, self.input_index, self.txout.value)
            .with_precomputed(self.hashes);
        verify_script(
            &values.script_sig,
            &self.txout.script_pubkey,
            &values.witness,
            flags,
            &checker,
        )
        .is_ok()
    }

    pub fn input_index(&self) -> usize {
        self.input_index
    }

    pub fn qualified_script(&self) -> &FullyQualifiedScript {
        &self.qualified
    }

    pub fn sig_version(&self) -> SigVersion {
        self.qualified.sig_version()
    }

    /// Lock time checks guarding the signed template, in script order.
    pub fn time_locks(&self) -> &[TimeLock] {
        &self.time_locks
    }

    pub fn required_sigs(&self) -> usize {
        self.required_sigs
    }

    /// Signatures in key order; `None` where a key has not signed.
    pub fn signatures(&self) -> &[Option<TransactionSignature>] {
        &self.signatures
    }

    /// Keys expected by the script. A P2PKH key is unknown until it signs.
    pub fn public_keys(&self) -> &[Option<PublicKey>] {
        &self.public_keys
    }

    pub fn sig_count(&self) -> usize {
        self.signatures.iter().flatten().count()
    }

    pub fn is_fully_signed(&self) -> bool {
        self.sig_count() >= self.required_sigs
    }

    pub fn state(&self) -> SignerState {
        match self.sig_count() {
            0 => SignerState::Solved,
            n if n < self.required_sigs => SignerState::PartiallySigned,
            _ => SignerState::FullySigned,
        }
    }
}

/// Name the script level that holds the signed template.
fn sign_level(qualified: &FullyQualifiedScript) -> &'static str {
    if qualified.is_p2wsh() {
        "witness script"
    } else if qualified.is_p2sh() {
        "redeem script"
    } else {
        "scriptPubKey"
    }
}

/// Signs every input of a transaction.
///
/// Signers are created on first use and keep their own state, so inputs can
/// be signed in any order and by several keys.
#[derive(Clone, Debug)]
pub struct TxSigner<'a> {
    tx: &'a Transaction,
    hashes: &'a PrecomputedHashes,
    options: SignerOptions,
    signers: Vec<Option<InputSigner<'a>>>,
}

impl<'a> TxSigner<'a> {
    /// `hashes` must be computed from `tx`.
    pub fn new(tx: &'a Transaction, hashes: &'a PrecomputedHashes) -> Self {
        TxSigner {
            tx,
            hashes,
            options: SignerOptions::default(),
            signers: vec![None; tx.inputs.len()],
        }
    }

    /// Options for every input signer created from now on.
    pub fn with_options(mut self, options: SignerOptions) -> Self {
        self.options = options;
        self
    }

    /// The signer for input `index`, creating it on first use.
    pub fn input(
        &mut self,
        index: usize,
        txout: &TransactionOutput,
        sign_data: &SignData,
    ) -> Result<&mut InputSigner<'a>, TransactionError> {
        let (tx, hashes, options) = (self.tx, self.hashes, self.options);
        let slot = self.signers.get_mut(index).ok_or_else(|| {
            TransactionError::InvalidTransaction(format!(
                "input index {} out of range (tx has {} inputs)",
                index,
                tx.inputs.len()
            ))
        })?;
        if slot.is_none() {
            *slot = Some(InputSigner::with_options(
                tx, hashes, index, txout, sign_data, options,
            )?);
        }
        slot.as_mut().ok_or_else(|| {
            TransactionError::InvalidTransaction(format!("no signer for input {}", index))
        })
    }

    /// Sign input `index` with `key`.
    pub fn sign(
        &mut self,
        index: usize,
        key: &PrivateKey,
        txout: &TransactionOutput,
        sign_data: &SignData,
        sighash_type: SigHashType,
    ) -> Result<(), TransactionError> {
        self.input(index, txout, sign_data)?.sign(key, sighash_type)
    }

    pub fn state(&self, index: usize) -> SignerState {
        match self.signers.get(index) {
            Some(Some(signer)) => signer.state(),
            _ => SignerState::Unclassified,
        }
    }

    /// Report whether every input has a signer and each is fully signed.
    pub fn is_fully_signed(&self) -> bool {
        self.signers
            .iter()
            .all(|s| s.as_ref().is_some_and(InputSigner::is_fully_signed))
    }

    /// Build the signed transaction. Inputs without a signer keep their
    /// existing scriptSig and witness.
    pub fn get(self) -> Transaction {
        let mut tx = self.tx.clone();
        for (input, signer) in tx.inputs.iter_mut().zip(&self.signers) {
            if let Some(signer) = signer {
                let values = signer.serialize_signatures();
                input.script_sig = values.script_sig;
                input.witness = values.witness;
            }
        }
        tx
    }
}
