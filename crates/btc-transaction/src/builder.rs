//! Piece-by-piece transaction construction.

use btc_primitives::chainhash::Hash;
use btc_script::Script;

use crate::input::{OutPoint, TransactionInput};
use crate::output::TransactionOutput;
use crate::transaction::Transaction;

/// Builds a `Transaction`, consumed by `build`.
///
/// ```
/// use btc_primitives::chainhash::Hash;
/// use btc_script::Script;
/// use btc_transaction::TxBuilder;
///
/// let tx = TxBuilder::new()
///     .input(Hash::new([0x41; 32]), 0)
///     .output(50, Script::p2pkh(&[0u8; 20]))
///     .build();
/// assert_eq!(tx.input_count(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct TxBuilder {
    version: Option<u32>,
    inputs: Vec<TransactionInput>,
    outputs: Vec<TransactionOutput>,
    lock_time: u32,
}

impl TxBuilder {
    /// Start an empty version 1 transaction.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    /// Spend output `vout` of transaction `txid`, with a final sequence.
    pub fn input(self, txid: Hash, vout: u32) -> Self {
        self.input_with(TransactionInput::new(OutPoint::new(txid, vout)))
    }

    /// Add a fully specified input, e.g. with a custom sequence.
    pub fn input_with(mut self, input: TransactionInput) -> Self {
        self.inputs.push(input);
        self
    }

    /// Spend output `vout` of `tx`.
    pub fn spend_output_from(self, tx: &Transaction, vout: u32) -> Self {
        self.input(tx.tx_id(), vout)
    }

    pub fn output(mut self, value: u64, script_pubkey: Script) -> Self {
        self.outputs.push(TransactionOutput::new(value, script_pubkey));
        self
    }

    pub fn lock_time(mut self, lock_time: u32) -> Self {
        self.lock_time = lock_time;
        self
    }

    pub fn build(self) -> Transaction {
        Transaction {
            version: self.version.unwrap_or(1),
            inputs: self.inputs,
            outputs: self.outputs,
            lock_time: self.lock_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let tx = TxBuilder::new().build();
        assert_eq!(tx, Transaction::new());
    }

    #[test]
    fn test_spend_output_from() {
        let funding = TxBuilder::new()
            .input(Hash::new([0x41; 32]), 0)
            .output(50, Script::new())
            .build();
        let tx = TxBuilder::new()
            .version(2)
            .spend_output_from(&funding, 0)
            .lock_time(100)
            .build();
        assert_eq!(tx.version, 2);
        assert_eq!(tx.lock_time, 100);
        assert_eq!(tx.inputs[0].prev_out, OutPoint::new(funding.tx_id(), 0));
        assert_eq!(tx.inputs[0].sequence, crate::input::SEQUENCE_FINAL);
    }
}
