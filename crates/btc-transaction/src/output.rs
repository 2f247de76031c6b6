//! Outputs: an amount and the script that locks it.

use btc_primitives::util::{ByteReader, ByteWriter};
use btc_script::Script;

use crate::transaction::decoding;
use crate::TransactionError;

/// Encoded as `value (8 bytes LE) | scriptPubKey (var bytes)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionOutput {
    /// Satoshis. The wire field is a signed 64-bit amount; decoding
    /// refuses values that would be negative.
    pub value: u64,

    pub script_pubkey: Script,
}

impl TransactionOutput {
    pub fn new(value: u64, script_pubkey: Script) -> Self {
        TransactionOutput {
            value,
            script_pubkey,
        }
    }

    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let value = decoding(reader.read_u64_le(), "output value")?;
        if value > i64::MAX as u64 {
            return Err(TransactionError::SerializationError(format!(
                "output value {} is negative as a signed amount",
                value as i64
            )));
        }
        let script = decoding(reader.read_var_bytes(), "scriptPubKey")?;
        Ok(TransactionOutput::new(value, Script::from_bytes(script)))
    }

    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_u64_le(self.value);
        writer.write_var_bytes(self.script_pubkey.to_bytes());
    }

    /// The encoding hashed into BIP143 `hashOutputs`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.write_to(&mut writer);
        writer.into_bytes()
    }
}
