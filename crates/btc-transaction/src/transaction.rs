//! The transaction type and its wire formats.
//!
//! Legacy encoding: `version | inputs | outputs | lock_time`. BIP144 adds a
//! `0x00 0x01` marker and flag after the version and one witness stack per
//! input before the lock time. A transaction is written in the extended
//! form only when some input has a witness.

use btc_primitives::chainhash::{double_hash_h, Hash};
use btc_primitives::util::{ByteReader, ByteWriter, VarInt};
use btc_primitives::PrimitivesError;
use btc_script::interpreter::SigVersion;
use btc_script::Script;

use crate::input::TransactionInput;
use crate::output::TransactionOutput;
use crate::sighash::{self, SigHashType};
use crate::TransactionError;

const WITNESS_MARKER: u8 = 0x00;
const WITNESS_FLAG: u8 = 0x01;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Read as signed by OP_CHECKSEQUENCEVERIFY.
    pub version: u32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    /// Block height below 500000000, Unix time otherwise.
    pub lock_time: u32,
}

/// Attach the field being decoded to a reader failure.
pub(crate) fn decoding<T>(
    result: Result<T, PrimitivesError>,
    field: &str,
) -> Result<T, TransactionError> {
    result.map_err(|e| TransactionError::SerializationError(format!("{}: {}", field, e)))
}

/// Read a collection length, rejecting counts the remaining bytes cannot
/// hold. Every element is at least one byte long.
pub(crate) fn read_count(reader: &mut ByteReader, field: &str) -> Result<usize, TransactionError> {
    let count = decoding(reader.read_varint(), field)?.value();
    match usize::try_from(count) {
        Ok(n) if n <= reader.remaining() => Ok(n),
        _ => Err(TransactionError::SerializationError(format!(
            "{}: {} entries with {} bytes left",
            field,
            count,
            reader.remaining()
        ))),
    }
}

impl Transaction {
    /// Version 1, no inputs or outputs, lock time 0.
    pub fn new() -> Self {
        Transaction {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| TransactionError::SerializationError(format!("hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Decode exactly one transaction; trailing bytes are an error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = ByteReader::new(bytes);
        let tx = Self::read_from(&mut reader)?;
        match reader.remaining() {
            0 => Ok(tx),
            n => Err(TransactionError::SerializationError(format!(
                "{} bytes after the lock time",
                n
            ))),
        }
    }

    /// Decode either format.
    ///
    /// A zero input count is taken as the witness marker. It must be
    /// followed by flag `0x01`, and at least one witness must be non-empty.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let version = decoding(reader.read_u32_le(), "version")?;

        let extended = decoding(reader.peek_u8(), "input count")? == WITNESS_MARKER;
        if extended {
            decoding(reader.read_u8(), "witness marker")?;
            let flag = decoding(reader.read_u8(), "witness flag")?;
            if flag != WITNESS_FLAG {
                return Err(TransactionError::SerializationError(format!(
                    "witness flag is {:#04x}, expected 0x01",
                    flag
                )));
            }
        }

        let inputs = (0..read_count(reader, "input count")?)
            .map(|_| TransactionInput::read_from(reader))
            .collect::<Result<Vec<_>, _>>()?;
        let outputs = (0..read_count(reader, "output count")?)
            .map(|_| TransactionOutput::read_from(reader))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = Transaction {
            version,
            inputs,
            outputs,
            lock_time: 0,
        };

        if extended {
            for input in &mut tx.inputs {
                input.read_witness(reader)?;
            }
            if !tx.has_witness() {
                return Err(TransactionError::SerializationError(
                    "extended format with every witness empty".to_string(),
                ));
            }
        }

        tx.lock_time = decoding(reader.read_u32_le(), "lock time")?;
        Ok(tx)
    }

    fn encode(&self, with_witness: bool) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(64 + 150 * self.inputs.len());
        w.write_u32_le(self.version);
        if with_witness {
            w.write_bytes(&[WITNESS_MARKER, WITNESS_FLAG]);
        }
        w.write_varint(VarInt::from(self.inputs.len()));
        self.inputs.iter().for_each(|i| i.write_to(&mut w));
        w.write_varint(VarInt::from(self.outputs.len()));
        self.outputs.iter().for_each(|o| o.write_to(&mut w));
        if with_witness {
            self.inputs.iter().for_each(|i| i.write_witness(&mut w));
        }
        w.write_u32_le(self.lock_time);
        w.into_bytes()
    }

    /// Extended format if any input has a witness, legacy otherwise.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode(self.has_witness())
    }

    /// Legacy format; witnesses are dropped.
    pub fn to_bytes_no_witness(&self) -> Vec<u8> {
        self.encode(false)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|i| !i.witness.is_empty())
    }

    /// Double SHA-256 of the legacy encoding. Unaffected by witnesses.
    pub fn tx_id(&self) -> Hash {
        double_hash_h(&self.to_bytes_no_witness())
    }

    /// Double SHA-256 of the full encoding.
    pub fn wtx_id(&self) -> Hash {
        double_hash_h(&self.to_bytes())
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn total_output_value(&self) -> u64 {
        self.outputs.iter().map(|o| o.value).sum()
    }

    /// Encoded size in bytes, witnesses included.
    pub fn size(&self) -> usize {
        self.to_bytes().len()
    }

    /// Signature hash of input `input_index` without cached midstates.
    /// `amount` only matters for witness inputs.
    pub fn signature_hash(
        &self,
        input_index: usize,
        script_code: &Script,
        amount: u64,
        sighash_type: SigHashType,
        sig_version: SigVersion,
    ) -> Result<[u8; 32], TransactionError> {
        sighash::signature_hash(
            self,
            input_index,
            script_code,
            amount,
            sighash_type,
            sig_version,
            None,
        )
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl serde::Serialize for Transaction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Transaction {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Transaction::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
