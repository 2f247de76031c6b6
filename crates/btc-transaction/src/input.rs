//! Inputs and the outpoints they spend.

use btc_primitives::chainhash::Hash;
use btc_primitives::util::{ByteReader, ByteWriter};
use btc_script::Script;

use crate::transaction::{decoding, read_count};
use crate::TransactionError;

/// Opts the input out of lock-time and relative lock-time rules.
pub const SEQUENCE_FINAL: u32 = 0xFFFF_FFFF;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct OutPoint {
    /// Transaction ID in internal byte order.
    pub txid: Hash,
    /// Index of the output within that transaction.
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Hash, vout: u32) -> Self {
        OutPoint { txid, vout }
    }

    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_bytes(self.txid.as_bytes());
        writer.write_u32_le(self.vout);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionInput {
    pub prev_out: OutPoint,

    /// Empty until signed.
    pub script_sig: Script,

    pub sequence: u32,

    /// Witness stack, bottom item first. Empty for legacy inputs.
    pub witness: Vec<Vec<u8>>,
}

impl TransactionInput {
    /// Create an unsigned input spending `prev_out` with a final sequence.
    pub fn new(prev_out: OutPoint) -> Self {
        TransactionInput {
            prev_out,
            script_sig: Script::new(),
            sequence: SEQUENCE_FINAL,
            witness: Vec::new(),
        }
    }

    /// Decode `txid | vout | scriptSig | sequence`. The witness comes
    /// later in the stream and is read by the transaction.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let txid = Hash::from_bytes(decoding(reader.read_bytes(32), "previous txid")?)?;
        let vout = decoding(reader.read_u32_le(), "previous output index")?;
        let script_sig = Script::from_bytes(decoding(reader.read_var_bytes(), "scriptSig")?);
        let sequence = decoding(reader.read_u32_le(), "sequence")?;
        Ok(TransactionInput {
            prev_out: OutPoint::new(txid, vout),
            script_sig,
            sequence,
            witness: Vec::new(),
        })
    }

    pub(crate) fn read_witness(&mut self, reader: &mut ByteReader) -> Result<(), TransactionError> {
        self.witness = (0..read_count(reader, "witness item count")?)
            .map(|_| decoding(reader.read_var_bytes(), "witness item").map(<[u8]>::to_vec))
            .collect::<Result<_, _>>()?;
        Ok(())
    }

    /// Encode everything but the witness.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        self.prev_out.write_to(writer);
        writer.write_var_bytes(self.script_sig.to_bytes());
        writer.write_u32_le(self.sequence);
    }

    pub fn write_witness(&self, writer: &mut ByteWriter) {
        writer.write_varint(self.witness.len().into());
        for item in &self.witness {
            writer.write_var_bytes(item);
        }
    }
}
