//! Wire encoding helpers: CompactSize integers and a byte cursor pair.
//!
//! Every multi-byte integer on the wire is little-endian. Lengths and counts
//! use the CompactSize encoding (`VarInt`), which must be minimal.

use crate::PrimitivesError;

/// A CompactSize unsigned integer.
///
/// | Value range           | Encoding              |
/// |-----------------------|-----------------------|
/// | `0..=0xfc`            | 1 byte                |
/// | `0xfd..=0xffff`       | `0xfd` + 2 bytes LE   |
/// | `0x10000..=0xffffffff`| `0xfe` + 4 bytes LE   |
/// | larger                | `0xff` + 8 bytes LE   |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarInt(pub u64);

impl VarInt {
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Number of bytes the encoding takes.
    pub fn encoded_len(&self) -> usize {
        match self.0 {
            0..=0xfc => 1,
            0xfd..=0xffff => 3,
            0x1_0000..=0xffff_ffff => 5,
            _ => 9,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        match self.encoded_len() {
            1 => out.push(self.0 as u8),
            3 => {
                out.push(0xfd);
                out.extend_from_slice(&(self.0 as u16).to_le_bytes());
            }
            5 => {
                out.push(0xfe);
                out.extend_from_slice(&(self.0 as u32).to_le_bytes());
            }
            _ => {
                out.push(0xff);
                out.extend_from_slice(&self.0.to_le_bytes());
            }
        }
        out
    }
}

impl From<u64> for VarInt {
    fn from(v: u64) -> Self {
        VarInt(v)
    }
}

impl From<usize> for VarInt {
    fn from(v: usize) -> Self {
        VarInt(v as u64)
    }
}

/// Reads wire data from a borrowed slice, front to back.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

macro_rules! read_le {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self) -> Result<$ty, PrimitivesError> {
            let mut buf = [0u8; std::mem::size_of::<$ty>()];
            let n = buf.len();
            buf.copy_from_slice(self.read_bytes(n)?);
            Ok(<$ty>::from_le_bytes(buf))
        }
    };
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0 }
    }

    /// Take the next `n` bytes, or fail without consuming anything.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], PrimitivesError> {
        if n > self.remaining() {
            return Err(PrimitivesError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, PrimitivesError> {
        let b = self.peek_u8()?;
        self.pos += 1;
        Ok(b)
    }

    read_le!(read_u32_le, u32);
    read_le!(read_u64_le, u64);

    /// Read a CompactSize integer, rejecting non-minimal encodings.
    pub fn read_varint(&mut self) -> Result<VarInt, PrimitivesError> {
        let (value, min) = match self.read_u8()? {
            0xfd => {
                let mut buf = [0u8; 2];
                buf.copy_from_slice(self.read_bytes(2)?);
                (u16::from_le_bytes(buf) as u64, 0xfd)
            }
            0xfe => (self.read_u32_le()? as u64, 0x1_0000),
            0xff => (self.read_u64_le()?, 0x1_0000_0000),
            b => return Ok(VarInt(b as u64)),
        };
        if value < min {
            return Err(PrimitivesError::NonCanonicalVarInt);
        }
        Ok(VarInt(value))
    }

    /// Read a CompactSize length followed by that many bytes.
    pub fn read_var_bytes(&mut self) -> Result<&'a [u8], PrimitivesError> {
        let len = self.read_varint()?.value();
        if len > self.remaining() as u64 {
            return Err(PrimitivesError::UnexpectedEof);
        }
        self.read_bytes(len as usize)
    }

    pub fn peek_u8(&self) -> Result<u8, PrimitivesError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(PrimitivesError::UnexpectedEof)
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

/// Accumulates wire data into an owned buffer.
#[derive(Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ByteWriter {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, val: u8) {
        self.buf.push(val);
    }

    pub fn write_u32_le(&mut self, val: u32) {
        self.write_bytes(&val.to_le_bytes());
    }

    pub fn write_u64_le(&mut self, val: u64) {
        self.write_bytes(&val.to_le_bytes());
    }

    pub fn write_varint(&mut self, varint: VarInt) {
        self.write_bytes(&varint.to_bytes());
    }

    /// Write a CompactSize length prefix, then the bytes.
    pub fn write_var_bytes(&mut self, bytes: &[u8]) {
        self.write_varint(VarInt::from(bytes.len()));
        self.write_bytes(bytes);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_encoding_boundaries() {
        let cases: [(u64, &str); 9] = [
            (0, "00"),
            (1, "01"),
            (0xfc, "fc"),
            (0xfd, "fdfd00"),
            (0xffff, "fdffff"),
            (0x1_0000, "fe00000100"),
            (0xffff_ffff, "feffffffff"),
            (0x1_0000_0000, "ff0000000001000000"),
            (u64::MAX, "ffffffffffffffffff"),
        ];
        for (value, hex_str) in cases {
            let vi = VarInt(value);
            assert_eq!(hex::encode(vi.to_bytes()), hex_str, "encode {}", value);
            assert_eq!(vi.encoded_len(), hex_str.len() / 2);

            let bytes = hex::decode(hex_str).unwrap();
            let mut reader = ByteReader::new(&bytes);
            assert_eq!(reader.read_varint().unwrap(), vi, "decode {}", value);
            assert_eq!(reader.remaining(), 0);
        }
    }

    #[test]
    fn test_varint_rejects_short_and_non_minimal() {
        let bad: [&[u8]; 5] = [
            &[],
            &[0xfd, 0x01],
            &[0xfd, 0x05, 0x00],
            &[0xfe, 0xff, 0xff, 0x00, 0x00],
            &[0xff, 0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0],
        ];
        for bytes in bad {
            assert!(ByteReader::new(bytes).read_varint().is_err(), "{:02x?}", bytes);
        }
        assert!(matches!(
            ByteReader::new(&[0xfd, 0x05, 0x00]).read_varint(),
            Err(PrimitivesError::NonCanonicalVarInt)
        ));
    }

    #[test]
    fn test_reader_writer_fields() {
        let mut writer = ByteWriter::with_capacity(32);
        assert!(writer.is_empty());
        writer.write_u8(0x42);
        writer.write_u32_le(0xDEADBEEF);
        writer.write_u64_le(0x0102030405060708);
        writer.write_varint(VarInt(300));
        writer.write_var_bytes(b"abc");
        writer.write_var_bytes(&[]);
        assert_eq!(writer.len(), 1 + 4 + 8 + 3 + 4 + 1);

        let data = writer.into_bytes();
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u8().unwrap(), 0x42);
        assert_eq!(reader.read_u32_le().unwrap(), 0xDEADBEEF);
        assert_eq!(reader.read_u64_le().unwrap(), 0x0102030405060708);
        assert_eq!(reader.read_varint().unwrap(), VarInt(300));
        assert_eq!(reader.peek_u8().unwrap(), 3);
        assert_eq!(reader.read_var_bytes().unwrap(), b"abc");
        assert_eq!(reader.read_var_bytes().unwrap(), b"");
        assert!(reader.read_u8().is_err());
    }

    #[test]
    fn test_reader_does_not_overrun() {
        let mut reader = ByteReader::new(&[0x05, 0x01, 0x02]);
        assert!(reader.read_var_bytes().is_err());

        let mut reader = ByteReader::new(&[0x01, 0x02, 0x03]);
        assert!(reader.read_u32_le().is_err());
        assert_eq!(reader.remaining(), 3);
    }
}
