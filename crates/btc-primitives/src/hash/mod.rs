//! Digests used by script opcodes and transaction hashing.

use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256};

fn digest<D: Digest, const N: usize>(data: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&D::digest(data));
    out
}

/// SHA-1, reachable only through `OP_SHA1`.
pub fn sha1(data: &[u8]) -> [u8; 20] {
    digest::<Sha1, 20>(data)
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    digest::<Sha256, 32>(data)
}

/// SHA-256 applied twice. Transaction IDs and signature hashes use it.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    digest::<Ripemd160, 20>(data)
}

/// RIPEMD-160 of SHA-256: the commitment behind P2PKH, P2SH and P2WPKH.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    ripemd160(&sha256(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        let data: &[u8] = b"this is the data I want to hash";
        let cases: [(&str, Vec<u8>, &str); 10] = [
            ("sha1 empty", sha1(b"").to_vec(), "da39a3ee5e6b4b0d3255bfef95601890afd80709"),
            ("sha1", sha1(b"I am a test").to_vec(), "c3207bbe306d89116d4058320b086296a43b8964"),
            (
                "sha256 empty",
                sha256(b"").to_vec(),
                "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
            ),
            (
                "sha256",
                sha256(data).to_vec(),
                "f88eec7ecabf88f9a64c4100cac1e0c0c4581100492137d1b656ea626cad63e3",
            ),
            (
                "sha256d empty",
                sha256d(b"").to_vec(),
                "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456",
            ),
            (
                "sha256d",
                sha256d(data).to_vec(),
                "2209ddda5914a3fbad507ff2284c4b6e559c18a669f9fc3ad3b5826a2a999d58",
            ),
            ("ripemd160 empty", ripemd160(b"").to_vec(), "9c1185a5c5e9fc54612808977ee8f548b2258d31"),
            (
                "ripemd160",
                ripemd160(b"I am a test").to_vec(),
                "09a23f506b4a37cabab8a9e49b541de582fca96b",
            ),
            ("hash160 empty", hash160(b"").to_vec(), "b472a266d0bd89c13706a4132ccfb16f7c3b9fcb"),
            ("hash160", hash160(data).to_vec(), "e7fb13ef86fef4203f042fbfc2703fa628301e90"),
        ];
        for (name, got, want) in cases {
            assert_eq!(hex::encode(got), want, "{}", name);
        }
    }
}
