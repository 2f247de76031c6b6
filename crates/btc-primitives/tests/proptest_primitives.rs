use proptest::prelude::*;

use btc_primitives::chainhash::Hash;
use btc_primitives::ec::private_key::PrivateKey;
use btc_primitives::ec::public_key::PublicKey;
use btc_primitives::ec::signature::Signature;
use btc_primitives::hash::sha256d;
use btc_primitives::util::{ByteReader, ByteWriter, VarInt};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn public_key_form_survives_reparse(
        seed in prop::array::uniform32(any::<u8>()),
        compressed in any::<bool>()
    ) {
        // Not all 32-byte arrays are valid private keys (must be < curve order, nonzero).
        if let Ok(pk) = PrivateKey::from_bytes(&seed) {
            let pub_key = pk.with_compression(compressed).pub_key();
            let reparsed = PublicKey::from_bytes(&pub_key.to_bytes()).unwrap();
            prop_assert_eq!(reparsed.is_compressed(), compressed);
            prop_assert_eq!(reparsed.hash160(), pub_key.hash160());
        }
    }

    #[test]
    fn ecdsa_sign_is_deterministic_and_verifies(
        seed in prop::array::uniform32(any::<u8>()),
        msg in prop::collection::vec(any::<u8>(), 0..256)
    ) {
        if let Ok(pk) = PrivateKey::from_bytes(&seed) {
            let hash = sha256d(&msg);
            let sig = pk.sign(&hash).unwrap();
            let again = pk.sign(&hash).unwrap();
            prop_assert_eq!(sig.to_der(), again.to_der());
            prop_assert!(sig.is_low_s());
            let parsed = Signature::from_der(&sig.to_der()).unwrap();
            prop_assert!(pk.pub_key().verify(&hash, &parsed));
        }
    }

    #[test]
    fn hash_hex_roundtrip(bytes in prop::array::uniform32(any::<u8>())) {
        let hash = Hash::new(bytes);
        let hash2 = Hash::from_hex(&hash.to_string()).unwrap();
        prop_assert_eq!(hash, hash2);
    }

    #[test]
    fn varint_reads_back_what_was_written(v in any::<u64>()) {
        let mut writer = ByteWriter::new();
        writer.write_varint(VarInt(v));
        let data = writer.into_bytes();
        prop_assert_eq!(data.len(), VarInt(v).encoded_len());
        let mut reader = ByteReader::new(&data);
        prop_assert_eq!(reader.read_varint().unwrap(), VarInt(v));
        prop_assert_eq!(reader.remaining(), 0);
    }
}
