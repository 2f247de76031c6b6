use proptest::prelude::*;

use btc_script::interpreter::{eval_push_only, ScriptNumber};
use btc_script::{classify, OutputSolution, Script};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn script_number_encode_decode_roundtrip(val in -0x7FFFFFFFi64..=0x7FFFFFFFi64) {
        let sn = ScriptNumber::new(val);
        let sn2 = ScriptNumber::decode(&sn.encode(), 4, true).unwrap();
        prop_assert_eq!(sn2.to_i64(), val);
        prop_assert_eq!(sn, sn2);
    }

    #[test]
    fn script_bytes_roundtrip(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let script = Script::from_bytes(&data);
        prop_assert_eq!(&data[..], script.to_bytes());
    }

    #[test]
    fn push_all_yields_items(items in prop::collection::vec(prop::collection::vec(any::<u8>(), 2..300), 0..8)) {
        // Items of two or more bytes are never rewritten as small-int opcodes.
        let script = Script::push_all(&items);
        prop_assert!(script.is_push_only());
        prop_assert_eq!(eval_push_only(&script).unwrap(), items);
    }

    #[test]
    fn classify_never_panics(data in prop::collection::vec(any::<u8>(), 0..128)) {
        let script = Script::from_bytes(&data);
        let _ = classify(&script);
    }

    #[test]
    fn p2sh_classifies_to_its_hash(hash in prop::array::uniform20(any::<u8>())) {
        let script = Script::p2sh(&hash);
        prop_assert_eq!(classify(&script), OutputSolution::PayToScriptHash(hash));
    }
}
