#![deny(missing_docs)]

//! Bitcoin SDK - Complete SDK.
//!
//! Re-exports the primitives, script and transaction crates for convenient
//! single-crate usage.
//!
//! ```
//! use btc_sdk::primitives::chainhash::Hash;
//! use btc_sdk::primitives::ec::PrivateKey;
//! use btc_sdk::script::{Script, SignData};
//! use btc_sdk::transaction::{PrecomputedHashes, SigHashType, TxBuilder, TxSigner};
//!
//! let key = PrivateKey::new();
//! let funding = TxBuilder::new()
//!     .input(Hash::new([0x41; 32]), 0)
//!     .output(50, Script::p2pkh(&key.pub_key().hash160()))
//!     .build();
//! let spend = TxBuilder::new().spend_output_from(&funding, 0).build();
//!
//! let hashes = PrecomputedHashes::new(&spend);
//! let mut signer = TxSigner::new(&spend, &hashes);
//! let input = signer.input(0, &funding.outputs[0], &SignData::new()).unwrap();
//! input.sign(&key, SigHashType::ALL).unwrap();
//! assert!(input.verify());
//! let signed = signer.get();
//! assert!(!signed.inputs[0].script_sig.is_empty());
//! ```

pub use btc_primitives as primitives;
pub use btc_script as script;
pub use btc_transaction as transaction;
