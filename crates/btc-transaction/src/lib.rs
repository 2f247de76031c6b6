//! Bitcoin transactions, signature hashing and input signing.
//!
//! Provides the `Transaction` type with its legacy and BIP144 wire formats,
//! the legacy and BIP143 signature hash algorithms, a signature checker that
//! connects the script interpreter to a transaction, and signers that fill
//! in scriptSigs and witnesses for P2PK, P2PKH, multisig, P2SH, P2WPKH and
//! P2WSH inputs.

pub mod transaction;
pub mod input;
pub mod output;
pub mod sighash;
pub mod signature;
pub mod checker;
pub mod signer;
pub mod builder;

mod error;
pub use error::TransactionError;
pub use transaction::Transaction;
pub use input::{OutPoint, TransactionInput};
pub use output::TransactionOutput;
pub use sighash::{PrecomputedHashes, SigHashType};
pub use signature::TransactionSignature;
pub use checker::TransactionSignatureChecker;
pub use signer::{InputSigner, SignerOptions, SignerState, TxSigner, DEFAULT_SIGNER_FLAGS};
pub use builder::TxBuilder;
