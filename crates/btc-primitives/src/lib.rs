//! Bitcoin SDK - cryptographic primitives, hashing and wire encoding.
//!
//! This crate provides the foundational building blocks shared by the
//! script and transaction crates:
//! - Hash functions (SHA-1, SHA-256, SHA-256d, RIPEMD-160, Hash160)
//! - Chain hash type for transaction identification
//! - secp256k1 keys and ECDSA signatures with RFC6979 nonces
//! - Variable-length integer encoding and byte reader/writer

pub mod hash;
pub mod chainhash;
pub mod util;
pub mod ec;

mod error;
pub use error::PrimitivesError;
