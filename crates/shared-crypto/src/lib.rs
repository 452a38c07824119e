//! # Shared Crypto - Cryptographic Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256 | Event ids, Merkle nodes, scores |
//! | `ecdsa` | secp256k1 | Actor and operator signatures |
//! | `address` | HASH160 + base58check | Wallet identity |
//! | `merkle` | Binary SHA-256 tree | Checkpoint commitments |
//!
//! ## Security Properties
//!
//! - **secp256k1**: RFC 6979 deterministic nonces, low-S normalization
//! - **Verification**: returns `false` on malformed untrusted inputs,
//!   never panics

#![warn(clippy::all)]

pub mod address;
pub mod ecdsa;
pub mod errors;
pub mod hashing;
pub mod merkle;

// Re-exports
pub use address::{hash160, key_matches_address, p2pkh_address};
pub use ecdsa::{verify_digest, Secp256k1KeyPair, Secp256k1PublicKey, Secp256k1Signature};
pub use errors::CryptoError;
pub use hashing::{sha256, sha256_concat, sha256d, Hash, Sha256Hasher};
pub use merkle::{build_proof, merkle_root, verify_proof, Position, ProofNode};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
