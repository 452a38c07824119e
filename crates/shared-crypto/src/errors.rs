//! # Error Types

use thiserror::Error;

/// Errors from cryptographic operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Public key bytes are not a valid compressed secp256k1 point.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// Secret key bytes are out of range for the curve.
    #[error("invalid private key")]
    InvalidPrivateKey,

    /// Signature bytes are malformed.
    #[error("invalid signature encoding")]
    InvalidSignature,

    /// Signature does not verify under the given key.
    #[error("signature verification failed")]
    SignatureVerificationFailed,

    /// Merkle proof requested for a leaf outside the set.
    #[error("leaf index {index} out of range for {leaf_count} leaves")]
    LeafOutOfRange { index: usize, leaf_count: usize },
}
