//! # ECDSA Signatures (secp256k1)
//!
//! Actor and operator signatures over 32-byte digests, using the secp256k1
//! curve.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Low-S normalization
//! - Verification returns `false` on malformed inputs, never panics

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use zeroize::Zeroize;

use crate::errors::CryptoError;
use crate::hashing::Hash;

/// Compressed secp256k1 public key (33 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Secp256k1PublicKey([u8; 33]);

impl Secp256k1PublicKey {
    /// Create from compressed bytes (33 bytes, starting with 0x02 or 0x03).
    pub fn from_bytes(bytes: [u8; 33]) -> Result<Self, CryptoError> {
        VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Get raw compressed bytes.
    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    /// Verify a signature over a 32-byte digest.
    pub fn verify_digest(
        &self,
        digest: &Hash,
        signature: &Secp256k1Signature,
    ) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;
        let sig =
            Signature::from_slice(&signature.0).map_err(|_| CryptoError::InvalidSignature)?;
        verifying_key
            .verify_prehash(digest, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

/// ECDSA signature (64 bytes, r||s format).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Secp256k1Signature([u8; 64]);

impl Secp256k1Signature {
    /// Create from bytes (64 bytes).
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

/// secp256k1 ECDSA keypair.
#[derive(Clone)]
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Create from a lowercase hex secret. The intermediate buffer is wiped.
    pub fn from_hex(secret_hex: &str) -> Result<Self, CryptoError> {
        if secret_hex.len() != 64 {
            return Err(CryptoError::InvalidPrivateKey);
        }
        let mut bytes = [0u8; 32];
        decode_hex_into(secret_hex, &mut bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let result = Self::from_bytes(bytes);
        bytes.zeroize();
        result
    }

    /// Get public key (compressed, 33 bytes).
    pub fn public_key(&self) -> Secp256k1PublicKey {
        let verifying_key = self.signing_key.verifying_key();
        let sec1_bytes = verifying_key.to_sec1_bytes();
        // SEC1 compressed public key is always exactly 33 bytes.
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(&sec1_bytes[..33]);
        Secp256k1PublicKey(bytes)
    }

    /// Sign a 32-byte digest (deterministic RFC 6979, low-S).
    pub fn sign_digest(&self, digest: &Hash) -> Secp256k1Signature {
        let sig: Signature = self
            .signing_key
            .sign_prehash(digest)
            .expect("prehash signing of a 32-byte digest cannot fail");
        let sig = sig.normalize_s().unwrap_or(sig);
        Secp256k1Signature(sig.to_bytes().into())
    }
}

/// Verify a signature over a 32-byte digest, tolerating malformed inputs.
///
/// This is the verification entry point for untrusted wire data: any
/// malformed key or signature yields `false`.
pub fn verify_digest(public_key: &[u8; 33], digest: &Hash, signature: &[u8; 64]) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_sec1_bytes(public_key) else {
        return false;
    };
    let Ok(sig) = Signature::from_slice(signature) else {
        return false;
    };
    verifying_key.verify_prehash(digest, &sig).is_ok()
}

fn decode_hex_into(input: &str, out: &mut [u8]) -> Result<(), ()> {
    let bytes = input.as_bytes();
    if bytes.len() != out.len() * 2 {
        return Err(());
    }
    for (i, chunk) in bytes.chunks_exact(2).enumerate() {
        let hi = hex_nibble(chunk[0])?;
        let lo = hex_nibble(chunk[1])?;
        out[i] = (hi << 4) | lo;
    }
    Ok(())
}

fn hex_nibble(b: u8) -> Result<u8, ()> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        _ => Err(()),
    }
}
