//! # Bitcoin-Style Addresses
//!
//! Wallet owners are identified by P2PKH addresses derived from their
//! secp256k1 keys. Actor signatures carry the public key; admission checks
//! that the derived address matches the wallet on record.

use ripemd::Ripemd160;
use sha2::Digest;

use crate::hashing::{sha256, sha256d};

/// P2PKH version byte for mainnet addresses.
const P2PKH_VERSION: u8 = 0x00;

/// `RIPEMD-160(SHA-256(pubkey))`.
pub fn hash160(public_key: &[u8; 33]) -> [u8; 20] {
    let sha = sha256(public_key);
    let mut ripemd = Ripemd160::new();
    ripemd.update(sha);
    ripemd.finalize().into()
}

/// Derive the base58check P2PKH address for a compressed public key.
pub fn p2pkh_address(public_key: &[u8; 33]) -> String {
    let mut payload = [0u8; 25];
    payload[0] = P2PKH_VERSION;
    payload[1..21].copy_from_slice(&hash160(public_key));
    let checksum = sha256d(&payload[..21]);
    payload[21..].copy_from_slice(&checksum[..4]);
    bs58::encode(payload).into_string()
}

/// Check that a compressed public key derives the given address.
pub fn key_matches_address(public_key: &[u8; 33], address: &str) -> bool {
    p2pkh_address(public_key) == address
}
