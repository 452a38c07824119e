//! # Checkpoint Commitment
//!
//! A signed Merkle commitment over a contiguous run of admitted events,
//! intended for anchoring into Bitcoin.

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::canonical::ObjectBuilder;
use crate::entities::{Hash, OperatorSignature, Timestamp};
use shared_crypto::hashing::sha256;

/// A checkpoint over the events admitted since the previous one.
///
/// `operatorSignatures` and the three anchor fields are excluded from the
/// checkpoint hash; they are filled in after the hash is fixed.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// Lowercase hex of [`Checkpoint::checkpoint_hash`].
    pub checkpoint_id: String,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub from_event_hash: Hash,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub to_event_hash: Hash,
    pub event_count: u64,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub merkle_root: Hash,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub previous_checkpoint_hash: Hash,
    pub timestamp: Timestamp,
    pub operator_signatures: Vec<OperatorSignature>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bitcoin_tx_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub block_height: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub anchored_at: Option<Timestamp>,
}

impl Checkpoint {
    /// Canonical bytes the operators sign: the checkpoint without
    /// `checkpointId`, `operatorSignatures`, `bitcoinTxId`, `blockHeight`,
    /// and `anchoredAt`.
    pub fn signing_bytes(&self) -> Vec<u8> {
        ObjectBuilder::new()
            .hex("fromEventHash", &self.from_event_hash)
            .hex("toEventHash", &self.to_event_hash)
            .uint("eventCount", self.event_count)
            .hex("merkleRoot", &self.merkle_root)
            .hex("previousCheckpointHash", &self.previous_checkpoint_hash)
            .uint("timestamp", self.timestamp)
            .build()
            .encode()
    }

    /// The 32-byte hash operators sign and the OP_RETURN payload commits to.
    pub fn checkpoint_hash(&self) -> Hash {
        sha256(&self.signing_bytes())
    }

    /// Seed material for committee selection:
    /// `H(merkleRoot || previousCheckpointHash || timestamp-bucket)`,
    /// where the bucket is the checkpoint interval the timestamp falls in.
    pub fn checkpoint_root(&self, interval_ms: u64) -> Hash {
        let bucket = if interval_ms == 0 {
            self.timestamp
        } else {
            self.timestamp / interval_ms
        };
        let mut preimage = Vec::with_capacity(72);
        preimage.extend_from_slice(&self.merkle_root);
        preimage.extend_from_slice(&self.previous_checkpoint_hash);
        preimage.extend_from_slice(&bucket.to_be_bytes());
        sha256(&preimage)
    }

    pub fn is_anchored(&self) -> bool {
        self.bitcoin_tx_id.is_some()
    }
}
