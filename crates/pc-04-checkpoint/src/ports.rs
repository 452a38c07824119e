//! # Ports
//!
//! The checkpoint engine's two I/O seams: peers that co-sign checkpoint
//! hashes, and the Bitcoin anchor sink.

use async_trait::async_trait;
use thiserror::Error;

use shared_types::{Checkpoint, DeadlineError, OperatorSignature};

/// Gather peer signatures over a checkpoint hash.
///
/// Implementations query the other federation operators; failures are
/// surfaced, never silently retried. The local operator's own signature is
/// the engine's job.
#[async_trait]
pub trait CheckpointSigner: Send + Sync {
    async fn gather_signatures(
        &self,
        checkpoint: &Checkpoint,
    ) -> Result<Vec<OperatorSignature>, SignerGatewayError>;
}

#[derive(Debug, Clone, Error)]
pub enum SignerGatewayError {
    #[error(transparent)]
    Deadline(#[from] DeadlineError),
    #[error("peer signing failed: {0}")]
    Peer(String),
}

/// A broadcast Bitcoin transaction carrying the commitment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnchorTx {
    pub txid: String,
    pub raw_tx: Vec<u8>,
}

/// Confirmation data for an anchored transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnchorConfirmation {
    pub block_height: u64,
    pub block_hash: String,
}

#[derive(Debug, Clone, Error)]
pub enum AnchorError {
    #[error(transparent)]
    Deadline(#[from] DeadlineError),
    #[error("anchor rpc failed: {0}")]
    Rpc(String),
}

/// Submit checkpoint commitments into Bitcoin and look up confirmations.
#[async_trait]
pub trait AnchorSink: Send + Sync {
    /// Broadcast a transaction whose single OP_RETURN output is `script`.
    async fn submit_checkpoint_anchor(
        &self,
        checkpoint: &Checkpoint,
        script: &[u8],
    ) -> Result<AnchorTx, AnchorError>;

    /// Confirmation state of a previously submitted anchor, if any.
    async fn confirmation_lookup(
        &self,
        txid: &str,
    ) -> Result<Option<AnchorConfirmation>, AnchorError>;
}
