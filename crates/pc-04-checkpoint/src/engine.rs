//! # Checkpoint Engine
//!
//! Periodically commits the run of freshly admitted events: build the
//! Merkle commitment, gather M operator signatures, persist, and anchor
//! into Bitcoin via OP_RETURN.
//!
//! Anchor-sink failures retry with exponential backoff; signature
//! gathering does not (a quorum shortfall is surfaced, never papered
//! over).

use std::sync::Arc;
use std::time::Duration;

use pc_01_event_store::{EventStore, KeyValueStore, TimeSource};
use shared_crypto::Secp256k1KeyPair;
use shared_types::{
    tally_signatures, Checkpoint, CoreConfig, DeadlineError, OperatorId, OperatorRegistry,
    OperatorSignature, StoreError,
};
use thiserror::Error;
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::builder::build_unsigned;
use crate::op_return::op_return_script;
use crate::ports::{AnchorError, AnchorSink, CheckpointSigner, SignerGatewayError};

/// Deadline for each anchor RPC call.
const RPC_DEADLINE: Duration = Duration::from_secs(30);
/// Anchor submission retries (exponential backoff, starting here).
const ANCHOR_BACKOFF_BASE: Duration = Duration::from_secs(1);
const ANCHOR_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("checkpoint quorum not met: {valid} valid of {required}")]
    Quorum { valid: usize, required: usize },
    #[error(transparent)]
    SignerGateway(#[from] SignerGatewayError),
    #[error(transparent)]
    Anchor(#[from] AnchorError),
    #[error(transparent)]
    Deadline(#[from] DeadlineError),
}

/// The local operator's signing identity.
pub struct LocalSigner {
    pub operator_id: OperatorId,
    pub keypair: Secp256k1KeyPair,
}

impl LocalSigner {
    fn sign(&self, checkpoint: &Checkpoint) -> OperatorSignature {
        OperatorSignature {
            operator_id: self.operator_id.clone(),
            public_key: *self.keypair.public_key().as_bytes(),
            signature: *self.keypair.sign_digest(&checkpoint.checkpoint_hash()).as_bytes(),
        }
    }
}

/// Periodic checkpoint/anchor driver.
pub struct CheckpointEngine<S, G, A, T>
where
    S: KeyValueStore,
    G: CheckpointSigner,
    A: AnchorSink,
    T: TimeSource,
{
    store: Arc<EventStore<S>>,
    peers: G,
    anchor: A,
    time: T,
    local: LocalSigner,
    registry: OperatorRegistry,
    config: CoreConfig,
}

impl<S, G, A, T> CheckpointEngine<S, G, A, T>
where
    S: KeyValueStore,
    G: CheckpointSigner,
    A: AnchorSink,
    T: TimeSource,
{
    pub fn new(
        store: Arc<EventStore<S>>,
        peers: G,
        anchor: A,
        time: T,
        local: LocalSigner,
        registry: OperatorRegistry,
        config: CoreConfig,
    ) -> Self {
        Self {
            store,
            peers,
            anchor,
            time,
            local,
            registry,
            config,
        }
    }

    /// Run the periodic loop until `shutdown` flips to true.
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = interval(Duration::from_millis(self.config.checkpoint_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_once().await {
                        Ok(Some(checkpoint)) => {
                            info!(
                                checkpoint_id = %checkpoint.checkpoint_id,
                                events = checkpoint.event_count,
                                anchored = checkpoint.is_anchored(),
                                "checkpoint committed"
                            );
                        }
                        Ok(None) => debug!("no events since previous checkpoint"),
                        Err(err) => warn!(error = %err, "checkpoint cycle failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("checkpoint engine stopping");
                        return;
                    }
                }
            }
        }
    }

    /// One full cycle: build, sign to quorum, persist, anchor.
    pub async fn run_once(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        let Some(mut checkpoint) = build_unsigned(&self.store, self.time.now_ms())? else {
            return Ok(None);
        };
        let hash = checkpoint.checkpoint_hash();

        // Local signature first, then the peer round. One round only.
        let mut signatures = vec![self.local.sign(&checkpoint)];
        signatures.extend(self.peers.gather_signatures(&checkpoint).await?);

        let tally = tally_signatures(&hash, &signatures, &self.registry);
        if !tally.meets(self.config.quorum_m) {
            return Err(CheckpointError::Quorum {
                valid: tally.valid,
                required: self.config.quorum_m,
            });
        }
        checkpoint.operator_signatures = signatures;
        self.store.put_checkpoint(&checkpoint)?;

        match self.anchor_with_backoff(&checkpoint).await {
            Ok(anchored) => {
                checkpoint = anchored;
                self.store.put_checkpoint(&checkpoint)?;
                if let Some(txid) = &checkpoint.bitcoin_tx_id {
                    self.decorate_covered_events(&checkpoint, txid)?;
                }
            }
            Err(err) => {
                // The signed checkpoint stands; anchoring can be retried
                // next cycle by an operator-side sweep.
                warn!(
                    checkpoint_id = %checkpoint.checkpoint_id,
                    error = %err,
                    "anchoring failed after retries"
                );
            }
        }
        Ok(Some(checkpoint))
    }

    /// Stamp the anchor txid onto every event the checkpoint covers, so
    /// served chains carry their anchor status.
    fn decorate_covered_events(
        &self,
        checkpoint: &Checkpoint,
        txid: &str,
    ) -> Result<(), CheckpointError> {
        let Some(from) = self.store.event_admission_seq(&checkpoint.from_event_hash)? else {
            return Ok(());
        };
        let Some(to) = self.store.event_admission_seq(&checkpoint.to_event_hash)? else {
            return Ok(());
        };
        let ids = self.store.admitted_range(from, to + 1)?;
        self.store.decorate_anchor(&ids, txid)?;
        Ok(())
    }

    async fn anchor_with_backoff(
        &self,
        checkpoint: &Checkpoint,
    ) -> Result<Checkpoint, CheckpointError> {
        let script = op_return_script(
            &checkpoint.checkpoint_hash(),
            &checkpoint.operator_signatures,
        );

        let mut backoff = ANCHOR_BACKOFF_BASE;
        let mut last_err: Option<CheckpointError> = None;
        for attempt in 1..=ANCHOR_ATTEMPTS {
            let submit = timeout(
                RPC_DEADLINE,
                self.anchor.submit_checkpoint_anchor(checkpoint, &script),
            )
            .await;
            match submit {
                Ok(Ok(tx)) => {
                    let mut anchored = checkpoint.clone();
                    anchored.bitcoin_tx_id = Some(tx.txid.clone());
                    if let Ok(Ok(Some(confirmation))) =
                        timeout(RPC_DEADLINE, self.anchor.confirmation_lookup(&tx.txid)).await
                    {
                        anchored.block_height = Some(confirmation.block_height);
                        anchored.anchored_at = Some(self.time.now_ms());
                    }
                    return Ok(anchored);
                }
                Ok(Err(err)) => {
                    debug!(attempt, error = %err, "anchor submission failed");
                    last_err = Some(err.into());
                }
                Err(_) => {
                    debug!(attempt, "anchor submission timed out");
                    last_err =
                        Some(DeadlineError::Rpc("submit_checkpoint_anchor".into()).into());
                }
            }
            if attempt < ANCHOR_ATTEMPTS {
                sleep(backoff).await;
                backoff *= 2;
            }
        }
        Err(last_err.expect("at least one attempt ran"))
    }
}
