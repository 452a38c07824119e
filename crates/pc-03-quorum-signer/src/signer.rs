//! # Quorum Signer
//!
//! Builds candidate events, co-signs peers' candidates, and accumulates
//! signatures until a candidate reaches M and can be admitted.
//!
//! Operators never have to agree on which candidates to sign; conflicting
//! candidates at the same `(itemId, height)` are possible, and this signer
//! refuses to sign a second one once it has signed the first. Divergence
//! that slips through anyway is the client verifier's problem to detect.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use pc_01_event_store::{KeyValueStore, TimeSource};
use pc_02_admission::{AdmissionPipeline, AdmissionReceipt};
use shared_crypto::Secp256k1KeyPair;
use shared_types::{
    AdmissionError, Event, EventDraft, EventHeader, EventPayload, Hash, ItemId, OperatorId,
    OperatorSignature, ZERO_HASH,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pending::PendingCandidates;

/// Default bound on in-flight candidates.
const DEFAULT_PENDING_CAPACITY: usize = 4_096;

/// Errors from proposing, signing, or collecting.
#[derive(Debug, Error)]
pub enum SignerError {
    /// The candidate failed pre-quorum validation.
    #[error(transparent)]
    Admission(#[from] AdmissionError),

    /// This operator already signed a different candidate at the same
    /// `(itemId, height)`.
    #[error("already signed a conflicting candidate for {item_id} at height {height}")]
    ConflictingCandidate { item_id: ItemId, height: u64 },

    /// A draft for an item event did not name its item.
    #[error("draft for {0} must name an item")]
    MissingItem(&'static str),
}

/// Outcome of merging a candidate's signature set.
#[derive(Debug)]
pub enum CollectOutcome {
    /// The candidate reached quorum and was admitted.
    Admitted(AdmissionReceipt),
    /// Still short of quorum; kept pending.
    Pending { valid: usize, required: usize },
}

/// One operator's signing service.
pub struct QuorumSigner<S: KeyValueStore, T: TimeSource> {
    operator_id: OperatorId,
    keypair: Secp256k1KeyPair,
    pipeline: Arc<AdmissionPipeline<S, T>>,
    time: T,
    pending: PendingCandidates,
    /// `(itemId, height)` pairs this operator has signed, with the id it
    /// signed and when, so conflicting candidates can be refused and the
    /// map can be reaped alongside the pending buffer.
    signed_heights: Mutex<HashMap<(ItemId, u64), (Hash, u64)>>,
}

impl<S: KeyValueStore, T: TimeSource + Clone> QuorumSigner<S, T> {
    pub fn new(
        operator_id: OperatorId,
        keypair: Secp256k1KeyPair,
        pipeline: Arc<AdmissionPipeline<S, T>>,
        time: T,
    ) -> Self {
        Self {
            operator_id,
            keypair,
            pipeline,
            time,
            pending: PendingCandidates::new(DEFAULT_PENDING_CAPACITY),
            signed_heights: Mutex::new(HashMap::new()),
        }
    }

    pub fn operator_id(&self) -> &OperatorId {
        &self.operator_id
    }

    pub fn pipeline(&self) -> &Arc<AdmissionPipeline<S, T>> {
        &self.pipeline
    }

    /// Build a full candidate from a draft: assign the chain position,
    /// stamp the time, compute the id, and attach this operator's
    /// signature.
    ///
    /// The returned event carries the draft's actor signature verbatim;
    /// when the actor signs the event id, they do so against the id fixed
    /// here and replace that field before submission.
    pub fn propose(&self, draft: EventDraft) -> Result<Event, SignerError> {
        self.reap();
        let now = self.time.now_ms();

        let (item_id, height, previous) = match &draft.payload {
            EventPayload::ManufacturerRegistered { manufacturer_id, .. } => {
                (ItemId::from(manufacturer_id), 1, ZERO_HASH)
            }
            EventPayload::AuthenticatorRegistered { authenticator_id, .. } => {
                (ItemId::from(authenticator_id), 1, ZERO_HASH)
            }
            EventPayload::ItemMinted { manufacturer_id, metadata_hash, .. } => {
                let registration_id = self
                    .pipeline
                    .store()
                    .log_event_id(&ItemId::from(manufacturer_id), 1)
                    .map_err(AdmissionError::from)?
                    .ok_or_else(|| {
                        AdmissionError::Registry(format!(
                            "manufacturer {manufacturer_id} not registered"
                        ))
                    })?;
                let item_id = ItemId::derive(manufacturer_id, metadata_hash, now);
                (item_id, 2, registration_id)
            }
            _ => {
                let item_id = draft
                    .item_id
                    .clone()
                    .ok_or(SignerError::MissingItem("item event"))?;
                let item = self
                    .pipeline
                    .store()
                    .item(&item_id)
                    .map_err(AdmissionError::from)?
                    .ok_or_else(|| {
                        AdmissionError::from(shared_types::ChainViolation::UnknownItem(
                            item_id.to_string(),
                        ))
                    })?;
                (item_id, item.last_event_height + 1, item.last_event_hash)
            }
        };

        let mut event = Event {
            header: EventHeader {
                event_id: ZERO_HASH,
                item_id,
                height,
                timestamp: now,
                previous_event_hash: previous,
                actor_signature: draft.actor_signature,
                operator_signatures: vec![],
                anchor_tx_hash: None,
            },
            payload: draft.payload,
        };
        event.header.event_id = event.compute_event_id();
        let signature = self.sign_id(&event.header.event_id);
        self.record_signed(&event)?;
        event.header.operator_signatures.push(signature);

        debug!(
            item_id = %event.header.item_id,
            height = event.header.height,
            event_id = %hex::encode(event.header.event_id),
            "candidate proposed"
        );
        Ok(event)
    }

    /// Co-sign a peer's candidate after validating it end to end (all
    /// admission checks short of quorum).
    pub fn sign(&self, event: &Event) -> Result<OperatorSignature, SignerError> {
        self.reap();
        self.pipeline.validate_candidate(event)?;
        self.record_signed(event)?;
        Ok(self.sign_id(&event.header.event_id))
    }

    /// Merge an incoming candidate (with whatever signatures it carries)
    /// into the pending buffer; admit once M distinct signatures are
    /// present.
    pub fn collect(&self, incoming: Event) -> Result<CollectOutcome, SignerError> {
        self.reap();
        let now = self.time.now_ms();
        let merged = self.pending.merge(incoming, now);

        let tally = shared_types::tally_signatures(
            &merged.header.event_id,
            &merged.header.operator_signatures,
            self.pipeline.operators(),
        );
        let required = self.pipeline.config().quorum_m;
        if tally.valid < required {
            debug!(
                valid = tally.valid,
                required,
                event_id = %hex::encode(merged.header.event_id),
                "candidate below quorum"
            );
            return Ok(CollectOutcome::Pending { valid: tally.valid, required });
        }

        match self.pipeline.admit(&merged) {
            Ok(receipt) => {
                self.pending.remove(&merged.header.event_id);
                info!(
                    event_id = %hex::encode(receipt.event_id),
                    height = receipt.height,
                    "candidate reached quorum and was admitted"
                );
                Ok(CollectOutcome::Admitted(receipt))
            }
            Err(err) => {
                warn!(
                    event_id = %hex::encode(merged.header.event_id),
                    error = %err,
                    "quorum candidate failed admission"
                );
                self.pending.remove(&merged.header.event_id);
                Err(err.into())
            }
        }
    }

    /// Number of candidates currently pending.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn sign_id(&self, event_id: &Hash) -> OperatorSignature {
        OperatorSignature {
            operator_id: self.operator_id.clone(),
            public_key: *self.keypair.public_key().as_bytes(),
            signature: *self.keypair.sign_digest(event_id).as_bytes(),
        }
    }

    /// Remember the `(itemId, height)` we signed; refuse conflicts.
    fn record_signed(&self, event: &Event) -> Result<(), SignerError> {
        let key = (event.header.item_id.clone(), event.header.height);
        let mut signed = self.signed_heights.lock();
        match signed.get(&key) {
            Some((signed_id, _)) if *signed_id != event.header.event_id => {
                Err(SignerError::ConflictingCandidate {
                    item_id: key.0,
                    height: key.1,
                })
            }
            _ => {
                signed.insert(key, (event.header.event_id, self.time.now_ms()));
                Ok(())
            }
        }
    }

    /// Evict expired candidates and stale signed-height records.
    fn reap(&self) {
        let now = self.time.now_ms();
        let window = self.pipeline.config().max_past_clock_skew_ms;
        self.pending.reap(now, window);
        self.signed_heights
            .lock()
            .retain(|_, (_, at)| now.saturating_sub(*at) <= window);
    }
}
