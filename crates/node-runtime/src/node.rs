//! # Operator Node
//!
//! Wires one operator's subsystems into a single value: event store,
//! admission pipeline, quorum signer, committee bookkeeping, and the
//! checkpoint-engine builder. The transport layer calls the methods here;
//! there are no ambient singletons, and each test constructs its own
//! node.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use pc_01_event_store::{EventStore, KeyValueStore, SystemTimeSource, TimeSource};
use pc_02_admission::{AcceptRecordedProofs, AdmissionPipeline, PaymentVerifier};
use pc_03_quorum_signer::{CollectOutcome, QuorumSigner, SignerError};
use pc_04_checkpoint::{AnchorSink, CheckpointEngine, CheckpointSigner, LocalSigner};
use pc_05_committee::{
    distribute_fees, is_active, select_committee, CommitteeError, CommitteeSeat, FeePayout,
    OperatorActivity,
};
use pc_06_client_verifier::ItemProofResponse;
use shared_crypto::Secp256k1KeyPair;
use shared_types::{
    AdmissionError, AuthenticationAttestation, Authenticator, Checkpoint, CoreConfig, Event,
    EventDraft, Item, ItemId, Manufacturer, OfferId, Operator, OperatorId, OperatorRegistry,
    OperatorSignature, RegistryStatus, StoreError, ZERO_HASH,
};
use tracing::info;

use crate::container::NodeConfig;

/// Wire-shaped outcome of `submit_event`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One operator's complete core engine.
pub struct OperatorNode<S: KeyValueStore> {
    operator_id: OperatorId,
    keypair: Secp256k1KeyPair,
    store: Arc<EventStore<S>>,
    pipeline: Arc<AdmissionPipeline<S, SystemTimeSource>>,
    signer: QuorumSigner<S, SystemTimeSource>,
    registry: OperatorRegistry,
    config: CoreConfig,
    activities: Mutex<HashMap<OperatorId, OperatorActivity>>,
}

impl<S: KeyValueStore> OperatorNode<S> {
    /// Build a node from its validated configuration and a storage
    /// backend.
    pub fn new(config: &NodeConfig, backend: S) -> anyhow::Result<Self> {
        config.validate()?;
        Self::with_payment_verifier(config, backend, Arc::new(AcceptRecordedProofs))
    }

    /// Same, with an injected payment verifier.
    pub fn with_payment_verifier(
        config: &NodeConfig,
        backend: S,
        payments: Arc<dyn PaymentVerifier>,
    ) -> anyhow::Result<Self> {
        let keypair = config.keypair()?;
        let registry = OperatorRegistry::new(config.roster()?);
        let operator_id = OperatorId::new(config.identity.operator_id.clone());
        let store = Arc::new(EventStore::new(backend));
        let pipeline = Arc::new(AdmissionPipeline::new(
            store.clone(),
            registry.clone(),
            config.core.clone(),
            SystemTimeSource,
            payments,
        ));
        let signer = QuorumSigner::new(
            operator_id.clone(),
            keypair.clone(),
            pipeline.clone(),
            SystemTimeSource,
        );
        info!(
            operator_id = %operator_id,
            quorum = format!("{}-of-{}", config.core.quorum_m, config.core.quorum_n),
            chain_id = %config.core.chain_id,
            "operator node constructed"
        );
        Ok(Self {
            operator_id,
            keypair,
            store,
            pipeline,
            signer,
            registry,
            config: config.core.clone(),
            activities: Mutex::new(HashMap::new()),
        })
    }

    pub fn operator_id(&self) -> &OperatorId {
        &self.operator_id
    }

    pub fn store(&self) -> &Arc<EventStore<S>> {
        &self.store
    }

    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    pub fn core_config(&self) -> &CoreConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Query surface (what the transport layer serves)
    // ------------------------------------------------------------------

    pub fn get_item(&self, item_id: &ItemId) -> Result<Option<Item>, StoreError> {
        self.store.item(item_id)
    }

    pub fn get_events(&self, item_id: &ItemId) -> Result<Vec<Event>, StoreError> {
        self.store.events(item_id)
    }

    /// The operator-signed proof bundle clients feed to their verifier.
    pub fn get_item_proof(&self, item_id: &ItemId) -> Result<ItemProofResponse, StoreError> {
        let item = self.store.item(item_id)?;
        let events = self.store.events(item_id)?;
        let mut proof = ItemProofResponse {
            operator_id: self.operator_id.clone(),
            item,
            events,
            public_key: *self.keypair.public_key().as_bytes(),
            signature: [0u8; 64],
        };
        proof.signature = *self.keypair.sign_digest(&proof.signing_digest()).as_bytes();
        Ok(proof)
    }

    pub fn get_manufacturer(&self, id: &str) -> Result<Option<Manufacturer>, StoreError> {
        self.store.manufacturer(id)
    }

    pub fn get_authenticator(&self, id: &str) -> Result<Option<Authenticator>, StoreError> {
        self.store.authenticator(id)
    }

    pub fn get_attestations(
        &self,
        item_id: &ItemId,
    ) -> Result<Vec<AuthenticationAttestation>, StoreError> {
        self.store.attestations(item_id)
    }

    pub fn latest_checkpoint(&self) -> Result<Option<Checkpoint>, StoreError> {
        self.store.latest_checkpoint()
    }

    /// Advance a manufacturer's status. Status only moves forward:
    /// `ACTIVE → SUSPENDED → REVOKED`.
    pub fn set_manufacturer_status(
        &self,
        id: &str,
        next: RegistryStatus,
    ) -> Result<Manufacturer, AdmissionError> {
        let registry_lock = self.store.registry_lock();
        let _guard = registry_lock.lock();
        let mut manufacturer = self
            .store
            .manufacturer(id)?
            .ok_or_else(|| AdmissionError::Registry(format!("manufacturer {id} not registered")))?;
        if !manufacturer.status.can_advance_to(next) {
            return Err(AdmissionError::Registry(format!(
                "cannot move manufacturer {id} from {} to {}",
                manufacturer.status.as_str(),
                next.as_str()
            )));
        }
        manufacturer.status = next;
        self.store.put_manufacturer(&manufacturer)?;
        info!(manufacturer_id = id, status = next.as_str(), "manufacturer status advanced");
        Ok(manufacturer)
    }

    /// Advance an authenticator's status under the same forward-only rule.
    pub fn set_authenticator_status(
        &self,
        id: &str,
        next: RegistryStatus,
    ) -> Result<Authenticator, AdmissionError> {
        let registry_lock = self.store.registry_lock();
        let _guard = registry_lock.lock();
        let mut authenticator = self
            .store
            .authenticator(id)?
            .ok_or_else(|| AdmissionError::Registry(format!("authenticator {id} not registered")))?;
        if !authenticator.status.can_advance_to(next) {
            return Err(AdmissionError::Registry(format!(
                "cannot move authenticator {id} from {} to {}",
                authenticator.status.as_str(),
                next.as_str()
            )));
        }
        authenticator.status = next;
        self.store.put_authenticator(&authenticator)?;
        info!(authenticator_id = id, status = next.as_str(), "authenticator status advanced");
        Ok(authenticator)
    }

    // ------------------------------------------------------------------
    // Submission surface
    // ------------------------------------------------------------------

    /// Admit a fully-signed event.
    pub fn submit_event(&self, event: &Event) -> SubmitOutcome {
        match self.pipeline.admit(event) {
            Ok(_) => SubmitOutcome {
                accepted: true,
                error: None,
            },
            Err(err) => SubmitOutcome {
                accepted: false,
                error: Some(err.to_string()),
            },
        }
    }

    /// Fill in a draft's chain position and self-sign it.
    pub fn propose_event(&self, draft: EventDraft) -> Result<Event, SignerError> {
        self.signer.propose(draft)
    }

    /// Co-sign a peer's candidate.
    pub fn sign_event(&self, event: &Event) -> Result<OperatorSignature, SignerError> {
        self.signer.sign(event)
    }

    /// Merge an incoming candidate's signatures; admit at quorum.
    pub fn collect_event(&self, event: Event) -> Result<CollectOutcome, SignerError> {
        self.signer.collect(event)
    }

    // ------------------------------------------------------------------
    // Committee & checkpoint surface
    // ------------------------------------------------------------------

    /// Deterministic committee for a settlement, over currently-active
    /// operators.
    pub fn settlement_committee(
        &self,
        offer_id: &OfferId,
    ) -> Result<Vec<CommitteeSeat>, CommitteeError> {
        let root = self
            .latest_checkpoint()
            .ok()
            .flatten()
            .map(|cp| cp.checkpoint_root(self.config.checkpoint_interval_ms))
            .unwrap_or(ZERO_HASH);
        let now = SystemTimeSource.now_ms();
        let activities = self.activities.lock();
        let active: Vec<Operator> = self
            .registry
            .iter()
            .filter(|op| {
                let activity = activities
                    .get(&op.operator_id)
                    .copied()
                    .unwrap_or(OperatorActivity {
                        checkpoints_signed: 0,
                        recent_checkpoint_count: 0,
                        last_active_at: now,
                    });
                is_active(op, &activity, now, &self.config)
            })
            .cloned()
            .collect();
        select_committee(
            offer_id,
            &root,
            &self.config.chain_id,
            &active,
            self.config.committee_size,
            self.config.quorum_m,
        )
    }

    /// Fee payouts for a settlement, derived from its committee.
    pub fn settlement_fees(
        &self,
        offer_id: &OfferId,
        total_fee_sats: u64,
    ) -> Result<Vec<FeePayout>, CommitteeError> {
        Ok(distribute_fees(
            total_fee_sats,
            &self.settlement_committee(offer_id)?,
        ))
    }

    /// Update activity bookkeeping after a checkpoint completes.
    pub fn record_checkpoint(&self, checkpoint: &Checkpoint) {
        let now = SystemTimeSource.now_ms();
        let mut activities = self.activities.lock();
        for operator in self.registry.iter() {
            let entry = activities
                .entry(operator.operator_id.clone())
                .or_default();
            entry.recent_checkpoint_count += 1;
            if checkpoint
                .operator_signatures
                .iter()
                .any(|s| s.operator_id == operator.operator_id)
            {
                entry.checkpoints_signed += 1;
                entry.last_active_at = now;
            }
        }
    }

    /// Build this node's checkpoint engine over injected peer and anchor
    /// adapters.
    pub fn checkpoint_engine<G, A>(&self, peers: G, anchor: A) -> CheckpointEngine<S, G, A, SystemTimeSource>
    where
        G: CheckpointSigner,
        A: AnchorSink,
    {
        CheckpointEngine::new(
            self.store.clone(),
            peers,
            anchor,
            SystemTimeSource,
            LocalSigner {
                operator_id: self.operator_id.clone(),
                keypair: self.keypair.clone(),
            },
            self.registry.clone(),
            self.config.clone(),
        )
    }
}
