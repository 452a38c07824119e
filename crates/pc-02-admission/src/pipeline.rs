//! # Admission Pipeline
//!
//! The synchronous, deterministic path every candidate event walks before
//! it is persisted. Admission never blocks on peers: it judges only the
//! signatures already attached to the candidate.
//!
//! ## Steps
//!
//! 1. Structural field checks
//! 2. Event id recomputation
//! 3. Timestamp window
//! 4. Chain position (height, previous hash, burned check)
//! 5. Transition table + preconditions
//! 6. Actor signature for the event's role
//! 7. M-of-N distinct operator signatures
//! 8. Atomic persist + snapshot update
//!
//! The first failing category is returned; nothing is persisted on
//! failure.

use std::sync::Arc;

use pc_01_event_store::{AdmissionEffects, EventStore, KeyValueStore, TimeSource};
use shared_types::{
    tally_signatures, AdmissionError, Authenticator, ChainViolation, CoreConfig, Event, EventKind,
    EventPayload, Hash, Item, ItemId, Manufacturer, OperatorRegistry, ZERO_HASH,
};
use tracing::{debug, info};

use crate::domain::{actor, effects, format, preconditions, state_machine};
use crate::ports::PaymentVerifier;

/// What `admit` returns on success.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdmissionReceipt {
    pub event_id: Hash,
    pub item_id: ItemId,
    pub height: u64,
    /// Position in this operator's global admission order.
    pub seq: u64,
}

/// Validates, persists, and materializes candidate events.
pub struct AdmissionPipeline<S: KeyValueStore, T: TimeSource> {
    store: Arc<EventStore<S>>,
    operators: OperatorRegistry,
    config: CoreConfig,
    time: T,
    payments: Arc<dyn PaymentVerifier>,
}

impl<S: KeyValueStore, T: TimeSource> AdmissionPipeline<S, T> {
    pub fn new(
        store: Arc<EventStore<S>>,
        operators: OperatorRegistry,
        config: CoreConfig,
        time: T,
        payments: Arc<dyn PaymentVerifier>,
    ) -> Self {
        Self {
            store,
            operators,
            config,
            time,
            payments,
        }
    }

    pub fn store(&self) -> &Arc<EventStore<S>> {
        &self.store
    }

    pub fn operators(&self) -> &OperatorRegistry {
        &self.operators
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Admit a fully-signed event: validate, persist, materialize.
    ///
    /// Admission is atomic per event. Mutations to the target item are
    /// serialized under its lock; registrations additionally serialize
    /// under the registry lock.
    pub fn admit(&self, event: &Event) -> Result<AdmissionReceipt, AdmissionError> {
        let item_lock = self.store.item_lock(&event.header.item_id);
        let _item_guard = item_lock.lock();
        let registry_lock = self.store.registry_lock();
        let _registry_guard = match event.kind() {
            EventKind::ManufacturerRegistered | EventKind::AuthenticatorRegistered => {
                Some(registry_lock.lock())
            }
            _ => None,
        };

        let effects = self.evaluate(event, true)?;
        let seq = self.store.append(event, effects)?;

        info!(
            event_type = event.kind().as_str(),
            item_id = %event.header.item_id,
            height = event.header.height,
            seq,
            "event admitted"
        );
        Ok(AdmissionReceipt {
            event_id: event.header.event_id,
            item_id: event.header.item_id.clone(),
            height: event.header.height,
            seq,
        })
    }

    /// Run every check short of the quorum requirement.
    ///
    /// This is what a peer runs before co-signing a candidate that does
    /// not yet carry M signatures.
    pub fn validate_candidate(&self, event: &Event) -> Result<(), AdmissionError> {
        self.evaluate(event, false).map(|_| ())
    }

    fn evaluate(
        &self,
        event: &Event,
        require_quorum: bool,
    ) -> Result<AdmissionEffects, AdmissionError> {
        // 1. Structure.
        format::check(event)?;

        // 2. Identity.
        let computed = event.compute_event_id();
        if computed != event.header.event_id {
            return Err(AdmissionError::Identity {
                stored: hex::encode(event.header.event_id),
                computed: hex::encode(computed),
            });
        }

        // 3. Timestamp window.
        let now = self.time.now_ms();
        let ts = event.header.timestamp;
        if now.saturating_sub(ts) > self.config.max_past_clock_skew_ms
            || ts.saturating_sub(now) > self.config.max_future_clock_skew_ms
        {
            return Err(AdmissionError::Timestamp { timestamp: ts, now });
        }

        // 4. Chain position.
        let item = self.check_chain(event)?;

        // Resolve referenced registry entities once.
        let manufacturer = self.resolve_manufacturer(event, item.as_ref())?;
        let authenticator = self.resolve_authenticator(event)?;
        let ctx = preconditions::TransitionContext {
            item: item.as_ref(),
            manufacturer: manufacturer.as_ref(),
            authenticator: authenticator.as_ref(),
            min_confirmations: self.config.attestation_min_confirmations,
        };

        // 5. Transition legality and preconditions.
        if !event.kind().is_registration() {
            let current = item.as_ref().map(|i| i.current_state);
            if state_machine::transition(current, event.kind()).is_none() {
                return Err(AdmissionError::Transition(format!(
                    "{} not allowed in {}",
                    event.kind().as_str(),
                    current.map(|s| s.as_str()).unwrap_or("(initial)")
                )));
            }
        }
        preconditions::check(event, &ctx)?;
        if let EventPayload::ItemSettled { payment_proof, .. } = &event.payload {
            if !self.payments.verify(payment_proof) {
                return Err(AdmissionError::Transition(
                    "payment proof rejected by verifier".into(),
                ));
            }
        }

        // 6. Actor signature.
        actor::verify_actor(event, &ctx)?;

        // 7. Operator quorum.
        if require_quorum {
            let tally = tally_signatures(
                &event.header.event_id,
                &event.header.operator_signatures,
                &self.operators,
            );
            if !tally.meets(self.config.quorum_m) {
                debug!(
                    valid = tally.valid,
                    required = self.config.quorum_m,
                    "quorum not met"
                );
                return Err(AdmissionError::Quorum {
                    valid: tally.valid,
                    required: self.config.quorum_m,
                    duplicates: tally.duplicates,
                    unknown: tally.unknown,
                    invalid: tally.invalid,
                });
            }
        }

        effects::compute(event, item.as_ref())
    }

    /// Height, previous-hash, and duplicate checks against the stored log.
    fn check_chain(&self, event: &Event) -> Result<Option<Item>, AdmissionError> {
        let header = &event.header;

        if event.kind().is_registration() {
            if header.height != 1 {
                return Err(ChainViolation::NonSequentialHeight {
                    last: 0,
                    got: header.height,
                }
                .into());
            }
            if header.previous_event_hash != ZERO_HASH {
                return Err(ChainViolation::PreviousHashMismatch {
                    expected: hex::encode(ZERO_HASH),
                    got: hex::encode(header.previous_event_hash),
                }
                .into());
            }
            let already = match event.kind() {
                EventKind::ManufacturerRegistered => {
                    self.store.manufacturer(header.item_id.as_str())?.is_some()
                }
                _ => self.store.authenticator(header.item_id.as_str())?.is_some(),
            };
            if already {
                return Err(AdmissionError::Registry(format!(
                    "{} already registered",
                    header.item_id
                )));
            }
            return Ok(None);
        }

        // A mint opens the item's log on top of the manufacturer's
        // registration event: the registration is height 1, the mint
        // height 2.
        if event.kind() == EventKind::ItemMinted {
            if self.store.item(&header.item_id)?.is_some() {
                return Err(ChainViolation::DuplicateItem(header.item_id.to_string()).into());
            }
            let EventPayload::ItemMinted { manufacturer_id, .. } = &event.payload else {
                unreachable!("kind checked above");
            };
            let registration_id = self
                .store
                .log_event_id(&ItemId::from(manufacturer_id), 1)?
                .ok_or_else(|| {
                    AdmissionError::Registry(format!(
                        "manufacturer {manufacturer_id} not registered"
                    ))
                })?;
            if header.height != 2 {
                return Err(ChainViolation::NonSequentialHeight {
                    last: 1,
                    got: header.height,
                }
                .into());
            }
            if header.previous_event_hash != registration_id {
                return Err(ChainViolation::PreviousHashMismatch {
                    expected: hex::encode(registration_id),
                    got: hex::encode(header.previous_event_hash),
                }
                .into());
            }
            if let Some(registration) = self.store.event(&registration_id)? {
                if header.timestamp < registration.header.timestamp {
                    return Err(ChainViolation::TimestampRegression {
                        previous: registration.header.timestamp,
                        got: header.timestamp,
                    }
                    .into());
                }
            }
            return Ok(None);
        }

        let item = self
            .store
            .item(&header.item_id)?
            .ok_or_else(|| ChainViolation::UnknownItem(header.item_id.to_string()))?;

        if item.current_state.is_terminal() {
            return Err(ChainViolation::BurnedItem(header.item_id.to_string()).into());
        }
        if header.height != item.last_event_height + 1 {
            return Err(ChainViolation::NonSequentialHeight {
                last: item.last_event_height,
                got: header.height,
            }
            .into());
        }
        if header.previous_event_hash != item.last_event_hash {
            return Err(ChainViolation::PreviousHashMismatch {
                expected: hex::encode(item.last_event_hash),
                got: hex::encode(header.previous_event_hash),
            }
            .into());
        }

        // Monotone timestamps within one log.
        if let Some(previous) = self.store.event(&item.last_event_hash)? {
            if header.timestamp < previous.header.timestamp {
                return Err(ChainViolation::TimestampRegression {
                    previous: previous.header.timestamp,
                    got: header.timestamp,
                }
                .into());
            }
        }

        Ok(Some(item))
    }

    fn resolve_manufacturer(
        &self,
        event: &Event,
        item: Option<&Item>,
    ) -> Result<Option<Manufacturer>, AdmissionError> {
        let id = match (&event.payload, item) {
            (EventPayload::ItemMinted { manufacturer_id, .. }, _) => Some(manufacturer_id.clone()),
            // Un-owned item events fall back to the manufacturer's key, so
            // resolve it whenever the item is known.
            (_, Some(item)) => Some(item.manufacturer_id.clone()),
            _ => None,
        };
        match id {
            Some(id) => Ok(self.store.manufacturer(id.as_str())?),
            None => Ok(None),
        }
    }

    fn resolve_authenticator(&self, event: &Event) -> Result<Option<Authenticator>, AdmissionError> {
        match &event.payload {
            EventPayload::ItemAuthenticated { attestation } => Ok(self
                .store
                .authenticator(attestation.authenticator_id.as_str())?),
            _ => Ok(None),
        }
    }
}
