//! # Scan Service
//!
//! Queries every known operator in parallel, settles on the
//! majority-agreed state, re-verifies the winning chain end to end, and
//! decorates the result with manufacturer, anchor, and attestation
//! status.
//!
//! ## Degradation policy
//!
//! - A transport failure or deadline on one operator contributes nothing.
//! - A response that fails cryptographic re-verification is invalidated
//!   and surfaced as a warning; the scan proceeds if the rest still reach
//!   quorum.
//! - A below-quorum outcome yields `is_authentic = false` with a single
//!   explanatory warning.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::algorithms::{confirm_snapshot, select_majority, verify_event_chain, ConsensusFailure};
use crate::config::VerifierConfig;
use crate::domain::{ItemProofResponse, ScanResult};
use crate::ports::OperatorGateway;
use shared_crypto::verify_digest;
use shared_types::{
    AuthenticationAttestation, Event, EventPayload, ItemId, Operator, OperatorRegistry, Timestamp,
};

/// Client-side verifier over a fixed operator registry.
pub struct ClientVerifier<G: OperatorGateway + 'static> {
    gateway: Arc<G>,
    registry: OperatorRegistry,
    config: VerifierConfig,
}

impl<G: OperatorGateway + 'static> ClientVerifier<G> {
    pub fn new(gateway: Arc<G>, registry: OperatorRegistry, config: VerifierConfig) -> Self {
        Self {
            gateway,
            registry,
            config,
        }
    }

    /// Scan one item across the federation.
    ///
    /// `now_ms` is the client's clock, used only for attestation expiry.
    pub async fn scan(&self, item_id: &ItemId, now_ms: Timestamp) -> ScanResult {
        let responses = self.gather_proofs(item_id).await;
        // Only responses about the queried item participate; an operator
        // serving some other real item's state contributes nothing.
        let usable: Vec<ItemProofResponse> = responses
            .into_iter()
            .filter(|r| r.item.as_ref().map(|i| i.item_id == *item_id).unwrap_or(false))
            .collect();
        debug!(item_id = %item_id, usable = usable.len(), "item proofs gathered");

        let group = match select_majority(usable, self.config.quorum_m) {
            Ok(group) => group,
            Err(ConsensusFailure::InsufficientResponses { usable, required }) => {
                return ScanResult::failed(format!(
                    "insufficient responses: {usable} of {required} required"
                ));
            }
            Err(ConsensusFailure::NoQuorum { largest, required }) => {
                return ScanResult::failed(format!(
                    "no quorum consensus: largest group {largest}, need {required}"
                ));
            }
        };

        // Re-verify the winning group's chains until one passes; members
        // that fail are invalidated.
        let mut warnings = Vec::new();
        let mut accepted: Option<(ItemProofResponse, crate::algorithms::ReplaySummary)> = None;
        let mut invalidated = 0usize;
        for response in &group {
            let item = response.item.as_ref().expect("grouped responses carry items");
            match verify_event_chain(&response.events, &self.registry, self.config.quorum_m)
                .and_then(|replay| confirm_snapshot(item, &replay).map(|()| replay))
            {
                Ok(replay) => {
                    accepted = Some((response.clone(), replay));
                    break;
                }
                Err(err) => {
                    invalidated += 1;
                    warnings.push(format!(
                        "response from {} invalidated: {err}",
                        response.operator_id
                    ));
                }
            }
        }

        let Some((response, replay)) = accepted else {
            let mut result = ScanResult::failed("no response survived re-verification");
            result.warnings.extend(warnings);
            return result;
        };
        if group.len() - invalidated < self.config.quorum_m {
            let mut result =
                ScanResult::failed("agreeing responses fell below quorum after re-verification");
            result.warnings.extend(warnings);
            return result;
        }

        let item = response.item.expect("accepted response carries an item");
        let group_operators: Vec<Operator> = group
            .iter()
            .filter_map(|r| self.registry.get(&r.operator_id).cloned())
            .collect();
        let manufacturer = self
            .resolve_manufacturer(&response.events, &group_operators)
            .await;
        match &manufacturer {
            None => warnings.push("manufacturer record unavailable".into()),
            Some(m) if !m.status.is_active() => {
                warnings.push(format!(
                    "manufacturer {} is {}",
                    m.manufacturer_id,
                    m.status.as_str()
                ));
            }
            Some(_) => {}
        }

        let attestations = self.gather_attestations(item_id, now_ms, &mut warnings).await;

        info!(
            item_id = %item_id,
            state = item.current_state.as_str(),
            height = item.last_event_height,
            anchored = replay.anchored,
            "scan verified"
        );
        ScanResult {
            is_authentic: true,
            item: Some(item),
            events: response.events,
            manufacturer,
            attestations,
            anchored: replay.anchored,
            warnings,
        }
    }

    /// Fan out proof requests; absorb failures and the scan deadline.
    async fn gather_proofs(&self, item_id: &ItemId) -> Vec<ItemProofResponse> {
        let deadline = Instant::now() + Duration::from_millis(self.config.scan_deadline_ms);
        let per_request = Duration::from_millis(self.config.request_deadline_ms);

        let mut set = JoinSet::new();
        for operator in self.registry.iter().cloned() {
            let gateway = self.gateway.clone();
            let item_id = item_id.clone();
            set.spawn(async move {
                let result = timeout(
                    per_request,
                    gateway.fetch_item_proof(&operator, &item_id),
                )
                .await;
                (operator.operator_id, result)
            });
        }

        let mut responses = Vec::new();
        loop {
            let joined = match tokio::time::timeout_at(deadline, set.join_next()).await {
                Ok(Some(joined)) => joined,
                Ok(None) => break,
                Err(_) => {
                    warn!("scan deadline reached; evaluating partial results");
                    break;
                }
            };
            match joined {
                Ok((operator_id, Ok(Ok(response)))) => {
                    if self.proof_is_attributable(&operator_id, &response) {
                        responses.push(response);
                    } else {
                        debug!(%operator_id, "unattributable response dropped");
                    }
                }
                Ok((operator_id, Ok(Err(err)))) => {
                    debug!(%operator_id, error = %err, "operator query failed");
                }
                Ok((operator_id, Err(_))) => {
                    debug!(%operator_id, "operator query timed out");
                }
                Err(join_err) => debug!(error = %join_err, "scan task failed"),
            }
        }
        responses
    }

    /// A proof counts only when it names the queried operator, carries
    /// that operator's registered key, and is signed by it.
    fn proof_is_attributable(
        &self,
        operator_id: &shared_types::OperatorId,
        response: &ItemProofResponse,
    ) -> bool {
        response.operator_id == *operator_id
            && self
                .registry
                .get(operator_id)
                .map(|op| op.public_key == response.public_key)
                .unwrap_or(false)
            && verify_digest(
                &response.public_key,
                &response.signing_digest(),
                &response.signature,
            )
    }

    /// Find the mint's manufacturer record from the agreeing operators.
    async fn resolve_manufacturer(
        &self,
        events: &[Event],
        operators: &[Operator],
    ) -> Option<shared_types::Manufacturer> {
        let manufacturer_id = events.iter().find_map(|e| match &e.payload {
            EventPayload::ItemMinted { manufacturer_id, .. } => Some(manufacturer_id.clone()),
            _ => None,
        })?;
        let per_request = Duration::from_millis(self.config.request_deadline_ms);
        for operator in operators {
            if let Ok(Ok(Some(manufacturer))) = timeout(
                per_request,
                self.gateway.fetch_manufacturer(operator, &manufacturer_id),
            )
            .await
            {
                if manufacturer.manufacturer_id == manufacturer_id {
                    return Some(manufacturer);
                }
            }
        }
        None
    }

    /// Union attestations across operators, then filter to the valid ones.
    async fn gather_attestations(
        &self,
        item_id: &ItemId,
        now_ms: Timestamp,
        warnings: &mut Vec<String>,
    ) -> Vec<AuthenticationAttestation> {
        let per_request = Duration::from_millis(self.config.request_deadline_ms);

        let mut union: HashMap<String, AuthenticationAttestation> = HashMap::new();
        for operator in self.registry.iter() {
            let fetched = timeout(
                per_request,
                self.gateway.fetch_attestations(operator, item_id),
            )
            .await;
            if let Ok(Ok(attestations)) = fetched {
                for attestation in attestations {
                    union
                        .entry(attestation.attestation_id.as_str().to_string())
                        .or_insert(attestation);
                }
            }
        }

        let mut valid = Vec::new();
        let mut authenticators: HashMap<String, Option<shared_types::Authenticator>> =
            HashMap::new();
        for attestation in union.into_values() {
            if attestation.item_id != *item_id {
                continue;
            }
            if attestation.is_expired(now_ms) {
                continue;
            }
            let record = match authenticators
                .entry(attestation.authenticator_id.as_str().to_string())
            {
                std::collections::hash_map::Entry::Occupied(entry) => entry.get().clone(),
                std::collections::hash_map::Entry::Vacant(entry) => {
                    let fetched = self
                        .resolve_authenticator(&attestation.authenticator_id)
                        .await;
                    entry.insert(fetched.clone());
                    fetched
                }
            };
            let Some(authenticator) = record else {
                warnings.push(format!(
                    "attestation {} references unknown authenticator {}",
                    attestation.attestation_id, attestation.authenticator_id
                ));
                continue;
            };
            if !authenticator.status.is_active() {
                continue;
            }
            let digest = shared_crypto::sha256(&attestation.signing_bytes());
            if verify_digest(
                &authenticator.public_key,
                &digest,
                &attestation.authenticator_signature,
            ) {
                valid.push(attestation);
            } else {
                warnings.push(format!(
                    "attestation {} failed signature verification",
                    attestation.attestation_id
                ));
            }
        }
        valid.sort_by(|a, b| a.issued_at.cmp(&b.issued_at));
        valid
    }

    async fn resolve_authenticator(
        &self,
        id: &shared_types::AuthenticatorId,
    ) -> Option<shared_types::Authenticator> {
        let per_request = Duration::from_millis(self.config.request_deadline_ms);
        for operator in self.registry.iter() {
            if let Ok(Ok(Some(authenticator))) = timeout(
                per_request,
                self.gateway.fetch_authenticator(operator, id),
            )
            .await
            {
                return Some(authenticator);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::GatewayError;
    use async_trait::async_trait;
    use pc_02_admission::test_utils::{
        assign, manufacturer_registration, mint, ActorKey, TestFederation, GENESIS_MS,
    };
    use shared_types::{Manufacturer, OperatorId};
    use std::collections::HashMap;

    /// Serves canned per-operator responses; operators missing from the
    /// map behave like dead transports.
    #[derive(Default)]
    struct MockGateway {
        proofs: HashMap<OperatorId, ItemProofResponse>,
        manufacturers: HashMap<String, Manufacturer>,
    }

    #[async_trait]
    impl OperatorGateway for MockGateway {
        async fn fetch_item_proof(
            &self,
            operator: &Operator,
            _item_id: &ItemId,
        ) -> Result<ItemProofResponse, GatewayError> {
            self.proofs
                .get(&operator.operator_id)
                .cloned()
                .ok_or_else(|| GatewayError::Transport("connection refused".into()))
        }

        async fn fetch_attestations(
            &self,
            _operator: &Operator,
            _item_id: &ItemId,
        ) -> Result<Vec<AuthenticationAttestation>, GatewayError> {
            Ok(vec![])
        }

        async fn fetch_manufacturer(
            &self,
            _operator: &Operator,
            manufacturer_id: &shared_types::ManufacturerId,
        ) -> Result<Option<Manufacturer>, GatewayError> {
            Ok(self.manufacturers.get(manufacturer_id.as_str()).cloned())
        }

        async fn fetch_authenticator(
            &self,
            _operator: &Operator,
            _authenticator_id: &shared_types::AuthenticatorId,
        ) -> Result<Option<shared_types::Authenticator>, GatewayError> {
            Ok(None)
        }
    }

    /// An admitted register→mint→assign history plus a signed proof from
    /// operator `i`.
    struct Fixture {
        federation: TestFederation,
        item: shared_types::Item,
        events: Vec<Event>,
        manufacturer: Manufacturer,
    }

    fn fixture() -> Fixture {
        let federation = TestFederation::new(3, 5);
        let pipeline = federation.pipeline();
        let issuer = ActorKey::from_seed(1);
        let owner = ActorKey::from_seed(2);

        let mut registration =
            manufacturer_registration("mfr-lwc", "Luxury Watch Co.", &issuer, GENESIS_MS);
        federation.quorum_sign(&mut registration, 3);
        pipeline.admit(&registration).unwrap();
        let manufacturer = pipeline.store().manufacturer("mfr-lwc").unwrap().unwrap();

        let mut minted = mint(&registration, &issuer, b"ref-1", GENESIS_MS + 1_000);
        federation.quorum_sign(&mut minted, 3);
        let receipt = pipeline.admit(&minted).unwrap();
        let item = pipeline.store().item(&receipt.item_id).unwrap().unwrap();

        let mut assigned = assign(&item, &issuer, &owner, GENESIS_MS + 2_000);
        federation.quorum_sign(&mut assigned, 3);
        pipeline.admit(&assigned).unwrap();

        let item = pipeline.store().item(&receipt.item_id).unwrap().unwrap();
        let events = pipeline.store().events(&receipt.item_id).unwrap();
        Fixture {
            federation,
            item,
            events,
            manufacturer,
        }
    }

    fn signed_proof(f: &Fixture, i: usize, item: shared_types::Item, events: Vec<Event>) -> ItemProofResponse {
        let key = f.federation.operator_key(i);
        let mut proof = ItemProofResponse {
            operator_id: OperatorId::new(format!("op-{i}")),
            item: Some(item),
            events,
            public_key: *key.public_key().as_bytes(),
            signature: [0u8; 64],
        };
        proof.signature = *key.sign_digest(&proof.signing_digest()).as_bytes();
        proof
    }

    fn verifier(f: &Fixture, gateway: MockGateway) -> ClientVerifier<MockGateway> {
        let config = VerifierConfig {
            quorum_m: 3,
            ..VerifierConfig::for_testing()
        };
        ClientVerifier::new(Arc::new(gateway), f.federation.registry(), config)
    }

    #[tokio::test]
    async fn honest_majority_scan_succeeds() {
        let f = fixture();
        let mut gateway = MockGateway::default();
        for i in 0..3 {
            gateway.proofs.insert(
                OperatorId::new(format!("op-{i}")),
                signed_proof(&f, i, f.item.clone(), f.events.clone()),
            );
        }
        gateway
            .manufacturers
            .insert("mfr-lwc".into(), f.manufacturer.clone());

        let result = verifier(&f, gateway)
            .scan(&f.item.item_id, GENESIS_MS + 10_000)
            .await;
        assert!(result.is_authentic, "warnings: {:?}", result.warnings);
        assert_eq!(result.item.unwrap().last_event_height, 3);
        assert_eq!(
            result.manufacturer.unwrap().manufacturer_id,
            f.manufacturer.manufacturer_id
        );
        assert!(result.warnings.is_empty());
    }

    #[tokio::test]
    async fn two_responses_are_insufficient() {
        let f = fixture();
        let mut gateway = MockGateway::default();
        for i in 0..2 {
            gateway.proofs.insert(
                OperatorId::new(format!("op-{i}")),
                signed_proof(&f, i, f.item.clone(), f.events.clone()),
            );
        }
        let result = verifier(&f, gateway)
            .scan(&f.item.item_id, GENESIS_MS + 10_000)
            .await;
        assert!(!result.is_authentic);
        assert!(result.warnings[0].contains("insufficient responses"));
    }

    #[tokio::test]
    async fn forged_minority_cannot_win() {
        let f = fixture();
        let mut gateway = MockGateway::default();

        // Three honest operators serve the real chain.
        for i in 0..3 {
            gateway.proofs.insert(
                OperatorId::new(format!("op-{i}")),
                signed_proof(&f, i, f.item.clone(), f.events.clone()),
            );
        }
        // Two dishonest ones agree with each other on a forged snapshot.
        let mut forged = f.item.clone();
        forged.last_event_hash = [0xBA; 32];
        forged.last_event_height = 9;
        for i in 3..5 {
            gateway.proofs.insert(
                OperatorId::new(format!("op-{i}")),
                signed_proof(&f, i, forged.clone(), vec![]),
            );
        }
        gateway
            .manufacturers
            .insert("mfr-lwc".into(), f.manufacturer.clone());

        let result = verifier(&f, gateway)
            .scan(&f.item.item_id, GENESIS_MS + 10_000)
            .await;
        assert!(result.is_authentic);
        assert_eq!(result.item.unwrap().last_event_hash, f.item.last_event_hash);
    }

    #[tokio::test]
    async fn forged_majority_with_invalid_chain_fails_closed() {
        let f = fixture();
        let mut gateway = MockGateway::default();

        // All five agree on a forged snapshot, but no forged chain can
        // carry real quorum signatures.
        let mut forged = f.item.clone();
        forged.last_event_hash = [0xBA; 32];
        let mut forged_events = f.events.clone();
        forged_events[1].header.operator_signatures.clear();
        for i in 0..5 {
            gateway.proofs.insert(
                OperatorId::new(format!("op-{i}")),
                signed_proof(&f, i, forged.clone(), forged_events.clone()),
            );
        }

        let result = verifier(&f, gateway)
            .scan(&f.item.item_id, GENESIS_MS + 10_000)
            .await;
        assert!(!result.is_authentic);
        assert!(!result.warnings.is_empty());
    }
}

