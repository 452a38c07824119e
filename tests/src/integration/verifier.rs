//! Divergent-operator scans: the client verifier must return the honest
//! majority's state or fail, never an adversarial one.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use pc_02_admission::test_utils::GENESIS_MS;
use pc_06_client_verifier::{
    ClientVerifier, GatewayError, ItemProofResponse, OperatorGateway, VerifierConfig,
};
use shared_types::{
    AuthenticationAttestation, Authenticator, AuthenticatorId, Event, Item, ItemId, Manufacturer,
    ManufacturerId, Operator, OperatorId,
};

use super::helpers::{settled_fixture, SaleFixture};

#[derive(Default)]
struct CannedGateway {
    proofs: HashMap<OperatorId, ItemProofResponse>,
    manufacturers: HashMap<String, Manufacturer>,
    attestations: HashMap<OperatorId, Vec<AuthenticationAttestation>>,
    authenticators: HashMap<String, Authenticator>,
}

#[async_trait]
impl OperatorGateway for CannedGateway {
    async fn fetch_item_proof(
        &self,
        operator: &Operator,
        _item_id: &ItemId,
    ) -> Result<ItemProofResponse, GatewayError> {
        self.proofs
            .get(&operator.operator_id)
            .cloned()
            .ok_or_else(|| GatewayError::Transport("unreachable".into()))
    }

    async fn fetch_attestations(
        &self,
        operator: &Operator,
        _item_id: &ItemId,
    ) -> Result<Vec<AuthenticationAttestation>, GatewayError> {
        Ok(self
            .attestations
            .get(&operator.operator_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_manufacturer(
        &self,
        _operator: &Operator,
        manufacturer_id: &ManufacturerId,
    ) -> Result<Option<Manufacturer>, GatewayError> {
        Ok(self.manufacturers.get(manufacturer_id.as_str()).cloned())
    }

    async fn fetch_authenticator(
        &self,
        _operator: &Operator,
        authenticator_id: &AuthenticatorId,
    ) -> Result<Option<Authenticator>, GatewayError> {
        Ok(self.authenticators.get(authenticator_id.as_str()).cloned())
    }
}

fn signed_proof(
    fixture: &SaleFixture,
    i: usize,
    item: Item,
    events: Vec<Event>,
) -> ItemProofResponse {
    let key = fixture.federation.operator_key(i);
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

fn verifier(fixture: &SaleFixture, gateway: CannedGateway) -> ClientVerifier<CannedGateway> {
    ClientVerifier::new(
        Arc::new(gateway),
        fixture.federation.registry(),
        VerifierConfig {
            quorum_m: 3,
            ..VerifierConfig::for_testing()
        },
    )
}

/// Three honest operators serve the settled state; two fabricate a
/// different history.
#[tokio::test]
async fn honest_majority_beats_fabricated_minority() {
    let fixture = settled_fixture();
    let item = fixture.item();
    let events = fixture.store().events(&fixture.item_id).unwrap();
    let manufacturer = fixture.store().manufacturer("mfr-lwc").unwrap().unwrap();

    let mut gateway = CannedGateway::default();
    for i in 0..3 {
        gateway.proofs.insert(
            OperatorId::new(format!("op-{i}")),
            signed_proof(&fixture, i, item.clone(), events.clone()),
        );
    }
    let mut fabricated = item.clone();
    fabricated.last_event_hash = [0xDE; 32];
    fabricated.last_event_height = 7;
    for i in 3..5 {
        gateway.proofs.insert(
            OperatorId::new(format!("op-{i}")),
            signed_proof(&fixture, i, fabricated.clone(), vec![]),
        );
    }
    gateway
        .manufacturers
        .insert("mfr-lwc".into(), manufacturer);

    let result = verifier(&fixture, gateway)
        .scan(&fixture.item_id, GENESIS_MS + 60_000)
        .await;

    assert!(result.is_authentic, "warnings: {:?}", result.warnings);
    let scanned = result.item.unwrap();
    assert_eq!(scanned.last_event_hash, item.last_event_hash);
    assert_eq!(scanned.last_event_height, 5);
    assert_eq!(scanned.current_owner_wallet, Some(fixture.buyer.wallet()));
    assert_eq!(result.events.len(), 5);
}

/// With only two honest responders the scan must fail, and it must fail
/// toward "not authentic", never toward the forgery.
#[tokio::test]
async fn below_quorum_fails_closed() {
    let fixture = settled_fixture();
    let item = fixture.item();
    let events = fixture.store().events(&fixture.item_id).unwrap();

    let mut gateway = CannedGateway::default();
    for i in 0..2 {
        gateway.proofs.insert(
            OperatorId::new(format!("op-{i}")),
            signed_proof(&fixture, i, item.clone(), events.clone()),
        );
    }

    let result = verifier(&fixture, gateway)
        .scan(&fixture.item_id, GENESIS_MS + 60_000)
        .await;
    assert!(!result.is_authentic);
    assert!(result.item.is_none());
    assert!(result.warnings[0].contains("insufficient responses"));
}

/// An adversarial majority that agrees on a snapshot still loses: no
/// forged chain can carry M real operator signatures per event.
#[tokio::test]
async fn forged_majority_cannot_fake_a_chain() {
    let fixture = settled_fixture();
    let item = fixture.item();
    let events = fixture.store().events(&fixture.item_id).unwrap();

    // Forge: pretend the settle never happened by truncating the log and
    // claiming a matching snapshot.
    let mut forged_item = item.clone();
    let truncated: Vec<Event> = events[..4].to_vec();
    forged_item.last_event_hash = truncated.last().unwrap().header.event_id;
    forged_item.last_event_height = 4;
    // The claimed state must disagree with a replay of the truncated
    // chain, or carry stripped signatures; both paths must fail. Here the
    // forger keeps the settled owner but drops the settle event.
    let mut gateway = CannedGateway::default();
    for i in 0..5 {
        gateway.proofs.insert(
            OperatorId::new(format!("op-{i}")),
            signed_proof(&fixture, i, forged_item.clone(), truncated.clone()),
        );
    }

    let result = verifier(&fixture, gateway)
        .scan(&fixture.item_id, GENESIS_MS + 60_000)
        .await;
    assert!(!result.is_authentic);
}

/// Attestations are unioned across operators and filtered by signature,
/// expiry, and authenticator status.
#[tokio::test]
async fn attestations_are_unioned_and_filtered() {
    use pc_02_admission::test_utils::{authenticate, authenticator_registration, ActorKey};

    let fixture = settled_fixture();
    let authenticator_key = ActorKey::from_seed(9);

    let registration = authenticator_registration(
        "auth-gem",
        "Gem Lab",
        "horology",
        &authenticator_key,
        GENESIS_MS + 20_000,
    );
    fixture.admit(registration, 3).unwrap();
    let authenticated = authenticate(
        &fixture.item(),
        "auth-gem",
        &authenticator_key,
        0.98,
        GENESIS_MS + 21_000,
    );
    fixture.admit(authenticated, 3).unwrap();

    let item = fixture.item();
    let events = fixture.store().events(&fixture.item_id).unwrap();
    let attestations = fixture.store().attestations(&fixture.item_id).unwrap();
    assert_eq!(attestations.len(), 1);
    let authenticator = fixture.store().authenticator("auth-gem").unwrap().unwrap();

    let mut gateway = CannedGateway::default();
    for i in 0..3 {
        gateway.proofs.insert(
            OperatorId::new(format!("op-{i}")),
            signed_proof(&fixture, i, item.clone(), events.clone()),
        );
        // Only one operator serves the attestation; the union still
        // carries it.
        if i == 1 {
            gateway
                .attestations
                .insert(OperatorId::new(format!("op-{i}")), attestations.clone());
        }
    }
    // A second, forged attestation under the same authenticator id.
    let mut forged = attestations[0].clone();
    forged.attestation_id = shared_types::AttestationId::new("att-forged");
    forged.confidence = 1.0;
    gateway
        .attestations
        .entry(OperatorId::new("op-2"))
        .or_default()
        .push(forged);
    gateway
        .manufacturers
        .insert("mfr-lwc".into(), fixture.store().manufacturer("mfr-lwc").unwrap().unwrap());
    gateway
        .authenticators
        .insert("auth-gem".into(), authenticator);

    let result = verifier(&fixture, gateway)
        .scan(&fixture.item_id, GENESIS_MS + 60_000)
        .await;
    assert!(result.is_authentic, "warnings: {:?}", result.warnings);
    // The genuine attestation survives; the forged one fails its
    // signature check and becomes a warning.
    assert_eq!(result.attestations.len(), 1);
    assert_eq!(
        result.attestations[0].attestation_id.as_str(),
        attestations[0].attestation_id.as_str()
    );
    assert!(result
        .warnings
        .iter()
        .any(|w| w.contains("att-forged")));
}
