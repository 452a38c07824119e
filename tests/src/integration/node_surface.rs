//! Whole-system loop: five operator nodes, candidate circulation through
//! the signing surface, and a client scan over the live federation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use node_runtime::{IdentityConfig, NodeConfig, OperatorEntry, OperatorNode, StorageConfig};
use pc_01_event_store::InMemoryKVStore;
use pc_02_admission::test_utils::ActorKey;
use pc_03_quorum_signer::CollectOutcome;
use pc_06_client_verifier::{
    ClientVerifier, GatewayError, ItemProofResponse, OperatorGateway, VerifierConfig,
};
use shared_crypto::Secp256k1KeyPair;
use shared_types::{
    ActorSignature, AuthenticationAttestation, Authenticator, AuthenticatorId, CoreConfig, Event,
    EventDraft, EventPayload, ItemId, ItemState, Manufacturer, ManufacturerId, Operator,
    OperatorId,
};

type Node = OperatorNode<InMemoryKVStore>;

struct Federation {
    nodes: Vec<Arc<Node>>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

fn boot_federation() -> Federation {
    let keys: Vec<Secp256k1KeyPair> = (0..5)
        .map(|i| Secp256k1KeyPair::from_bytes([0x60 + i as u8; 32]).unwrap())
        .collect();
    let roster: Vec<OperatorEntry> = keys
        .iter()
        .enumerate()
        .map(|(i, key)| OperatorEntry {
            operator_id: format!("op-{i}"),
            public_key_hex: hex::encode(key.public_key().as_bytes()),
            payout_address: shared_crypto::p2pkh_address(key.public_key().as_bytes()),
            endpoint: format!("https://op-{i}.federation.example"),
            active: true,
        })
        .collect();

    let nodes = (0..5)
        .map(|i| {
            let config = NodeConfig {
                core: CoreConfig::default(),
                storage: StorageConfig {
                    in_memory: true,
                    ..StorageConfig::default()
                },
                identity: IdentityConfig {
                    operator_id: format!("op-{i}"),
                    secret_key_hex: format!("{:02x}", 0x60 + i).repeat(32),
                },
                operators: roster.clone(),
            };
            Arc::new(OperatorNode::new(&config, InMemoryKVStore::new()).unwrap())
        })
        .collect();
    Federation { nodes }
}

impl Federation {
    /// Circulate a draft: node 0 proposes, the actor signs the fixed id,
    /// peers co-sign to quorum, and every node collects a copy.
    fn drive(&self, draft: EventDraft, actor: &ActorKey) -> Event {
        let mut event = self.nodes[0].propose_event(draft).unwrap();
        event.header.actor_signature = actor.sign(&event.header.event_id);

        for peer in [1, 2] {
            let signature = self.nodes[peer].sign_event(&event).unwrap();
            event.header.operator_signatures.push(signature);
        }
        for node in &self.nodes {
            match node.collect_event(event.clone()).unwrap() {
                CollectOutcome::Admitted(_) => {}
                CollectOutcome::Pending { valid, required } => {
                    panic!("candidate stuck at {valid}/{required}")
                }
            }
        }
        event
    }
}

/// In-process transport: the verifier talks straight to the nodes.
struct LoopbackGateway {
    nodes: HashMap<OperatorId, Arc<Node>>,
}

#[async_trait]
impl OperatorGateway for LoopbackGateway {
    async fn fetch_item_proof(
        &self,
        operator: &Operator,
        item_id: &ItemId,
    ) -> Result<ItemProofResponse, GatewayError> {
        let node = self
            .nodes
            .get(&operator.operator_id)
            .ok_or_else(|| GatewayError::Transport("unknown operator".into()))?;
        node.get_item_proof(item_id)
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }

    async fn fetch_attestations(
        &self,
        operator: &Operator,
        item_id: &ItemId,
    ) -> Result<Vec<AuthenticationAttestation>, GatewayError> {
        let node = self
            .nodes
            .get(&operator.operator_id)
            .ok_or_else(|| GatewayError::Transport("unknown operator".into()))?;
        node.get_attestations(item_id)
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }

    async fn fetch_manufacturer(
        &self,
        operator: &Operator,
        manufacturer_id: &ManufacturerId,
    ) -> Result<Option<Manufacturer>, GatewayError> {
        let node = self
            .nodes
            .get(&operator.operator_id)
            .ok_or_else(|| GatewayError::Transport("unknown operator".into()))?;
        node.get_manufacturer(manufacturer_id.as_str())
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }

    async fn fetch_authenticator(
        &self,
        operator: &Operator,
        authenticator_id: &AuthenticatorId,
    ) -> Result<Option<Authenticator>, GatewayError> {
        let node = self
            .nodes
            .get(&operator.operator_id)
            .ok_or_else(|| GatewayError::Transport("unknown operator".into()))?;
        node.get_authenticator(authenticator_id.as_str())
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn federation_mints_assigns_and_scans() {
    let federation = boot_federation();
    let issuer = ActorKey::from_seed(21);
    let owner = ActorKey::from_seed(22);

    // Register the manufacturer across the federation.
    federation.drive(
        EventDraft {
            item_id: None,
            payload: EventPayload::ManufacturerRegistered {
                manufacturer_id: ManufacturerId::from("mfr-lwc"),
                name: "Luxury Watch Co.".into(),
                issuer_public_key: issuer.public_key(),
                registration_fee_sats: 100_000,
            },
            actor_signature: ActorSignature {
                public_key: issuer.public_key(),
                signature: [0u8; 64],
            },
        },
        &issuer,
    );

    // Mint, then assign to the first owner.
    let minted = federation.drive(
        EventDraft {
            item_id: None,
            payload: EventPayload::ItemMinted {
                manufacturer_id: ManufacturerId::from("mfr-lwc"),
                metadata_hash: shared_crypto::sha256(b"Chronograph Elite X1"),
                minting_fee_sats: 25_000,
            },
            actor_signature: ActorSignature {
                public_key: issuer.public_key(),
                signature: [0u8; 64],
            },
        },
        &issuer,
    );
    let item_id = minted.header.item_id.clone();

    let acceptance = shared_types::owner_acceptance_digest(&item_id, &owner.wallet());
    federation.drive(
        EventDraft {
            item_id: Some(item_id.clone()),
            payload: EventPayload::ItemAssigned {
                owner_wallet: owner.wallet(),
                owner_signature: owner.sign(&acceptance),
            },
            actor_signature: ActorSignature {
                public_key: issuer.public_key(),
                signature: [0u8; 64],
            },
        },
        &issuer,
    );

    // Every node materialized the same snapshot.
    for node in &federation.nodes {
        let item = node.get_item(&item_id).unwrap().unwrap();
        assert_eq!(item.current_state, ItemState::ActiveHeld);
        assert_eq!(item.current_owner_wallet, Some(owner.wallet()));
        assert_eq!(item.last_event_height, 3);
    }

    // A client scan across the live federation verifies end to end.
    let gateway = LoopbackGateway {
        nodes: federation
            .nodes
            .iter()
            .map(|n| (n.operator_id().clone(), n.clone()))
            .collect(),
    };
    let verifier = ClientVerifier::new(
        Arc::new(gateway),
        federation.nodes[0].registry().clone(),
        VerifierConfig::default(),
    );
    let result = verifier.scan(&item_id, now_ms()).await;

    assert!(result.is_authentic, "warnings: {:?}", result.warnings);
    assert_eq!(result.events.len(), 3);
    assert_eq!(
        result.manufacturer.unwrap().manufacturer_id,
        ManufacturerId::from("mfr-lwc")
    );
    assert!(result.warnings.is_empty());
}
