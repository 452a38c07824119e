//! # Test Utilities
//!
//! A miniature federation for exercising the admission pipeline: operator
//! keypairs, actor keys with derived wallets, a manual clock, and builders
//! for fully-signed events.
//!
//! Production code never touches this module; it is compiled into the
//! library so sibling crates' tests can reuse the same harness.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use pc_01_event_store::{EventStore, InMemoryKVStore, TimeSource};
use shared_crypto::{p2pkh_address, sha256, Secp256k1KeyPair};
use shared_types::{
    owner_acceptance_digest, ActorSignature, AuthenticationAttestation, AuthenticatorId,
    CoreConfig, Event, EventHeader, EventPayload, Hash, Item, ItemId, ManufacturerId, OfferId,
    Operator, OperatorId, OperatorRegistry, OperatorSignature, OperatorStatus, PaymentProof,
    PaymentType, Timestamp, WalletAddress, ZERO_HASH,
};

use crate::pipeline::AdmissionPipeline;
use crate::ports::AcceptRecordedProofs;

/// Deterministic, manually-advanced clock.
#[derive(Clone, Default)]
pub struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    pub fn at(start_ms: u64) -> Self {
        Self(Arc::new(AtomicU64::new(start_ms)))
    }

    pub fn set(&self, now_ms: u64) {
        self.0.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.0.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// An external principal (manufacturer, wallet owner, authenticator).
pub struct ActorKey {
    pub keypair: Secp256k1KeyPair,
}

impl ActorKey {
    pub fn from_seed(seed: u8) -> Self {
        let mut secret = [0u8; 32];
        secret[0] = seed;
        secret[31] = 1;
        Self {
            keypair: Secp256k1KeyPair::from_bytes(secret).expect("seeded secret is in range"),
        }
    }

    pub fn public_key(&self) -> [u8; 33] {
        *self.keypair.public_key().as_bytes()
    }

    pub fn wallet(&self) -> WalletAddress {
        WalletAddress::new(p2pkh_address(&self.public_key()))
    }

    pub fn sign(&self, digest: &Hash) -> ActorSignature {
        ActorSignature {
            public_key: self.public_key(),
            signature: *self.keypair.sign_digest(digest).as_bytes(),
        }
    }
}

/// An M-of-N operator federation with deterministic keys.
pub struct TestFederation {
    pub operator_keys: Vec<Secp256k1KeyPair>,
    pub operators: Vec<Operator>,
    pub config: CoreConfig,
    pub clock: ManualClock,
}

/// A convenient genesis instant for scenarios.
pub const GENESIS_MS: Timestamp = 1_700_000_000_000;

impl TestFederation {
    pub fn new(quorum_m: usize, quorum_n: usize) -> Self {
        let operator_keys: Vec<Secp256k1KeyPair> = (0..quorum_n)
            .map(|i| {
                let mut secret = [0u8; 32];
                secret[0] = 0xA0 + i as u8;
                secret[31] = 1;
                Secp256k1KeyPair::from_bytes(secret).expect("seeded secret is in range")
            })
            .collect();
        let operators = operator_keys
            .iter()
            .enumerate()
            .map(|(i, key)| Operator {
                operator_id: OperatorId::new(format!("op-{i}")),
                public_key: *key.public_key().as_bytes(),
                payout_address: WalletAddress::new(p2pkh_address(key.public_key().as_bytes())),
                endpoint: format!("https://op-{i}.federation.example"),
                status: OperatorStatus::Active,
            })
            .collect();
        let config = CoreConfig {
            quorum_m,
            quorum_n,
            committee_size: quorum_n,
            ..CoreConfig::default()
        };
        Self {
            operator_keys,
            operators,
            config,
            clock: ManualClock::at(GENESIS_MS),
        }
    }

    pub fn registry(&self) -> OperatorRegistry {
        OperatorRegistry::new(self.operators.clone())
    }

    /// A fresh copy of operator `i`'s keypair.
    pub fn operator_key(&self, i: usize) -> Secp256k1KeyPair {
        let mut secret = [0u8; 32];
        secret[0] = 0xA0 + i as u8;
        secret[31] = 1;
        Secp256k1KeyPair::from_bytes(secret).expect("seeded secret is in range")
    }

    /// A fresh pipeline over an empty in-memory store.
    pub fn pipeline(&self) -> AdmissionPipeline<InMemoryKVStore, ManualClock> {
        AdmissionPipeline::new(
            Arc::new(EventStore::new(InMemoryKVStore::new())),
            self.registry(),
            self.config.clone(),
            self.clock.clone(),
            Arc::new(AcceptRecordedProofs),
        )
    }

    /// Attach signatures from the first `count` operators.
    pub fn quorum_sign(&self, event: &mut Event, count: usize) {
        event.header.operator_signatures = self
            .operator_keys
            .iter()
            .take(count)
            .enumerate()
            .map(|(i, key)| OperatorSignature {
                operator_id: OperatorId::new(format!("op-{i}")),
                public_key: *key.public_key().as_bytes(),
                signature: *key.sign_digest(&event.header.event_id).as_bytes(),
            })
            .collect();
    }

    /// Sign a checkpoint hash with the first `count` operators.
    pub fn quorum_sign_hash(&self, hash: &Hash, count: usize) -> Vec<OperatorSignature> {
        self.operator_keys
            .iter()
            .take(count)
            .enumerate()
            .map(|(i, key)| OperatorSignature {
                operator_id: OperatorId::new(format!("op-{i}")),
                public_key: *key.public_key().as_bytes(),
                signature: *key.sign_digest(hash).as_bytes(),
            })
            .collect()
    }
}

fn placeholder_signature() -> ActorSignature {
    ActorSignature {
        public_key: [2u8; 33],
        signature: [0u8; 64],
    }
}

/// Compute the id, then actor-sign it.
fn finalize(mut event: Event, actor: &ActorKey) -> Event {
    event.header.event_id = event.compute_event_id();
    event.header.actor_signature = actor.sign(&event.header.event_id);
    event
}

fn header(item_id: ItemId, height: u64, timestamp: Timestamp, previous: Hash) -> EventHeader {
    EventHeader {
        event_id: ZERO_HASH,
        item_id,
        height,
        timestamp,
        previous_event_hash: previous,
        actor_signature: placeholder_signature(),
        operator_signatures: vec![],
        anchor_tx_hash: None,
    }
}

/// MANUFACTURER_REGISTERED, self-signed by the issuer key.
pub fn manufacturer_registration(
    manufacturer_id: &str,
    name: &str,
    issuer: &ActorKey,
    timestamp: Timestamp,
) -> Event {
    let manufacturer_id = ManufacturerId::from(manufacturer_id);
    let event = Event {
        header: header(ItemId::from(&manufacturer_id), 1, timestamp, ZERO_HASH),
        payload: EventPayload::ManufacturerRegistered {
            manufacturer_id,
            name: name.to_string(),
            issuer_public_key: issuer.public_key(),
            registration_fee_sats: 100_000,
        },
    };
    finalize(event, issuer)
}

/// AUTHENTICATOR_REGISTERED, self-signed.
pub fn authenticator_registration(
    authenticator_id: &str,
    name: &str,
    specialization: &str,
    key: &ActorKey,
    timestamp: Timestamp,
) -> Event {
    let authenticator_id = AuthenticatorId::from(authenticator_id);
    let event = Event {
        header: header(ItemId::from(&authenticator_id), 1, timestamp, ZERO_HASH),
        payload: EventPayload::AuthenticatorRegistered {
            authenticator_id,
            name: name.to_string(),
            public_key: key.public_key(),
            specialization: specialization.to_string(),
            registration_fee_sats: 50_000,
        },
    };
    finalize(event, key)
}

/// ITEM_MINTED by an active manufacturer, chained onto its registration
/// event at height 2.
pub fn mint(
    registration: &Event,
    issuer: &ActorKey,
    metadata: &[u8],
    timestamp: Timestamp,
) -> Event {
    let EventPayload::ManufacturerRegistered { manufacturer_id, .. } = &registration.payload
    else {
        panic!("mint must chain from a manufacturer registration");
    };
    let metadata_hash = sha256(metadata);
    let item_id = ItemId::derive(manufacturer_id, &metadata_hash, timestamp);
    let event = Event {
        header: header(item_id, 2, timestamp, registration.header.event_id),
        payload: EventPayload::ItemMinted {
            manufacturer_id: manufacturer_id.clone(),
            metadata_hash,
            minting_fee_sats: 25_000,
        },
    };
    finalize(event, issuer)
}

/// ITEM_ASSIGNED to `new_owner`, signed by the current controller.
pub fn assign(item: &Item, signer: &ActorKey, new_owner: &ActorKey, timestamp: Timestamp) -> Event {
    let owner_wallet = new_owner.wallet();
    let acceptance = owner_acceptance_digest(&item.item_id, &owner_wallet);
    let event = Event {
        header: header(
            item.item_id.clone(),
            item.last_event_height + 1,
            timestamp,
            item.last_event_hash,
        ),
        payload: EventPayload::ItemAssigned {
            owner_wallet,
            owner_signature: new_owner.sign(&acceptance),
        },
    };
    finalize(event, signer)
}

/// ITEM_LOCKED by the owner as seller.
#[allow(clippy::too_many_arguments)]
pub fn lock(
    item: &Item,
    owner: &ActorKey,
    offer_id: &str,
    buyer: &WalletAddress,
    price_sats: u64,
    expiry_timestamp: Timestamp,
    timestamp: Timestamp,
) -> Event {
    let event = Event {
        header: header(
            item.item_id.clone(),
            item.last_event_height + 1,
            timestamp,
            item.last_event_hash,
        ),
        payload: EventPayload::ItemLocked {
            offer_id: OfferId::from(offer_id),
            seller_wallet: owner.wallet(),
            buyer_wallet: buyer.clone(),
            price_sats,
            expiry_timestamp,
            escrow_fee_sats: 1_000_000,
        },
    };
    finalize(event, owner)
}

/// ITEM_SETTLED by the locked buyer with an on-chain proof.
pub fn settle(item: &Item, buyer: &ActorKey, timestamp: Timestamp) -> Event {
    let lock = item.active_lock.as_ref().expect("item must be locked");
    let event = Event {
        header: header(
            item.item_id.clone(),
            item.last_event_height + 1,
            timestamp,
            item.last_event_hash,
        ),
        payload: EventPayload::ItemSettled {
            offer_id: lock.offer_id.clone(),
            buyer_wallet: lock.buyer_wallet.clone(),
            price_sats: lock.price_sats,
            payment_proof: PaymentProof {
                payment_type: PaymentType::Onchain,
                tx_hash: Some("c0ffee".repeat(10) + "abcd"),
                payment_hash: None,
                preimage: None,
                amount_sats: lock.price_sats,
                confirmations: Some(1),
                verified_at: timestamp,
            },
            settlement_fee_sats: 500_000,
        },
    };
    finalize(event, buyer)
}

/// ITEM_UNLOCKED_EXPIRED submitted by the seller after expiry.
pub fn unlock_expired(item: &Item, owner: &ActorKey, timestamp: Timestamp) -> Event {
    let lock = item.active_lock.as_ref().expect("item must be locked");
    let event = Event {
        header: header(
            item.item_id.clone(),
            item.last_event_height + 1,
            timestamp,
            item.last_event_hash,
        ),
        payload: EventPayload::ItemUnlockedExpired {
            offer_id: lock.offer_id.clone(),
            expiry_timestamp: lock.expiry_timestamp,
        },
    };
    finalize(event, owner)
}

/// ITEM_MOVED_TO_CUSTODY signed by the current controller.
pub fn custody(
    item: &Item,
    signer: &ActorKey,
    custodian_id: &str,
    reason: &str,
    timestamp: Timestamp,
) -> Event {
    let event = Event {
        header: header(
            item.item_id.clone(),
            item.last_event_height + 1,
            timestamp,
            item.last_event_hash,
        ),
        payload: EventPayload::ItemMovedToCustody {
            custodian_id: custodian_id.to_string(),
            reason: reason.to_string(),
        },
    };
    finalize(event, signer)
}

/// ITEM_BURNED signed by the current controller.
pub fn burn(item: &Item, signer: &ActorKey, reason: &str, timestamp: Timestamp) -> Event {
    let event = Event {
        header: header(
            item.item_id.clone(),
            item.last_event_height + 1,
            timestamp,
            item.last_event_hash,
        ),
        payload: EventPayload::ItemBurned {
            reason: reason.to_string(),
            burn_proof: None,
        },
    };
    finalize(event, signer)
}

/// ITEM_AUTHENTICATED with a fresh attestation by `authenticator`.
pub fn authenticate(
    item: &Item,
    authenticator_id: &str,
    authenticator: &ActorKey,
    confidence: f64,
    timestamp: Timestamp,
) -> Event {
    let mut attestation = AuthenticationAttestation {
        attestation_id: shared_types::AttestationId::new(format!(
            "att-{}-{timestamp}",
            &item.item_id.as_str()[..8]
        )),
        item_id: item.item_id.clone(),
        authenticator_id: AuthenticatorId::from(authenticator_id),
        confidence,
        scope: "full-physical".to_string(),
        notes: None,
        expiry_timestamp: None,
        issued_at: timestamp,
        authenticator_signature: [0u8; 64],
    };
    let digest = sha256(&attestation.signing_bytes());
    attestation.authenticator_signature =
        *authenticator.keypair.sign_digest(&digest).as_bytes();

    let event = Event {
        header: header(
            item.item_id.clone(),
            item.last_event_height + 1,
            timestamp,
            item.last_event_hash,
        ),
        payload: EventPayload::ItemAuthenticated { attestation },
    };
    finalize(event, authenticator)
}
