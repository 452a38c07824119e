//! # Event Model
//!
//! Typed event variants with a shared header, plus the deterministic
//! encoding used both to compute `eventId` and as the signing message.
//!
//! ## Identity
//!
//! `eventId = SHA-256(canonical(event))` where the canonical form contains
//! every header and payload field except `eventId`, `actorSignature`,
//! `operatorSignatures`, and `anchorTxHash`. The signature fields are
//! excluded because they are computed *over* the id; the anchor txid is
//! excluded because it is decoration applied after admission, exactly as a
//! checkpoint's anchor fields are excluded from its hash.
//!
//! Both actors and operators sign the 32-byte `eventId` itself.

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::canonical::{CanonicalValue, ObjectBuilder};
use crate::entities::{
    ActorSignature, AuthenticationAttestation, AuthenticatorId, Hash, ItemId, ManufacturerId,
    OfferId, OperatorSignature, PaymentProof, PublicKeyBytes, Timestamp, WalletAddress,
};
use shared_crypto::hashing::sha256;

/// Discriminant of an event, used by the transition table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "MANUFACTURER_REGISTERED")]
    ManufacturerRegistered,
    #[serde(rename = "ITEM_MINTED")]
    ItemMinted,
    #[serde(rename = "ITEM_ASSIGNED")]
    ItemAssigned,
    #[serde(rename = "ITEM_LOCKED")]
    ItemLocked,
    #[serde(rename = "ITEM_SETTLED")]
    ItemSettled,
    #[serde(rename = "ITEM_UNLOCKED_EXPIRED")]
    ItemUnlockedExpired,
    #[serde(rename = "ITEM_MOVED_TO_CUSTODY")]
    ItemMovedToCustody,
    #[serde(rename = "ITEM_BURNED")]
    ItemBurned,
    #[serde(rename = "AUTHENTICATOR_REGISTERED")]
    AuthenticatorRegistered,
    #[serde(rename = "ITEM_AUTHENTICATED")]
    ItemAuthenticated,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ManufacturerRegistered => "MANUFACTURER_REGISTERED",
            EventKind::ItemMinted => "ITEM_MINTED",
            EventKind::ItemAssigned => "ITEM_ASSIGNED",
            EventKind::ItemLocked => "ITEM_LOCKED",
            EventKind::ItemSettled => "ITEM_SETTLED",
            EventKind::ItemUnlockedExpired => "ITEM_UNLOCKED_EXPIRED",
            EventKind::ItemMovedToCustody => "ITEM_MOVED_TO_CUSTODY",
            EventKind::ItemBurned => "ITEM_BURNED",
            EventKind::AuthenticatorRegistered => "AUTHENTICATOR_REGISTERED",
            EventKind::ItemAuthenticated => "ITEM_AUTHENTICATED",
        }
    }

    /// Registration events start a log of their own and chain from the
    /// zero hash. An `ITEM_MINTED` is not one of these: an item's log
    /// begins with its manufacturer's registration event, and the mint
    /// chains from it at height 2.
    pub fn is_registration(self) -> bool {
        matches!(
            self,
            EventKind::ManufacturerRegistered | EventKind::AuthenticatorRegistered
        )
    }
}

/// Fields shared by every event.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHeader {
    #[serde_as(as = "serde_with::hex::Hex")]
    pub event_id: Hash,
    pub item_id: ItemId,
    /// Strictly sequential per log, starting at 1.
    pub height: u64,
    pub timestamp: Timestamp,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub previous_event_hash: Hash,
    pub actor_signature: ActorSignature,
    pub operator_signatures: Vec<OperatorSignature>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub anchor_tx_hash: Option<String>,
}

/// Payload of each event variant.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum EventPayload {
    #[serde(rename = "MANUFACTURER_REGISTERED", rename_all = "camelCase")]
    ManufacturerRegistered {
        manufacturer_id: ManufacturerId,
        name: String,
        #[serde_as(as = "serde_with::hex::Hex")]
        issuer_public_key: PublicKeyBytes,
        registration_fee_sats: u64,
    },
    #[serde(rename = "ITEM_MINTED", rename_all = "camelCase")]
    ItemMinted {
        manufacturer_id: ManufacturerId,
        #[serde_as(as = "serde_with::hex::Hex")]
        metadata_hash: Hash,
        minting_fee_sats: u64,
    },
    #[serde(rename = "ITEM_ASSIGNED", rename_all = "camelCase")]
    ItemAssigned {
        owner_wallet: WalletAddress,
        /// The incoming owner's acceptance, signed over
        /// `canonical({itemId, ownerWallet})`.
        owner_signature: ActorSignature,
    },
    #[serde(rename = "ITEM_LOCKED", rename_all = "camelCase")]
    ItemLocked {
        offer_id: OfferId,
        seller_wallet: WalletAddress,
        buyer_wallet: WalletAddress,
        price_sats: u64,
        expiry_timestamp: Timestamp,
        escrow_fee_sats: u64,
    },
    #[serde(rename = "ITEM_SETTLED", rename_all = "camelCase")]
    ItemSettled {
        offer_id: OfferId,
        buyer_wallet: WalletAddress,
        price_sats: u64,
        payment_proof: PaymentProof,
        settlement_fee_sats: u64,
    },
    #[serde(rename = "ITEM_UNLOCKED_EXPIRED", rename_all = "camelCase")]
    ItemUnlockedExpired {
        offer_id: OfferId,
        expiry_timestamp: Timestamp,
    },
    #[serde(rename = "ITEM_MOVED_TO_CUSTODY", rename_all = "camelCase")]
    ItemMovedToCustody {
        custodian_id: String,
        reason: String,
    },
    #[serde(rename = "ITEM_BURNED", rename_all = "camelCase")]
    ItemBurned {
        reason: String,
        burn_proof: Option<String>,
    },
    #[serde(rename = "AUTHENTICATOR_REGISTERED", rename_all = "camelCase")]
    AuthenticatorRegistered {
        authenticator_id: AuthenticatorId,
        name: String,
        #[serde_as(as = "serde_with::hex::Hex")]
        public_key: PublicKeyBytes,
        specialization: String,
        registration_fee_sats: u64,
    },
    #[serde(rename = "ITEM_AUTHENTICATED", rename_all = "camelCase")]
    ItemAuthenticated {
        attestation: AuthenticationAttestation,
    },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::ManufacturerRegistered { .. } => EventKind::ManufacturerRegistered,
            EventPayload::ItemMinted { .. } => EventKind::ItemMinted,
            EventPayload::ItemAssigned { .. } => EventKind::ItemAssigned,
            EventPayload::ItemLocked { .. } => EventKind::ItemLocked,
            EventPayload::ItemSettled { .. } => EventKind::ItemSettled,
            EventPayload::ItemUnlockedExpired { .. } => EventKind::ItemUnlockedExpired,
            EventPayload::ItemMovedToCustody { .. } => EventKind::ItemMovedToCustody,
            EventPayload::ItemBurned { .. } => EventKind::ItemBurned,
            EventPayload::AuthenticatorRegistered { .. } => EventKind::AuthenticatorRegistered,
            EventPayload::ItemAuthenticated { .. } => EventKind::ItemAuthenticated,
        }
    }

    fn canonical_fields(&self, builder: ObjectBuilder) -> ObjectBuilder {
        match self {
            EventPayload::ManufacturerRegistered {
                manufacturer_id,
                name,
                issuer_public_key,
                registration_fee_sats,
            } => builder
                .string("manufacturerId", manufacturer_id.as_str())
                .string("name", name)
                .hex("issuerPublicKey", issuer_public_key)
                .uint("registrationFeeSats", *registration_fee_sats),
            EventPayload::ItemMinted {
                manufacturer_id,
                metadata_hash,
                minting_fee_sats,
            } => builder
                .string("manufacturerId", manufacturer_id.as_str())
                .hex("metadataHash", metadata_hash)
                .uint("mintingFeeSats", *minting_fee_sats),
            EventPayload::ItemAssigned {
                owner_wallet,
                owner_signature,
            } => builder
                .string("ownerWallet", owner_wallet.as_str())
                .field("ownerSignature", owner_signature.to_canonical()),
            EventPayload::ItemLocked {
                offer_id,
                seller_wallet,
                buyer_wallet,
                price_sats,
                expiry_timestamp,
                escrow_fee_sats,
            } => builder
                .string("offerId", offer_id.as_str())
                .string("sellerWallet", seller_wallet.as_str())
                .string("buyerWallet", buyer_wallet.as_str())
                .uint("priceSats", *price_sats)
                .uint("expiryTimestamp", *expiry_timestamp)
                .uint("escrowFeeSats", *escrow_fee_sats),
            EventPayload::ItemSettled {
                offer_id,
                buyer_wallet,
                price_sats,
                payment_proof,
                settlement_fee_sats,
            } => builder
                .string("offerId", offer_id.as_str())
                .string("buyerWallet", buyer_wallet.as_str())
                .uint("priceSats", *price_sats)
                .field("paymentProof", payment_proof.to_canonical())
                .uint("settlementFeeSats", *settlement_fee_sats),
            EventPayload::ItemUnlockedExpired {
                offer_id,
                expiry_timestamp,
            } => builder
                .string("offerId", offer_id.as_str())
                .uint("expiryTimestamp", *expiry_timestamp),
            EventPayload::ItemMovedToCustody { custodian_id, reason } => builder
                .string("custodianId", custodian_id)
                .string("reason", reason),
            EventPayload::ItemBurned { reason, burn_proof } => builder
                .string("reason", reason)
                .opt(
                    "burnProof",
                    burn_proof.as_ref().map(|p| CanonicalValue::String(p.clone())),
                ),
            EventPayload::AuthenticatorRegistered {
                authenticator_id,
                name,
                public_key,
                specialization,
                registration_fee_sats,
            } => builder
                .string("authenticatorId", authenticator_id.as_str())
                .string("name", name)
                .hex("publicKey", public_key)
                .string("specialization", specialization)
                .uint("registrationFeeSats", *registration_fee_sats),
            EventPayload::ItemAuthenticated { attestation } => {
                builder.field("attestation", attestation.to_canonical())
            }
        }
    }
}

/// A complete protocol event: shared header plus one typed payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub header: EventHeader,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// The canonical value the event id and every signature commit to.
    pub fn signing_value(&self) -> CanonicalValue {
        let builder = ObjectBuilder::new()
            .string("eventType", self.kind().as_str())
            .string("itemId", self.header.item_id.as_str())
            .uint("height", self.header.height)
            .uint("timestamp", self.header.timestamp)
            .hex("previousEventHash", &self.header.previous_event_hash);
        self.payload.canonical_fields(builder).build()
    }

    /// Recompute the event id from the canonical signing bytes.
    pub fn compute_event_id(&self) -> Hash {
        sha256(&self.signing_value().encode())
    }

    /// Whether the stored `eventId` matches a fresh recomputation.
    pub fn id_is_consistent(&self) -> bool {
        self.header.event_id == self.compute_event_id()
    }

    /// Full canonical encoding, including id, operator signatures, and any
    /// anchor txid. This is what the content-addressed blob store holds.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let signed = self.signing_value();
        let mut members = match signed {
            CanonicalValue::Object(members) => members,
            _ => unreachable!("event canonical form is an object"),
        };
        members.insert(
            "eventId".to_string(),
            CanonicalValue::String(hex::encode(self.header.event_id)),
        );
        members.insert(
            "actorSignature".to_string(),
            self.header.actor_signature.to_canonical(),
        );
        members.insert(
            "operatorSignatures".to_string(),
            CanonicalValue::Array(
                self.header
                    .operator_signatures
                    .iter()
                    .map(|s| s.to_canonical())
                    .collect(),
            ),
        );
        if let Some(txid) = &self.header.anchor_tx_hash {
            members.insert(
                "anchorTxHash".to_string(),
                CanonicalValue::String(txid.clone()),
            );
        }
        CanonicalValue::Object(members).encode()
    }
}

/// The acceptance message an incoming owner signs for `ITEM_ASSIGNED`.
///
/// Signing the event id itself would be circular here, because the
/// signature is part of the payload the id commits to.
pub fn owner_acceptance_digest(item_id: &ItemId, owner_wallet: &WalletAddress) -> Hash {
    let bytes = ObjectBuilder::new()
        .string("itemId", item_id.as_str())
        .string("ownerWallet", owner_wallet.as_str())
        .build()
        .encode();
    sha256(&bytes)
}

/// A partial event handed to `propose_event`: everything except the chain
/// position fields the proposing operator fills in.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    /// Target log; `None` for creations, whose key the proposer derives.
    pub item_id: Option<ItemId>,
    #[serde(flatten)]
    pub payload: EventPayload,
    pub actor_signature: ActorSignature,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{OperatorId, ZERO_HASH};

    fn mint_event() -> Event {
        let manufacturer_id = ManufacturerId::from("mfr-lwc");
        let metadata_hash = sha256(b"Chronograph Elite X1|LWC-2024-001234");
        let timestamp = 1_700_000_000_000;
        let item_id = ItemId::derive(&manufacturer_id, &metadata_hash, timestamp);
        let mut event = Event {
            header: EventHeader {
                event_id: ZERO_HASH,
                item_id,
                height: 1,
                timestamp,
                previous_event_hash: ZERO_HASH,
                actor_signature: ActorSignature {
                    public_key: [2u8; 33],
                    signature: [9u8; 64],
                },
                operator_signatures: vec![],
                anchor_tx_hash: None,
            },
            payload: EventPayload::ItemMinted {
                manufacturer_id,
                metadata_hash,
                minting_fee_sats: 25_000,
            },
        };
        event.header.event_id = event.compute_event_id();
        event
    }

    #[test]
    fn event_id_ignores_signatures_and_anchor() {
        let mut event = mint_event();
        let id = event.header.event_id;
        event.header.operator_signatures.push(OperatorSignature {
            operator_id: OperatorId::from("op-1"),
            public_key: [3u8; 33],
            signature: [4u8; 64],
        });
        event.header.anchor_tx_hash = Some("f".repeat(64));
        // The actor signs the id, so the id cannot commit to the signature.
        event.header.actor_signature.signature = [8u8; 64];
        assert_eq!(event.compute_event_id(), id);
        assert!(event.id_is_consistent());
    }

    #[test]
    fn event_id_commits_to_payload() {
        let event = mint_event();
        let mut altered = event.clone();
        if let EventPayload::ItemMinted { minting_fee_sats, .. } = &mut altered.payload {
            *minting_fee_sats += 1;
        }
        assert_ne!(event.compute_event_id(), altered.compute_event_id());
        assert!(!altered.id_is_consistent());
    }

    #[test]
    fn canonical_bytes_reparse() {
        let mut event = mint_event();
        event.header.operator_signatures.push(OperatorSignature {
            operator_id: OperatorId::from("op-1"),
            public_key: [3u8; 33],
            signature: [4u8; 64],
        });
        let bytes = event.canonical_bytes();
        let parsed = CanonicalValue::parse(&bytes).unwrap();
        assert_eq!(parsed.encode(), bytes);
    }

    #[test]
    fn serde_json_roundtrip_keeps_tag() {
        let event = mint_event();
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"eventType\":\"ITEM_MINTED\""));
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
