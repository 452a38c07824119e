//! # Core Domain Entities
//!
//! The registry's durable nouns, shared by every subsystem.
//!
//! ## Clusters
//!
//! - **Registry**: `Manufacturer`, `Authenticator`, `RegistryStatus`
//! - **Items**: `Item`, `ItemState`, `LockDetails`
//! - **Federation**: `Operator`, `OperatorSignature`, `ActorSignature`
//! - **Attestations**: `AuthenticationAttestation`
//! - **Payments**: `PaymentProof`, `PaymentType`

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::fmt;

use crate::canonical::{CanonicalValue, ObjectBuilder};
use shared_crypto::hashing::sha256;

/// A 32-byte SHA-256 hash.
pub type Hash = [u8; 32];

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// The all-zero hash used as `previousEventHash` for creation events.
pub const ZERO_HASH: Hash = [0u8; 32];

/// A compressed secp256k1 public key (33 bytes).
pub type PublicKeyBytes = [u8; 33];

/// An ECDSA signature in r||s form (64 bytes).
pub type SignatureBytes = [u8; 64];

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id! {
    /// Registry identifier of a manufacturer.
    ManufacturerId
}
string_id! {
    /// Registry identifier of an authenticator.
    AuthenticatorId
}
string_id! {
    /// Identifier of a federation operator.
    OperatorId
}
string_id! {
    /// Identifier of an escrow offer.
    OfferId
}
string_id! {
    /// Identifier of an authentication attestation.
    AttestationId
}
string_id! {
    /// A Bitcoin-style wallet address.
    WalletAddress
}

/// Per-log key of an event chain.
///
/// For item events this is the lowercase hex of the derived item hash. For
/// `MANUFACTURER_REGISTERED` / `AUTHENTICATOR_REGISTERED`, which precede any
/// item, the subject's registry id stands in as the log key so every event
/// stays uniformly header-carrying.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Derive an item id: `H(manufacturerId || metadataHash || mintTimestamp)`.
    pub fn derive(
        manufacturer_id: &ManufacturerId,
        metadata_hash: &Hash,
        minted_at: Timestamp,
    ) -> Self {
        let mut preimage = Vec::with_capacity(96);
        preimage.extend_from_slice(manufacturer_id.as_str().as_bytes());
        preimage.extend_from_slice(hex::encode(metadata_hash).as_bytes());
        preimage.extend_from_slice(minted_at.to_string().as_bytes());
        Self(hex::encode(sha256(&preimage)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&ManufacturerId> for ItemId {
    fn from(id: &ManufacturerId) -> Self {
        Self(id.0.clone())
    }
}

impl From<&AuthenticatorId> for ItemId {
    fn from(id: &AuthenticatorId) -> Self {
        Self(id.0.clone())
    }
}

/// Lifecycle status of a registered manufacturer or authenticator.
///
/// Status only moves forward: `Active → Suspended → Revoked`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RegistryStatus {
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "SUSPENDED")]
    Suspended,
    #[serde(rename = "REVOKED")]
    Revoked,
}

impl RegistryStatus {
    pub fn is_active(self) -> bool {
        self == RegistryStatus::Active
    }

    /// Whether a transition to `next` respects the forward-only rule.
    pub fn can_advance_to(self, next: RegistryStatus) -> bool {
        next > self
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RegistryStatus::Active => "ACTIVE",
            RegistryStatus::Suspended => "SUSPENDED",
            RegistryStatus::Revoked => "REVOKED",
        }
    }
}

/// A registered manufacturer; the only principal allowed to mint items.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manufacturer {
    pub manufacturer_id: ManufacturerId,
    pub name: String,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub issuer_public_key: PublicKeyBytes,
    pub status: RegistryStatus,
    pub registered_at: Timestamp,
}

/// A registered authenticator issuing item attestations.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authenticator {
    pub authenticator_id: AuthenticatorId,
    pub name: String,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub public_key: PublicKeyBytes,
    pub specialization: String,
    pub status: RegistryStatus,
    pub registered_at: Timestamp,
}

/// Operational status of a federation operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorStatus {
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "INACTIVE")]
    Inactive,
}

/// A federation operator node.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operator {
    pub operator_id: OperatorId,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub public_key: PublicKeyBytes,
    pub payout_address: WalletAddress,
    pub endpoint: String,
    pub status: OperatorStatus,
}

/// The position of an item in the five-state custody automaton.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemState {
    #[serde(rename = "MINTED")]
    Minted,
    #[serde(rename = "ACTIVE_HELD")]
    ActiveHeld,
    #[serde(rename = "LOCKED_IN_ESCROW")]
    LockedInEscrow,
    #[serde(rename = "IN_CUSTODY")]
    InCustody,
    #[serde(rename = "BURNED")]
    Burned,
}

impl ItemState {
    /// BURNED accepts no further events.
    pub fn is_terminal(self) -> bool {
        self == ItemState::Burned
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemState::Minted => "MINTED",
            ItemState::ActiveHeld => "ACTIVE_HELD",
            ItemState::LockedInEscrow => "LOCKED_IN_ESCROW",
            ItemState::InCustody => "IN_CUSTODY",
            ItemState::Burned => "BURNED",
        }
    }
}

/// The escrow lock carried by an item while `LOCKED_IN_ESCROW`.
///
/// Kept on the snapshot so settle/unlock preconditions read in O(1) instead
/// of replaying the log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockDetails {
    pub offer_id: OfferId,
    pub seller_wallet: WalletAddress,
    pub buyer_wallet: WalletAddress,
    pub price_sats: u64,
    pub expiry_timestamp: Timestamp,
    pub escrow_fee_sats: u64,
}

/// Materialized snapshot of one item.
///
/// Created by `ITEM_MINTED` and mutated only through admitted transitions.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub item_id: ItemId,
    pub manufacturer_id: ManufacturerId,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub metadata_hash: Hash,
    pub current_state: ItemState,
    pub current_owner_wallet: Option<WalletAddress>,
    pub custodian_id: Option<String>,
    pub minted_at: Timestamp,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub last_event_hash: Hash,
    pub last_event_height: u64,
    pub active_lock: Option<LockDetails>,
}

impl Item {
    /// Canonical form used inside operator-signed item proofs.
    pub fn to_canonical(&self) -> CanonicalValue {
        ObjectBuilder::new()
            .string("itemId", self.item_id.as_str())
            .string("manufacturerId", self.manufacturer_id.as_str())
            .hex("metadataHash", &self.metadata_hash)
            .string("currentState", self.current_state.as_str())
            .opt(
                "currentOwnerWallet",
                self.current_owner_wallet
                    .as_ref()
                    .map(|w| CanonicalValue::String(w.0.clone())),
            )
            .uint("mintedAt", self.minted_at)
            .hex("lastEventHash", &self.last_event_hash)
            .uint("lastEventHeight", self.last_event_height)
            .build()
    }
}

/// Settlement proof-of-payment, produced by an external payment monitor.
///
/// The core only enforces the numeric invariants; checking the proof against
/// the outside world is the injected adapter's job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProof {
    pub payment_type: PaymentType,
    pub tx_hash: Option<String>,
    pub payment_hash: Option<String>,
    pub preimage: Option<String>,
    pub amount_sats: u64,
    pub confirmations: Option<u32>,
    pub verified_at: Timestamp,
}

impl PaymentProof {
    pub fn to_canonical(&self) -> CanonicalValue {
        ObjectBuilder::new()
            .string("paymentType", self.payment_type.as_str())
            .opt(
                "txHash",
                self.tx_hash.as_ref().map(|s| CanonicalValue::String(s.clone())),
            )
            .opt(
                "paymentHash",
                self.payment_hash
                    .as_ref()
                    .map(|s| CanonicalValue::String(s.clone())),
            )
            .opt(
                "preimage",
                self.preimage.as_ref().map(|s| CanonicalValue::String(s.clone())),
            )
            .uint("amountSats", self.amount_sats)
            .opt(
                "confirmations",
                self.confirmations.map(|c| CanonicalValue::UInt(c as u64)),
            )
            .uint("verifiedAt", self.verified_at)
            .build()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentType {
    #[serde(rename = "ONCHAIN")]
    Onchain,
    #[serde(rename = "LIGHTNING")]
    Lightning,
}

impl PaymentType {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentType::Onchain => "ONCHAIN",
            PaymentType::Lightning => "LIGHTNING",
        }
    }
}

/// A signed statement by an authenticator about a physical item.
///
/// Informational only; never moves the item automaton.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationAttestation {
    pub attestation_id: AttestationId,
    pub item_id: ItemId,
    pub authenticator_id: AuthenticatorId,
    /// Confidence in authenticity, in `[0, 1]`.
    pub confidence: f64,
    pub scope: String,
    pub notes: Option<String>,
    pub expiry_timestamp: Option<Timestamp>,
    pub issued_at: Timestamp,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub authenticator_signature: SignatureBytes,
}

impl AuthenticationAttestation {
    fn signed_fields(&self) -> ObjectBuilder {
        ObjectBuilder::new()
            .string("attestationId", self.attestation_id.as_str())
            .string("itemId", self.item_id.as_str())
            .string("authenticatorId", self.authenticator_id.as_str())
            .field(
                "confidence",
                CanonicalValue::float(self.confidence).unwrap_or(CanonicalValue::UInt(0)),
            )
            .string("scope", &self.scope)
            .opt(
                "notes",
                self.notes.as_ref().map(|n| CanonicalValue::String(n.clone())),
            )
            .opt(
                "expiryTimestamp",
                self.expiry_timestamp.map(CanonicalValue::UInt),
            )
            .uint("issuedAt", self.issued_at)
    }

    /// The canonical bytes the authenticator signs: the attestation without
    /// `authenticatorSignature`.
    pub fn signing_bytes(&self) -> Vec<u8> {
        self.signed_fields().build().encode()
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        matches!(self.expiry_timestamp, Some(expiry) if now >= expiry)
    }

    pub fn to_canonical(&self) -> CanonicalValue {
        self.signed_fields()
            .hex("authenticatorSignature", &self.authenticator_signature)
            .build()
    }
}

/// Signature by a non-operator principal over an event id.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorSignature {
    #[serde_as(as = "serde_with::hex::Hex")]
    pub public_key: PublicKeyBytes,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub signature: SignatureBytes,
}

impl ActorSignature {
    pub fn to_canonical(&self) -> CanonicalValue {
        ObjectBuilder::new()
            .hex("publicKey", &self.public_key)
            .hex("signature", &self.signature)
            .build()
    }
}

/// One operator's co-signature over an event id or checkpoint hash.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorSignature {
    pub operator_id: OperatorId,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub public_key: PublicKeyBytes,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub signature: SignatureBytes,
}

impl OperatorSignature {
    pub fn to_canonical(&self) -> CanonicalValue {
        ObjectBuilder::new()
            .string("operatorId", self.operator_id.as_str())
            .hex("publicKey", &self.public_key)
            .hex("signature", &self.signature)
            .build()
    }
}
