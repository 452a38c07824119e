//! # Scan Entities

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use shared_crypto::sha256;
use shared_types::{
    AuthenticationAttestation, CanonicalValue, Event, Hash, Item, ItemId, ItemState, Manufacturer,
    ObjectBuilder, OperatorId, PublicKeyBytes, SignatureBytes,
};

/// One operator's answer to an item-proof request.
///
/// The operator signs the canonical proof body so responses are
/// attributable; the client still re-verifies everything inside.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemProofResponse {
    pub operator_id: OperatorId,
    pub item: Option<Item>,
    pub events: Vec<Event>,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub public_key: PublicKeyBytes,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub signature: SignatureBytes,
}

impl ItemProofResponse {
    /// The digest the serving operator signs: operator id, the claimed
    /// snapshot, and the served event ids.
    pub fn signing_digest(&self) -> Hash {
        let body = ObjectBuilder::new()
            .string("operatorId", self.operator_id.as_str())
            .opt("item", self.item.as_ref().map(|i| i.to_canonical()))
            .field(
                "events",
                CanonicalValue::Array(
                    self.events
                        .iter()
                        .map(|e| CanonicalValue::String(hex::encode(e.header.event_id)))
                        .collect(),
                ),
            )
            .build();
        sha256(&body.encode())
    }
}

/// The tuple responses are grouped by: operators agreeing on all four
/// fields are claiming the same item state.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StateDigest {
    pub item_id: ItemId,
    pub current_state: ItemState,
    pub last_event_hash: Hash,
    pub last_event_height: u64,
}

impl StateDigest {
    pub fn of(item: &Item) -> Self {
        Self {
            item_id: item.item_id.clone(),
            current_state: item.current_state,
            last_event_hash: item.last_event_hash,
            last_event_height: item.last_event_height,
        }
    }
}

/// The outcome of a cross-operator scan: a fully client-verified view of
/// one item, or a stated reason there is none.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub is_authentic: bool,
    pub item: Option<Item>,
    pub events: Vec<Event>,
    pub manufacturer: Option<Manufacturer>,
    pub attestations: Vec<AuthenticationAttestation>,
    /// Whether any event in the accepted chain is anchored in Bitcoin.
    pub anchored: bool,
    pub warnings: Vec<String>,
}

impl ScanResult {
    pub fn failed(warning: impl Into<String>) -> Self {
        Self {
            is_authentic: false,
            item: None,
            events: vec![],
            manufacturer: None,
            attestations: vec![],
            anchored: false,
            warnings: vec![warning.into()],
        }
    }
}
