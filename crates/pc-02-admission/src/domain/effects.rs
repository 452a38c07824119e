//! # Post-State Computation
//!
//! Builds the snapshot/registry writes an admitted event produces. Runs
//! only after the transition table, preconditions, and signatures have all
//! passed.

use pc_01_event_store::AdmissionEffects;
use shared_types::{
    AdmissionError, Authenticator, Event, EventPayload, Item, ItemState, LockDetails,
    Manufacturer, RegistryStatus,
};

use super::state_machine::transition;

/// Compute the effects of applying `event` on top of `current`.
pub fn compute(event: &Event, current: Option<&Item>) -> Result<AdmissionEffects, AdmissionError> {
    let header = &event.header;

    match &event.payload {
        EventPayload::ManufacturerRegistered {
            manufacturer_id,
            name,
            issuer_public_key,
            ..
        } => Ok(AdmissionEffects {
            manufacturer: Some(Manufacturer {
                manufacturer_id: manufacturer_id.clone(),
                name: name.clone(),
                issuer_public_key: *issuer_public_key,
                status: RegistryStatus::Active,
                registered_at: header.timestamp,
            }),
            ..Default::default()
        }),

        EventPayload::AuthenticatorRegistered {
            authenticator_id,
            name,
            public_key,
            specialization,
            ..
        } => Ok(AdmissionEffects {
            authenticator: Some(Authenticator {
                authenticator_id: authenticator_id.clone(),
                name: name.clone(),
                public_key: *public_key,
                specialization: specialization.clone(),
                status: RegistryStatus::Active,
                registered_at: header.timestamp,
            }),
            ..Default::default()
        }),

        EventPayload::ItemMinted { manufacturer_id, metadata_hash, .. } => {
            Ok(AdmissionEffects {
                item: Some(Item {
                    item_id: header.item_id.clone(),
                    manufacturer_id: manufacturer_id.clone(),
                    metadata_hash: *metadata_hash,
                    current_state: ItemState::Minted,
                    current_owner_wallet: None,
                    custodian_id: None,
                    minted_at: header.timestamp,
                    last_event_hash: header.event_id,
                    last_event_height: header.height,
                    active_lock: None,
                }),
                // The validated previous hash is the manufacturer's
                // registration event; it seeds height 1 of the new log.
                item_log_seed: Some(header.previous_event_hash),
                ..Default::default()
            })
        }

        payload => {
            let current = current.ok_or_else(|| {
                AdmissionError::Transition("event targets a missing item".into())
            })?;
            let next_state = transition(Some(current.current_state), event.kind())
                .ok_or_else(|| {
                    AdmissionError::Transition(format!(
                        "{} not allowed in {}",
                        event.kind().as_str(),
                        current.current_state.as_str()
                    ))
                })?;

            let mut item = current.clone();
            item.current_state = next_state;
            item.last_event_hash = header.event_id;
            item.last_event_height = header.height;

            let mut attestation = None;
            match payload {
                EventPayload::ItemAssigned { owner_wallet, .. } => {
                    item.current_owner_wallet = Some(owner_wallet.clone());
                    item.custodian_id = None;
                }
                EventPayload::ItemLocked {
                    offer_id,
                    seller_wallet,
                    buyer_wallet,
                    price_sats,
                    expiry_timestamp,
                    escrow_fee_sats,
                } => {
                    item.active_lock = Some(LockDetails {
                        offer_id: offer_id.clone(),
                        seller_wallet: seller_wallet.clone(),
                        buyer_wallet: buyer_wallet.clone(),
                        price_sats: *price_sats,
                        expiry_timestamp: *expiry_timestamp,
                        escrow_fee_sats: *escrow_fee_sats,
                    });
                }
                EventPayload::ItemSettled { buyer_wallet, .. } => {
                    item.current_owner_wallet = Some(buyer_wallet.clone());
                    item.active_lock = None;
                }
                EventPayload::ItemUnlockedExpired { .. } => {
                    item.active_lock = None;
                }
                EventPayload::ItemMovedToCustody { custodian_id, .. } => {
                    item.custodian_id = Some(custodian_id.clone());
                }
                EventPayload::ItemBurned { .. } => {
                    item.active_lock = None;
                }
                EventPayload::ItemAuthenticated { attestation: att } => {
                    attestation = Some(att.clone());
                }
                _ => unreachable!("creation payloads handled above"),
            }

            Ok(AdmissionEffects {
                item: Some(item),
                attestation,
                ..Default::default()
            })
        }
    }
}
