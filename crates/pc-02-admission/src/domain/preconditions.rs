//! # Transition Preconditions
//!
//! Per-event checks layered on top of the transition table. All checks are
//! pure over the resolved context; the pipeline does the lookups.

use shared_types::{
    AdmissionError, Authenticator, Event, EventPayload, Item, Manufacturer, PaymentType,
};

/// Entities the current event may reference, resolved by the pipeline.
#[derive(Clone, Copy, Default)]
pub struct TransitionContext<'a> {
    pub item: Option<&'a Item>,
    pub manufacturer: Option<&'a Manufacturer>,
    pub authenticator: Option<&'a Authenticator>,
    /// Confirmations an on-chain settlement proof must carry.
    pub min_confirmations: u32,
}

/// Check the per-event preconditions. The transition table has already
/// admitted the `(state, kind)` pair when this runs.
pub fn check(event: &Event, ctx: &TransitionContext<'_>) -> Result<(), AdmissionError> {
    match &event.payload {
        EventPayload::ItemMinted { manufacturer_id, .. } => {
            let manufacturer = ctx.manufacturer.ok_or_else(|| {
                AdmissionError::Registry(format!("manufacturer {manufacturer_id} not registered"))
            })?;
            if !manufacturer.status.is_active() {
                return Err(AdmissionError::Registry(format!(
                    "manufacturer {manufacturer_id} is {}",
                    manufacturer.status.as_str()
                )));
            }
            Ok(())
        }

        EventPayload::ItemLocked {
            seller_wallet,
            buyer_wallet,
            price_sats,
            expiry_timestamp,
            ..
        } => {
            let item = expect_item(ctx)?;
            match &item.current_owner_wallet {
                Some(owner) if owner == seller_wallet => {}
                Some(owner) => {
                    return Err(AdmissionError::Transition(format!(
                        "seller {seller_wallet} is not the current owner {owner}"
                    )))
                }
                None => {
                    return Err(AdmissionError::Transition(
                        "item has no owner to sell from".into(),
                    ))
                }
            }
            if buyer_wallet == seller_wallet {
                return Err(AdmissionError::Transition(
                    "buyer and seller wallets must differ".into(),
                ));
            }
            if *price_sats == 0 {
                return Err(AdmissionError::Transition("price must be positive".into()));
            }
            if *expiry_timestamp <= event.header.timestamp {
                return Err(AdmissionError::Transition(format!(
                    "expiry {expiry_timestamp} not after event timestamp {}",
                    event.header.timestamp
                )));
            }
            Ok(())
        }

        EventPayload::ItemSettled {
            offer_id,
            buyer_wallet,
            price_sats,
            payment_proof,
            ..
        } => {
            let item = expect_item(ctx)?;
            let lock = item.active_lock.as_ref().ok_or_else(|| {
                AdmissionError::Transition("item carries no active lock".into())
            })?;
            if lock.offer_id != *offer_id {
                return Err(AdmissionError::Transition(format!(
                    "offer {offer_id} does not match locked offer {}",
                    lock.offer_id
                )));
            }
            if lock.buyer_wallet != *buyer_wallet {
                return Err(AdmissionError::Transition(format!(
                    "buyer {buyer_wallet} does not match locked buyer {}",
                    lock.buyer_wallet
                )));
            }
            if lock.price_sats != *price_sats {
                return Err(AdmissionError::Transition(format!(
                    "price {price_sats} does not match locked price {}",
                    lock.price_sats
                )));
            }
            if payment_proof.amount_sats < *price_sats {
                return Err(AdmissionError::Transition(format!(
                    "payment of {} sats below price {price_sats}",
                    payment_proof.amount_sats
                )));
            }
            if payment_proof.payment_type == PaymentType::Onchain
                && payment_proof.confirmations.unwrap_or(0) < ctx.min_confirmations
            {
                return Err(AdmissionError::Transition(format!(
                    "on-chain proof has {} confirmations, need {}",
                    payment_proof.confirmations.unwrap_or(0),
                    ctx.min_confirmations
                )));
            }
            Ok(())
        }

        EventPayload::ItemUnlockedExpired { offer_id, .. } => {
            let item = expect_item(ctx)?;
            let lock = item.active_lock.as_ref().ok_or_else(|| {
                AdmissionError::Transition("item carries no active lock".into())
            })?;
            if lock.offer_id != *offer_id {
                return Err(AdmissionError::Transition(format!(
                    "offer {offer_id} does not match locked offer {}",
                    lock.offer_id
                )));
            }
            if event.header.timestamp < lock.expiry_timestamp {
                return Err(AdmissionError::Transition(format!(
                    "lock has not expired: {} < {}",
                    event.header.timestamp, lock.expiry_timestamp
                )));
            }
            Ok(())
        }

        EventPayload::ItemAuthenticated { attestation } => {
            let authenticator = ctx.authenticator.ok_or_else(|| {
                AdmissionError::Registry(format!(
                    "authenticator {} not registered",
                    attestation.authenticator_id
                ))
            })?;
            if !authenticator.status.is_active() {
                return Err(AdmissionError::Registry(format!(
                    "authenticator {} is {}",
                    attestation.authenticator_id,
                    authenticator.status.as_str()
                )));
            }
            Ok(())
        }

        // Custody and burn need nothing beyond the transition table; the
        // table already excludes locked and burned sources.
        EventPayload::ItemAssigned { .. }
        | EventPayload::ItemMovedToCustody { .. }
        | EventPayload::ItemBurned { .. }
        | EventPayload::ManufacturerRegistered { .. }
        | EventPayload::AuthenticatorRegistered { .. } => Ok(()),
    }
}

fn expect_item<'a>(ctx: &TransitionContext<'a>) -> Result<&'a Item, AdmissionError> {
    ctx.item
        .ok_or_else(|| AdmissionError::Transition("event targets a missing item".into()))
}
