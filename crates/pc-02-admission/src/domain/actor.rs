//! # Actor Signature Resolution
//!
//! Which principal must have signed a given event, and verification of
//! that signature over the 32-byte event id.
//!
//! ## Role table
//!
//! | Event | Required signer |
//! |---|---|
//! | MANUFACTURER_REGISTERED | the introduced issuer key |
//! | AUTHENTICATOR_REGISTERED | the introduced authenticator key |
//! | ITEM_MINTED | the manufacturer's issuer key |
//! | ITEM_ASSIGNED | current owner; the manufacturer while un-owned |
//! | ITEM_LOCKED | current owner (the seller) |
//! | ITEM_SETTLED | the locked buyer's wallet key |
//! | ITEM_UNLOCKED_EXPIRED | current owner (the seller) |
//! | ITEM_MOVED_TO_CUSTODY | current owner; the manufacturer while un-owned |
//! | ITEM_BURNED | current owner; the manufacturer while un-owned |
//! | ITEM_AUTHENTICATED | the authenticator's key |

use shared_crypto::{key_matches_address, verify_digest};
use shared_types::{
    owner_acceptance_digest, AdmissionError, Event, EventPayload, WalletAddress,
};

use super::preconditions::TransitionContext;

/// Verify the event's actor signature for its required role.
pub fn verify_actor(event: &Event, ctx: &TransitionContext<'_>) -> Result<(), AdmissionError> {
    let actor = &event.header.actor_signature;

    // The signature must verify over the event id regardless of role.
    if !verify_digest(&actor.public_key, &event.header.event_id, &actor.signature) {
        return Err(AdmissionError::ActorSignature(
            "actor signature does not verify over the event id".into(),
        ));
    }

    match &event.payload {
        EventPayload::ManufacturerRegistered { issuer_public_key, .. } => {
            if actor.public_key != *issuer_public_key {
                return Err(AdmissionError::ActorSignature(
                    "registration must be signed by the introduced issuer key".into(),
                ));
            }
            Ok(())
        }

        EventPayload::AuthenticatorRegistered { public_key, .. } => {
            if actor.public_key != *public_key {
                return Err(AdmissionError::ActorSignature(
                    "registration must be signed by the introduced authenticator key".into(),
                ));
            }
            Ok(())
        }

        EventPayload::ItemMinted { .. } => require_manufacturer_key(event, ctx),

        EventPayload::ItemAssigned { owner_wallet, owner_signature } => {
            require_owner_or_manufacturer(event, ctx)?;

            // The incoming owner accepts the assignment with their own key.
            if !key_matches_address(&owner_signature.public_key, owner_wallet.as_str()) {
                return Err(AdmissionError::ActorSignature(format!(
                    "acceptance key does not derive wallet {owner_wallet}"
                )));
            }
            let digest = owner_acceptance_digest(&event.header.item_id, owner_wallet);
            if !verify_digest(&owner_signature.public_key, &digest, &owner_signature.signature) {
                return Err(AdmissionError::ActorSignature(
                    "owner acceptance signature does not verify".into(),
                ));
            }
            Ok(())
        }

        EventPayload::ItemLocked { .. } | EventPayload::ItemUnlockedExpired { .. } => {
            let owner = current_owner(ctx)?;
            require_wallet_key(event, owner)
        }

        EventPayload::ItemSettled { .. } => {
            let item = ctx.item.ok_or_else(|| {
                AdmissionError::Transition("event targets a missing item".into())
            })?;
            let lock = item.active_lock.as_ref().ok_or_else(|| {
                AdmissionError::Transition("item carries no active lock".into())
            })?;
            require_wallet_key(event, &lock.buyer_wallet)
        }

        EventPayload::ItemMovedToCustody { .. } | EventPayload::ItemBurned { .. } => {
            require_owner_or_manufacturer(event, ctx)
        }

        EventPayload::ItemAuthenticated { attestation } => {
            let authenticator = ctx.authenticator.ok_or_else(|| {
                AdmissionError::Registry(format!(
                    "authenticator {} not registered",
                    attestation.authenticator_id
                ))
            })?;
            if actor.public_key != authenticator.public_key {
                return Err(AdmissionError::ActorSignature(
                    "event must be signed by the attesting authenticator".into(),
                ));
            }
            // The embedded attestation carries its own signature over the
            // attestation body.
            let digest = shared_crypto::sha256(&attestation.signing_bytes());
            if !verify_digest(
                &authenticator.public_key,
                &digest,
                &attestation.authenticator_signature,
            ) {
                return Err(AdmissionError::ActorSignature(
                    "attestation signature does not verify".into(),
                ));
            }
            Ok(())
        }
    }
}

fn current_owner<'a>(ctx: &TransitionContext<'a>) -> Result<&'a WalletAddress, AdmissionError> {
    ctx.item
        .and_then(|item| item.current_owner_wallet.as_ref())
        .ok_or_else(|| AdmissionError::ActorSignature("item has no current owner".into()))
}

fn require_wallet_key(event: &Event, wallet: &WalletAddress) -> Result<(), AdmissionError> {
    let actor = &event.header.actor_signature;
    if !key_matches_address(&actor.public_key, wallet.as_str()) {
        return Err(AdmissionError::ActorSignature(format!(
            "actor key does not derive wallet {wallet}"
        )));
    }
    Ok(())
}

fn require_manufacturer_key(
    event: &Event,
    ctx: &TransitionContext<'_>,
) -> Result<(), AdmissionError> {
    let manufacturer = ctx.manufacturer.ok_or_else(|| {
        AdmissionError::Registry("referenced manufacturer not registered".into())
    })?;
    if event.header.actor_signature.public_key != manufacturer.issuer_public_key {
        return Err(AdmissionError::ActorSignature(
            "event must be signed by the manufacturer's issuer key".into(),
        ));
    }
    Ok(())
}

/// Owned items require the owner's key; un-owned items fall back to the
/// minting manufacturer.
fn require_owner_or_manufacturer(
    event: &Event,
    ctx: &TransitionContext<'_>,
) -> Result<(), AdmissionError> {
    match ctx.item.and_then(|item| item.current_owner_wallet.as_ref()) {
        Some(owner) => require_wallet_key(event, owner),
        None => require_manufacturer_key(event, ctx),
    }
}
