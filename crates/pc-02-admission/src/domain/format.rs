//! # Structural Checks
//!
//! Field-level validation that precedes any cryptography or state lookup:
//! empty identifiers, out-of-range numbers, and log-key consistency.

use shared_types::{AdmissionError, Event, EventPayload, ItemId};

/// Reject events whose fields are malformed on their face.
pub fn check(event: &Event) -> Result<(), AdmissionError> {
    if event.header.height == 0 {
        return Err(AdmissionError::Format("height must start at 1".into()));
    }
    if event.header.item_id.as_str().is_empty() {
        return Err(AdmissionError::Format("itemId must not be empty".into()));
    }

    match &event.payload {
        EventPayload::ManufacturerRegistered { manufacturer_id, name, .. } => {
            require_nonempty("manufacturerId", manufacturer_id.as_str())?;
            require_nonempty("name", name)?;
            if event.header.item_id != ItemId::from(manufacturer_id) {
                return Err(AdmissionError::Format(
                    "registration log key must be the manufacturerId".into(),
                ));
            }
        }
        EventPayload::AuthenticatorRegistered { authenticator_id, name, .. } => {
            require_nonempty("authenticatorId", authenticator_id.as_str())?;
            require_nonempty("name", name)?;
            if event.header.item_id != ItemId::from(authenticator_id) {
                return Err(AdmissionError::Format(
                    "registration log key must be the authenticatorId".into(),
                ));
            }
        }
        EventPayload::ItemMinted { manufacturer_id, metadata_hash, .. } => {
            require_nonempty("manufacturerId", manufacturer_id.as_str())?;
            let derived =
                ItemId::derive(manufacturer_id, metadata_hash, event.header.timestamp);
            if event.header.item_id != derived {
                return Err(AdmissionError::Format(format!(
                    "itemId {} is not the derived id {derived}",
                    event.header.item_id
                )));
            }
        }
        EventPayload::ItemLocked { offer_id, .. } => {
            require_nonempty("offerId", offer_id.as_str())?;
        }
        EventPayload::ItemSettled { offer_id, .. } => {
            require_nonempty("offerId", offer_id.as_str())?;
        }
        EventPayload::ItemAuthenticated { attestation } => {
            require_nonempty("attestationId", attestation.attestation_id.as_str())?;
            if attestation.item_id != event.header.item_id {
                return Err(AdmissionError::Format(
                    "attestation targets a different item".into(),
                ));
            }
            if !attestation.confidence.is_finite()
                || !(0.0..=1.0).contains(&attestation.confidence)
            {
                return Err(AdmissionError::Format(format!(
                    "confidence {} outside [0, 1]",
                    attestation.confidence
                )));
            }
        }
        EventPayload::ItemAssigned { owner_wallet, .. } => {
            require_nonempty("ownerWallet", owner_wallet.as_str())?;
        }
        EventPayload::ItemMovedToCustody { custodian_id, .. } => {
            require_nonempty("custodianId", custodian_id)?;
        }
        EventPayload::ItemUnlockedExpired { offer_id, .. } => {
            require_nonempty("offerId", offer_id.as_str())?;
        }
        EventPayload::ItemBurned { reason, .. } => {
            require_nonempty("reason", reason)?;
        }
    }
    Ok(())
}

fn require_nonempty(field: &str, value: &str) -> Result<(), AdmissionError> {
    if value.is_empty() {
        Err(AdmissionError::Format(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}
