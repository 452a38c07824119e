//! # Ports
//!
//! The one dependency admission needs from the outside world: a payment
//! verifier. The core enforces the numeric invariants of a settlement
//! proof itself; checking the proof against the real network is delegated
//! here.

use shared_types::PaymentProof;

/// Verify a settlement payment proof against the outside world.
pub trait PaymentVerifier: Send + Sync {
    fn verify(&self, proof: &PaymentProof) -> bool;
}

/// Default verifier: accepts any proof whose recorded fields are present.
///
/// Production nodes inject an adapter backed by their payment monitor; the
/// numeric invariants (amount, confirmations) are enforced by the pipeline
/// either way.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptRecordedProofs;

impl PaymentVerifier for AcceptRecordedProofs {
    fn verify(&self, proof: &PaymentProof) -> bool {
        match proof.payment_type {
            shared_types::PaymentType::Onchain => proof.tx_hash.is_some(),
            shared_types::PaymentType::Lightning => {
                proof.payment_hash.is_some() && proof.preimage.is_some()
            }
        }
    }
}
