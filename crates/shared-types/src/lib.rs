//! # Shared Types
//!
//! Protocol entities, the typed event model, the canonical byte encoding,
//! and the quorum rules shared by every Provenance-Chain subsystem.
//!
//! Everything that two subsystems must agree on byte-for-byte lives here.

#![warn(clippy::all)]

pub mod canonical;
pub mod checkpoint;
pub mod config;
pub mod entities;
pub mod errors;
pub mod events;
pub mod quorum;

pub use canonical::{CanonicalError, CanonicalValue, ObjectBuilder};
pub use checkpoint::Checkpoint;
pub use config::CoreConfig;
pub use entities::{
    ActorSignature, AttestationId, AuthenticationAttestation, Authenticator, AuthenticatorId,
    Hash, Item, ItemId, ItemState, LockDetails, Manufacturer, ManufacturerId, OfferId, Operator,
    OperatorId, OperatorSignature, OperatorStatus, PaymentProof, PaymentType, PublicKeyBytes,
    RegistryStatus, SignatureBytes, Timestamp, WalletAddress, ZERO_HASH,
};
pub use errors::{AdmissionError, ChainViolation, ConfigError, DeadlineError, StoreError};
pub use events::{
    owner_acceptance_digest, Event, EventDraft, EventHeader, EventKind, EventPayload,
};
pub use quorum::{tally_signatures, OperatorRegistry, SignatureTally};
