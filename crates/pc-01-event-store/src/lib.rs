//! # Event Store
//!
//! Content-addressed storage for protocol events, item snapshots, the
//! manufacturer/authenticator registries, and the attestation index.
//!
//! The store is deliberately dumb: it persists what the admission pipeline
//! has already validated, atomically, and serves reads. Validation lives
//! in `pc-02-admission`.

#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod store;

pub use adapters::memory::InMemoryKVStore;
pub use ports::outbound::{BatchOperation, KeyValueStore, SystemTimeSource, TimeSource};
pub use store::{AdmissionEffects, EventStore};
