//! Port definitions for the event store.

pub mod outbound;

pub use outbound::{BatchOperation, KeyValueStore, SystemTimeSource, TimeSource};
