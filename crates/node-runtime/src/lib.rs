//! # Node Runtime
//!
//! Configuration, storage adapters, and the `OperatorNode` value that
//! wires one operator's subsystems together. The HTTP transport, peer
//! gossip, payment monitor, and Bitcoin RPC adapters are external
//! collaborators that plug into the ports exposed here.

#![warn(clippy::all)]

pub mod adapters;
pub mod container;
pub mod node;

pub use adapters::storage::{RocksDbConfig, RocksDbStore};
pub use container::{IdentityConfig, NodeConfig, OperatorEntry, StorageConfig};
pub use node::{OperatorNode, SubmitOutcome};
