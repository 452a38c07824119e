//! Node configuration container.

pub mod config;

pub use config::{IdentityConfig, NodeConfig, OperatorEntry, StorageConfig};
