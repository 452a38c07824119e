//! Operator node binary.
//!
//! Boots the core engine over RocksDB (or the in-memory backend for
//! development) and parks until interrupted. Transport, peer-signing, and
//! anchor adapters are hosted by the surrounding deployment; they attach
//! through `OperatorNode`'s ports.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use node_runtime::{NodeConfig, OperatorNode, RocksDbConfig, RocksDbStore};
use pc_01_event_store::{InMemoryKVStore, KeyValueStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "pc-node.json".to_string());
    let config = NodeConfig::from_file(&config_path)
        .with_context(|| format!("loading config from {config_path}"))?;

    if config.storage.in_memory {
        let node = OperatorNode::new(&config, InMemoryKVStore::new())?;
        run(node).await
    } else {
        let backend = RocksDbStore::open(&config.storage.data_dir, RocksDbConfig::default())
            .with_context(|| format!("opening rocksdb at {}", config.storage.data_dir))?;
        let node = OperatorNode::new(&config, backend)?;
        run(node).await
    }
}

async fn run<S: KeyValueStore + 'static>(node: OperatorNode<S>) -> anyhow::Result<()> {
    info!(
        operator_id = %node.operator_id(),
        operators = node.registry().len(),
        admitted = node.store().admission_count().unwrap_or(0),
        "node ready; waiting for transport"
    );
    tokio::signal::ctrl_c().await?;
    info!("interrupt received; shutting down");
    Ok(())
}
