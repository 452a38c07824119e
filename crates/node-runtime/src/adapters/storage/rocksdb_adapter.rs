//! # RocksDB Storage Adapter
//!
//! Production implementation of the event store's `KeyValueStore` port.
//!
//! ## Features
//!
//! - Atomic batch writes (WriteBatch)
//! - Snappy compression
//! - Bloom filters for point reads
//! - fsync on write for durability
//!
//! The event store uses one flat keyspace with ASCII prefixes, so a
//! single column family with ordered iteration is all it needs.

use rocksdb::{BlockBasedOptions, IteratorMode, Options, WriteBatch, WriteOptions, DB};
use std::path::Path;

use pc_01_event_store::{BatchOperation, KeyValueStore};
use shared_types::StoreError;

/// RocksDB tuning for the event-store workload.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Block cache size in bytes (default: 128MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 64MB)
    pub write_buffer_size: usize,
    /// Enable fsync after each write (default: true for durability)
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            block_cache_size: 128 * 1024 * 1024,
            write_buffer_size: 64 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

/// Durable key-value backend over RocksDB.
pub struct RocksDbStore {
    db: DB,
    sync_writes: bool,
}

impl RocksDbStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>, config: RocksDbConfig) -> Result<Self, StoreError> {
        let mut options = Options::default();
        options.create_if_missing(true);
        options.set_write_buffer_size(config.write_buffer_size);
        options.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_options = BlockBasedOptions::default();
        block_options.set_bloom_filter(10.0, false);
        let cache = rocksdb::Cache::new_lru_cache(config.block_cache_size);
        block_options.set_block_cache(&cache);
        options.set_block_based_table_factory(&block_options);

        let db = DB::open(&options, path).map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self {
            db,
            sync_writes: config.sync_writes,
        })
    }

    fn write_options(&self) -> WriteOptions {
        let mut options = WriteOptions::default();
        options.set_sync(self.sync_writes);
        options
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.db
            .get(key)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.db
            .put_opt(key, value, &self.write_options())
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.db
            .delete_opt(key, &self.write_options())
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        let mut batch = WriteBatch::default();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => batch.put(key, value),
                BatchOperation::Delete { key } => batch.delete(key),
            }
        }
        self.db
            .write_opt(batch, &self.write_options())
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let mode = IteratorMode::From(prefix, rocksdb::Direction::Forward);
        let mut results = Vec::new();
        for entry in self.db.iterator(mode) {
            let (key, value) = entry.map_err(|e| StoreError::Backend(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_vec(), value.to_vec()));
        }
        Ok(results)
    }
}
