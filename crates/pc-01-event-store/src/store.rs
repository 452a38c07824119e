//! # Event Store
//!
//! Durable per-item append-only logs, item snapshots, the
//! manufacturer/authenticator registries, and the attestation index.
//! Events are content-addressed by `eventId` and stored as their canonical
//! bytes.
//!
//! ## Atomicity
//!
//! `append` writes the event blob, the log entry, the admission-sequence
//! entry, and every snapshot/registry update in one atomic batch. A failed
//! admission leaves no trace.
//!
//! ## Locking
//!
//! All mutations to a given item are serialized under that item's lock,
//! handed out by [`EventStore::item_lock`]. Registry updates share one
//! lock. Reads take no locks beyond the backend's own.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::keys;
use crate::ports::outbound::{BatchOperation, KeyValueStore};
use shared_types::{
    AuthenticationAttestation, Authenticator, Checkpoint, Event, Hash, Item, ItemId, Manufacturer,
    StoreError,
};

/// Everything one admission writes, beyond the event itself.
///
/// The admission pipeline computes the post-state; the store only persists
/// it. Unused slots stay `None`.
#[derive(Debug, Default, Clone)]
pub struct AdmissionEffects {
    pub item: Option<Item>,
    pub manufacturer: Option<Manufacturer>,
    pub authenticator: Option<Authenticator>,
    pub attestation: Option<AuthenticationAttestation>,
    /// For mints: the manufacturer's registration event id, written as
    /// height 1 of the new item's log so the chain reads
    /// `registration → mint → …`.
    pub item_log_seed: Option<Hash>,
}

/// Content-addressed event log plus materialized snapshots.
pub struct EventStore<S: KeyValueStore> {
    kv: S,
    item_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    registry_lock: Arc<Mutex<()>>,
    seq_lock: Mutex<()>,
}

impl<S: KeyValueStore> EventStore<S> {
    pub fn new(kv: S) -> Self {
        Self {
            kv,
            item_locks: Mutex::new(HashMap::new()),
            registry_lock: Arc::new(Mutex::new(())),
            seq_lock: Mutex::new(()),
        }
    }

    /// The exclusive lock serializing all mutations of one item.
    ///
    /// Callers working across several items must acquire locks in
    /// ascending `itemId` order.
    pub fn item_lock(&self, item_id: &ItemId) -> Arc<Mutex<()>> {
        let mut locks = self.item_locks.lock();
        locks
            .entry(item_id.as_str().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// The lock serializing manufacturer/authenticator registry updates.
    pub fn registry_lock(&self) -> Arc<Mutex<()>> {
        self.registry_lock.clone()
    }

    /// Persist an admitted event and its effects atomically.
    ///
    /// Returns the event's admission sequence number. The caller must hold
    /// the item lock (and the registry lock for registration events).
    pub fn append(&self, event: &Event, effects: AdmissionEffects) -> Result<u64, StoreError> {
        let event_id = event.header.event_id;
        let mut batch = Vec::with_capacity(8);

        batch.push(BatchOperation::put(
            keys::event(&event_id),
            event.canonical_bytes(),
        ));
        batch.push(BatchOperation::put(
            keys::log_entry(&event.header.item_id, event.header.height),
            event_id.to_vec(),
        ));
        if let Some(seed) = &effects.item_log_seed {
            batch.push(BatchOperation::put(
                keys::log_entry(&event.header.item_id, 1),
                seed.to_vec(),
            ));
        }

        if let Some(item) = &effects.item {
            batch.push(BatchOperation::put(
                keys::item(&item.item_id),
                encode(item)?,
            ));
        }
        if let Some(manufacturer) = &effects.manufacturer {
            batch.push(BatchOperation::put(
                keys::manufacturer(manufacturer.manufacturer_id.as_str()),
                encode(manufacturer)?,
            ));
        }
        if let Some(authenticator) = &effects.authenticator {
            batch.push(BatchOperation::put(
                keys::authenticator(authenticator.authenticator_id.as_str()),
                encode(authenticator)?,
            ));
        }
        if let Some(attestation) = &effects.attestation {
            batch.push(BatchOperation::put(
                keys::attestation(&attestation.item_id, attestation.attestation_id.as_str()),
                encode(attestation)?,
            ));
        }

        // The sequence lock keeps (read counter, write batch) atomic with
        // respect to concurrent admissions on other items.
        let _seq_guard = self.seq_lock.lock();
        let seq = self.next_seq()?;
        batch.push(BatchOperation::put(keys::admission_entry(seq), event_id.to_vec()));
        batch.push(BatchOperation::put(
            keys::event_seq(&event_id),
            seq.to_be_bytes().to_vec(),
        ));
        batch.push(BatchOperation::put(
            keys::META_SEQ,
            (seq + 1).to_be_bytes().to_vec(),
        ));
        self.kv.atomic_batch_write(batch)?;

        tracing::debug!(
            event_id = %hex::encode(event_id),
            item_id = %event.header.item_id,
            height = event.header.height,
            seq,
            "event persisted"
        );
        Ok(seq)
    }

    /// Current item snapshot.
    pub fn item(&self, item_id: &ItemId) -> Result<Option<Item>, StoreError> {
        self.kv.get(&keys::item(item_id))?.map(|b| decode(&b)).transpose()
    }

    /// The canonical bytes of an event.
    pub fn event_bytes(&self, event_id: &Hash) -> Result<Option<Vec<u8>>, StoreError> {
        self.kv.get(&keys::event(event_id))
    }

    /// A single event by id.
    pub fn event(&self, event_id: &Hash) -> Result<Option<Event>, StoreError> {
        self.event_bytes(event_id)?
            .map(|bytes| decode_event(&bytes))
            .transpose()
    }

    /// The admission sequence number of an event, if admitted here.
    pub fn event_admission_seq(&self, event_id: &Hash) -> Result<Option<u64>, StoreError> {
        let Some(bytes) = self.kv.get(&keys::event_seq(event_id))? else {
            return Ok(None);
        };
        let arr: [u8; 8] = bytes
            .try_into()
            .map_err(|_| StoreError::Corrupt(format!("esq:{}", hex::encode(event_id))))?;
        Ok(Some(u64::from_be_bytes(arr)))
    }

    /// The event id stored at one height of a log, if any.
    pub fn log_event_id(&self, item_id: &ItemId, height: u64) -> Result<Option<Hash>, StoreError> {
        let Some(bytes) = self.kv.get(&keys::log_entry(item_id, height))? else {
            return Ok(None);
        };
        bytes
            .as_slice()
            .try_into()
            .map(Some)
            .map_err(|_| StoreError::Corrupt(format!("log:{item_id}:{height}")))
    }

    /// The item's full event log in height order.
    pub fn events(&self, item_id: &ItemId) -> Result<Vec<Event>, StoreError> {
        let entries = self.kv.prefix_scan(&keys::log_prefix(item_id))?;
        let mut events = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let event_id: Hash = value
                .as_slice()
                .try_into()
                .map_err(|_| StoreError::Corrupt(String::from_utf8_lossy(&key).into_owned()))?;
            let event = self
                .event(&event_id)?
                .ok_or_else(|| StoreError::EventNotFound(hex::encode(event_id)))?;
            events.push(event);
        }
        Ok(events)
    }

    /// Height of the item's newest event, 0 when the log is empty.
    pub fn latest_height(&self, item_id: &ItemId) -> Result<u64, StoreError> {
        let entries = self.kv.prefix_scan(&keys::log_prefix(item_id))?;
        Ok(entries
            .last()
            .map(|(key, _)| {
                let tail = &key[key.len().saturating_sub(8)..];
                tail.try_into().map(u64::from_be_bytes).unwrap_or(0)
            })
            .unwrap_or(0))
    }

    pub fn manufacturer(&self, id: &str) -> Result<Option<Manufacturer>, StoreError> {
        self.kv
            .get(&keys::manufacturer(id))?
            .map(|b| decode(&b))
            .transpose()
    }

    /// Overwrite a registry record (status transitions). The caller must
    /// hold the registry lock and have checked the forward-only rule.
    pub fn put_manufacturer(&self, manufacturer: &Manufacturer) -> Result<(), StoreError> {
        self.kv.put(
            &keys::manufacturer(manufacturer.manufacturer_id.as_str()),
            &encode(manufacturer)?,
        )
    }

    pub fn put_authenticator(&self, authenticator: &Authenticator) -> Result<(), StoreError> {
        self.kv.put(
            &keys::authenticator(authenticator.authenticator_id.as_str()),
            &encode(authenticator)?,
        )
    }

    /// Stamp the anchor txid onto a set of admitted events.
    ///
    /// The event id excludes `anchorTxHash`, so rewriting the blobs keeps
    /// every stored id and signature intact.
    pub fn decorate_anchor(&self, event_ids: &[Hash], txid: &str) -> Result<(), StoreError> {
        let mut batch = Vec::with_capacity(event_ids.len());
        for event_id in event_ids {
            let Some(mut event) = self.event(event_id)? else {
                continue;
            };
            if event.header.anchor_tx_hash.as_deref() == Some(txid) {
                continue;
            }
            event.header.anchor_tx_hash = Some(txid.to_string());
            batch.push(BatchOperation::put(
                keys::event(event_id),
                event.canonical_bytes(),
            ));
        }
        if batch.is_empty() {
            return Ok(());
        }
        self.kv.atomic_batch_write(batch)
    }

    pub fn authenticator(&self, id: &str) -> Result<Option<Authenticator>, StoreError> {
        self.kv
            .get(&keys::authenticator(id))?
            .map(|b| decode(&b))
            .transpose()
    }

    /// All attestations recorded for an item.
    pub fn attestations(&self, item_id: &ItemId) -> Result<Vec<AuthenticationAttestation>, StoreError> {
        self.kv
            .prefix_scan(&keys::attestation_prefix(item_id))?
            .into_iter()
            .map(|(_, bytes)| decode(&bytes))
            .collect()
    }

    /// Number of events admitted so far; also the next sequence number.
    pub fn admission_count(&self) -> Result<u64, StoreError> {
        self.next_seq()
    }

    /// Event ids admitted in `[from_seq, to_seq)`, in admission order.
    pub fn admitted_range(&self, from_seq: u64, to_seq: u64) -> Result<Vec<Hash>, StoreError> {
        let mut ids = Vec::new();
        for seq in from_seq..to_seq {
            let Some(bytes) = self.kv.get(&keys::admission_entry(seq))? else {
                break;
            };
            let id: Hash = bytes
                .as_slice()
                .try_into()
                .map_err(|_| StoreError::Corrupt(format!("seq:{seq}")))?;
            ids.push(id);
        }
        Ok(ids)
    }

    /// Persist a checkpoint and advance the latest-checkpoint pointer.
    pub fn put_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(checkpoint)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.kv.atomic_batch_write(vec![
            BatchOperation::put(keys::checkpoint(&checkpoint.checkpoint_id), bytes),
            BatchOperation::put(
                keys::META_LATEST_CHECKPOINT,
                checkpoint.checkpoint_id.as_bytes().to_vec(),
            ),
        ])
    }

    pub fn checkpoint(&self, checkpoint_id: &str) -> Result<Option<Checkpoint>, StoreError> {
        self.kv
            .get(&keys::checkpoint(checkpoint_id))?
            .map(|bytes| {
                serde_json::from_slice(&bytes)
                    .map_err(|_| StoreError::Corrupt(format!("cp:{checkpoint_id}")))
            })
            .transpose()
    }

    /// The newest stored checkpoint, if any.
    pub fn latest_checkpoint(&self) -> Result<Option<Checkpoint>, StoreError> {
        let Some(id_bytes) = self.kv.get(keys::META_LATEST_CHECKPOINT)? else {
            return Ok(None);
        };
        let id = String::from_utf8(id_bytes)
            .map_err(|_| StoreError::Corrupt("meta:latest_cp".into()))?;
        self.checkpoint(&id)
    }

    fn next_seq(&self) -> Result<u64, StoreError> {
        let Some(bytes) = self.kv.get(keys::META_SEQ)? else {
            return Ok(0);
        };
        let arr: [u8; 8] = bytes
            .try_into()
            .map_err(|_| StoreError::Corrupt("meta:seq".into()))?;
        Ok(u64::from_be_bytes(arr))
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn decode_event(bytes: &[u8]) -> Result<Event, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Corrupt(e.to_string()))
}
