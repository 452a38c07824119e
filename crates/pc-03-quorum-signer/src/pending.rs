//! # Pending Candidate Buffer
//!
//! Candidates that have not yet reached M signatures, keyed by event id.
//! The buffer is bounded: entries are reaped once their timestamp leaves
//! the admission window, and the oldest entry is evicted when the buffer
//! is full. A candidate that never reaches quorum simply ages out.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

use shared_types::{Event, Hash, OperatorId};

#[derive(Clone)]
struct PendingEntry {
    event: Event,
    inserted_at_ms: u64,
}

/// Bounded in-memory map of in-flight candidates.
pub struct PendingCandidates {
    capacity: usize,
    inner: Mutex<HashMap<Hash, PendingEntry>>,
}

impl PendingCandidates {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Merge an incoming copy of a candidate with whatever signatures we
    /// already hold for it, returning the merged event.
    ///
    /// Signatures are unioned by `operatorId`; the first sighting of each
    /// operator wins.
    pub fn merge(&self, incoming: Event, now_ms: u64) -> Event {
        let mut inner = self.inner.lock();
        let id = incoming.header.event_id;

        match inner.get_mut(&id) {
            Some(entry) => {
                let mut seen: HashSet<OperatorId> = entry
                    .event
                    .header
                    .operator_signatures
                    .iter()
                    .map(|s| s.operator_id.clone())
                    .collect();
                for sig in incoming.header.operator_signatures {
                    if seen.insert(sig.operator_id.clone()) {
                        entry.event.header.operator_signatures.push(sig);
                    }
                }
                entry.event.clone()
            }
            None => {
                if inner.len() >= self.capacity {
                    evict_oldest(&mut inner);
                }
                inner.insert(
                    id,
                    PendingEntry {
                        event: incoming.clone(),
                        inserted_at_ms: now_ms,
                    },
                );
                incoming
            }
        }
    }

    /// Drop a candidate (admitted, or no longer wanted).
    pub fn remove(&self, event_id: &Hash) {
        self.inner.lock().remove(event_id);
    }

    /// Evict every candidate whose event timestamp has left the admission
    /// window; they can never be admitted anymore.
    pub fn reap(&self, now_ms: u64, max_past_skew_ms: u64) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.len();
        inner.retain(|_, entry| {
            now_ms.saturating_sub(entry.event.header.timestamp) <= max_past_skew_ms
        });
        before - inner.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

fn evict_oldest(inner: &mut HashMap<Hash, PendingEntry>) {
    if let Some(oldest) = inner
        .iter()
        .min_by_key(|(_, e)| e.inserted_at_ms)
        .map(|(id, _)| *id)
    {
        inner.remove(&oldest);
    }
}
