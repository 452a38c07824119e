//! # Key Layout
//!
//! One flat keyspace with fixed ASCII prefixes. Heights and sequence
//! numbers are big-endian so that prefix scans come back in order.
//!
//! ```text
//! evt:<eventId>                 canonical event bytes (content-addressed)
//! esq:<eventId>                 admission sequence number of the event
//! log:<itemKey>:<height be64>   eventId at that height of the item log
//! seq:<seq be64>                eventId in global admission order
//! itm:<itemKey>                 item snapshot
//! mfr:<manufacturerId>          manufacturer record
//! aut:<authenticatorId>         authenticator record
//! att:<itemKey>:<attestationId> attestation record
//! cp:<checkpointId>             checkpoint record
//! meta:seq                      next admission sequence number
//! meta:latest_cp                checkpointId of the newest checkpoint
//! ```

use shared_types::{Hash, ItemId};

pub const META_SEQ: &[u8] = b"meta:seq";
pub const META_LATEST_CHECKPOINT: &[u8] = b"meta:latest_cp";

pub fn event(event_id: &Hash) -> Vec<u8> {
    let mut key = Vec::with_capacity(4 + 32);
    key.extend_from_slice(b"evt:");
    key.extend_from_slice(event_id);
    key
}

pub fn event_seq(event_id: &Hash) -> Vec<u8> {
    let mut key = Vec::with_capacity(4 + 32);
    key.extend_from_slice(b"esq:");
    key.extend_from_slice(event_id);
    key
}

pub fn log_prefix(item_id: &ItemId) -> Vec<u8> {
    let mut key = Vec::with_capacity(5 + item_id.as_str().len());
    key.extend_from_slice(b"log:");
    key.extend_from_slice(item_id.as_str().as_bytes());
    key.push(b':');
    key
}

pub fn log_entry(item_id: &ItemId, height: u64) -> Vec<u8> {
    let mut key = log_prefix(item_id);
    key.extend_from_slice(&height.to_be_bytes());
    key
}

pub fn admission_entry(seq: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(4 + 8);
    key.extend_from_slice(b"seq:");
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

pub const ADMISSION_PREFIX: &[u8] = b"seq:";

pub fn item(item_id: &ItemId) -> Vec<u8> {
    [b"itm:", item_id.as_str().as_bytes()].concat()
}

pub fn manufacturer(id: &str) -> Vec<u8> {
    [b"mfr:", id.as_bytes()].concat()
}

pub fn authenticator(id: &str) -> Vec<u8> {
    [b"aut:", id.as_bytes()].concat()
}

pub fn attestation_prefix(item_id: &ItemId) -> Vec<u8> {
    let mut key = Vec::with_capacity(5 + item_id.as_str().len());
    key.extend_from_slice(b"att:");
    key.extend_from_slice(item_id.as_str().as_bytes());
    key.push(b':');
    key
}

pub fn attestation(item_id: &ItemId, attestation_id: &str) -> Vec<u8> {
    let mut key = attestation_prefix(item_id);
    key.extend_from_slice(attestation_id.as_bytes());
    key
}

pub fn checkpoint(checkpoint_id: &str) -> Vec<u8> {
    [b"cp:", checkpoint_id.as_bytes()].concat()
}
