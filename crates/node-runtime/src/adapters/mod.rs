//! Concrete backends for the subsystem ports.

pub mod storage;
