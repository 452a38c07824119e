//! # Admission
//!
//! The item state machine and the operator admission pipeline: every
//! event an operator accepts has walked `AdmissionPipeline::admit`.
//!
//! The pipeline is a synchronous, pure function over stored state; all
//! I/O indirection lives behind the event-store and payment-verifier
//! ports, which keeps admission deterministic and easy to fuzz.

#![warn(clippy::all)]

pub mod domain;
pub mod pipeline;
pub mod ports;
pub mod test_utils;

pub use domain::state_machine::transition;
pub use pipeline::{AdmissionPipeline, AdmissionReceipt};
pub use ports::{AcceptRecordedProofs, PaymentVerifier};
