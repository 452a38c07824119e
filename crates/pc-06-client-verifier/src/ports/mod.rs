//! Port definitions for the client verifier.

pub mod outbound;

pub use outbound::{GatewayError, OperatorGateway};
