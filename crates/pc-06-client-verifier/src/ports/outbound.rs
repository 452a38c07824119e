//! # Outbound Ports
//!
//! How the verifier reaches operators. Transport is out of scope; any
//! HTTP/JSON (or in-process) adapter that answers these four questions
//! works.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::ItemProofResponse;
use shared_types::{
    AuthenticationAttestation, Authenticator, AuthenticatorId, ItemId, Manufacturer,
    ManufacturerId, Operator,
};

/// Transport-level failure talking to one operator.
///
/// These are absorbed silently by the scan: a dead operator simply
/// contributes nothing to the quorum tally.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Query surface one operator exposes to clients.
#[async_trait]
pub trait OperatorGateway: Send + Sync {
    async fn fetch_item_proof(
        &self,
        operator: &Operator,
        item_id: &ItemId,
    ) -> Result<ItemProofResponse, GatewayError>;

    async fn fetch_attestations(
        &self,
        operator: &Operator,
        item_id: &ItemId,
    ) -> Result<Vec<AuthenticationAttestation>, GatewayError>;

    async fn fetch_manufacturer(
        &self,
        operator: &Operator,
        manufacturer_id: &ManufacturerId,
    ) -> Result<Option<Manufacturer>, GatewayError>;

    async fn fetch_authenticator(
        &self,
        operator: &Operator,
        authenticator_id: &AuthenticatorId,
    ) -> Result<Option<Authenticator>, GatewayError>;
}
