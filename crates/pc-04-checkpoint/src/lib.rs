//! # Checkpoint Engine
//!
//! Merkle commitments over contiguous runs of admitted events, co-signed
//! to M-of-N and anchored into Bitcoin through an OP_RETURN output.

#![warn(clippy::all)]

pub mod builder;
pub mod engine;
pub mod op_return;
pub mod ports;

pub use builder::build_unsigned;
pub use engine::{CheckpointEngine, CheckpointError, LocalSigner};
pub use op_return::{commits_to, op_return_script, parse_op_return, OpReturnCommitment};
pub use ports::{
    AnchorConfirmation, AnchorError, AnchorSink, AnchorTx, CheckpointSigner, SignerGatewayError,
};
