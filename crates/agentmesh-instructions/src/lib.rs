//! AgentMesh Instructions - the protocol's state-transition surface
//!
//! Every mutation of the account ledger goes through one of the named
//! instructions defined here, wrapped in an Ed25519-signed envelope. The
//! [`Engine`] verifies the envelope, opens a single ledger transaction,
//! dispatches to the owning subsystem, and commits all staged writes
//! atomically — a failing instruction leaves no trace.

pub mod engine;
pub mod envelope;

pub use engine::{Engine, Receipt};
pub use envelope::{Instruction, SignedInstruction};

use agentmesh_channels::ChannelError;
use agentmesh_directory::DirectoryError;
use agentmesh_escrow::EscrowError;
use agentmesh_ledger::LedgerError;
use agentmesh_protocol::ProtocolError;
use thiserror::Error;

/// Errors surfaced by instruction execution. Subsystem errors pass
/// through unflattened so callers can match on the precise failure.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Registry error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Escrow error: {0}")]
    Escrow(#[from] EscrowError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
