//! AgentMesh Directory - agent registry and direct message store
//!
//! Implements the identity and point-to-point messaging instructions:
//! - Agent registration and owner-only updates
//! - Direct messages addressed by (sender agent, recipient, content, kind)
//! - Monotonic delivery status transitions and read-time expiry

pub mod agents;
pub mod messages;

pub use agents::{get_agent, register_agent, update_agent};
pub use messages::{get_message, send_message, update_message_status, MessageView};

use agentmesh_ledger::LedgerError;
use agentmesh_protocol::{Address, MessageStatus, ProtocolError, PublicKey};
use thiserror::Error;

/// Errors originating from the registry and message store.
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Agent already registered at {0}")]
    AgentAlreadyRegistered(Address),

    #[error("Agent not found: {0}")]
    AgentNotFound(Address),

    #[error("Recipient {0} has no registered agent")]
    RecipientNotFound(PublicKey),

    #[error("Message not found: {0}")]
    MessageNotFound(Address),

    #[error("Unauthorized: signer does not control this account")]
    Unauthorized,

    #[error("Metadata URI too long: {len} bytes (max {max})")]
    InvalidMetadata { len: usize, max: usize },

    #[error("Duplicate message: {0}")]
    DuplicateMessage(Address),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStatusTransition {
        from: MessageStatus,
        to: MessageStatus,
    },

    #[error("Message expired: {0}")]
    MessageExpired(Address),

    #[error("Arithmetic overflow updating a counter")]
    ArithmeticOverflow,

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}
