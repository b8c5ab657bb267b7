//! AgentMesh Channels - group communication spaces
//!
//! Implements the channel subsystem:
//! - Channel creation (with an optional atomic creator membership)
//! - Joins gated by visibility, capacity, invitations, and escrowed fees,
//!   with fee deduction and access grant committing as one
//! - Single-use, commitment-bound invitations with inviter throttling
//! - Broadcasts under a two-tier rate limit (hard cooldown plus a burst
//!   window), persisted as channel message accounts

pub mod broadcast;
pub mod channels;
pub mod invitations;
pub mod rate_limit;

pub use broadcast::{broadcast_message, channel_messages};
pub use channels::{
    create_channel, create_channel_with_owner, deactivate_channel, get_channel, is_participant,
    join_channel, leave_channel,
};
pub use invitations::{get_invitation, invite_to_channel};

use agentmesh_escrow::EscrowError;
use agentmesh_ledger::LedgerError;
use agentmesh_protocol::{Address, ProtocolError};
use thiserror::Error;

/// Errors originating from the channel subsystem.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Channel name already taken: {0}")]
    NameTaken(String),

    #[error("Channel not found: {0}")]
    ChannelNotFound(Address),

    #[error("Channel is inactive: {0}")]
    ChannelInactive(Address),

    #[error("Channel is full ({max} participants)")]
    ChannelFull { max: u32 },

    #[error("Agent not found: {0}")]
    AgentNotFound(Address),

    #[error("Already a participant of this channel")]
    AlreadyParticipant,

    #[error("Not a participant of this channel")]
    NotAParticipant,

    #[error("Unauthorized: signer does not control this channel")]
    Unauthorized,

    #[error("Joining a private channel requires an invitation")]
    InvitationRequired,

    #[error("Invitation has already been used")]
    InvitationAlreadyUsed,

    #[error("Invitation does not match this join request")]
    InvitationMismatch,

    #[error("An unused invitation already exists for this invitee")]
    DuplicateInvitation,

    #[error("Rate limit exceeded, retry in {retry_after_ms}ms")]
    RateLimitExceeded { retry_after_ms: i64 },

    #[error("Channel name length {len} out of range 1..={max}")]
    InvalidName { len: usize, max: usize },

    #[error("Channel description too long: {len} bytes (max {max})")]
    InvalidDescription { len: usize, max: usize },

    #[error("Channel capacity must be at least {min}")]
    InvalidCapacity { min: u32 },

    #[error("Broadcast content too large: {len} bytes (max {max})")]
    ContentTooLarge { len: usize, max: usize },

    #[error("Reply target not found in this channel: {0}")]
    ReplyNotFound(Address),

    #[error("A broadcast with nonce {0} already exists for this sender")]
    DuplicateBroadcast(u64),

    #[error("Arithmetic overflow on a channel counter")]
    ArithmeticOverflow,

    #[error("Arithmetic underflow on a channel counter")]
    ArithmeticUnderflow,

    #[error("Escrow error: {0}")]
    Escrow(#[from] EscrowError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}
