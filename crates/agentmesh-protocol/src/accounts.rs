//! Account record schema shared by every subsystem.
//!
//! Each account is an addressed, typed record. Clients hold no references
//! into these records; wallet keys only authorize transitions through
//! signed instructions. Back-references (channel address, agent address)
//! exist purely for lookup and validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::ContentHash;
use crate::identity::{Address, PublicKey};

/// Delivery state of a direct message.
///
/// Stored transitions are monotonic: `Pending → Delivered → Read`, with
/// `Failed` reachable from any stored state and terminal. `Expired` is a
/// read-time view only and is never written to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageStatus {
    Pending,
    Delivered,
    Read,
    Failed,
    Expired,
}

impl MessageStatus {
    fn rank(self) -> Option<u8> {
        match self {
            MessageStatus::Pending => Some(0),
            MessageStatus::Delivered => Some(1),
            MessageStatus::Read => Some(2),
            MessageStatus::Failed | MessageStatus::Expired => None,
        }
    }

    /// Whether a stored status may transition to `next`.
    pub fn can_transition_to(self, next: MessageStatus) -> bool {
        match (self, next) {
            // Expired is derived at read time, never stored.
            (MessageStatus::Expired, _) | (_, MessageStatus::Expired) => false,
            // Failed is terminal.
            (MessageStatus::Failed, _) => false,
            (_, MessageStatus::Failed) => true,
            (from, to) => match (from.rank(), to.rank()) {
                (Some(f), Some(t)) => t > f,
                _ => false,
            },
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Read => "read",
            MessageStatus::Failed => "failed",
            MessageStatus::Expired => "expired",
        };
        write!(f, "{}", s)
    }
}

/// Closed set of message kinds. The kind participates in message address
/// derivation, so it is a tagged enum rather than an open bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    Text,
    Data,
    Command,
    Response,
    Custom(u8),
}

impl MessageKind {
    /// Fixed-width discriminant used as a derivation seed. `Custom` codes
    /// occupy the second byte so no custom kind collides with a built-in.
    pub fn seed_bytes(self) -> [u8; 2] {
        match self {
            MessageKind::Text => [0, 0],
            MessageKind::Data => [1, 0],
            MessageKind::Command => [2, 0],
            MessageKind::Response => [3, 0],
            MessageKind::Custom(code) => [4, code],
        }
    }
}

/// Channel access model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelVisibility {
    /// Anyone with a registered agent may join.
    Public,
    /// Joining requires a valid unused invitation.
    Private,
}

/// Sliding-window bookkeeping for per-participant broadcast rate limiting
/// and per-agent invitation throttling. Pure data; the checks live in the
/// channel subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RateWindow {
    /// Start of the current burst window, if any events were recorded.
    pub window_start: Option<DateTime<Utc>>,
    /// Events recorded inside the current window.
    pub count: u32,
    /// Timestamp of the most recent event.
    pub last_event_at: Option<DateTime<Utc>>,
}

impl RateWindow {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Identity of a protocol participant, one per owner wallet key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAccount {
    /// Wallet key that registered and exclusively controls this agent.
    pub owner: PublicKey,
    /// Capability bitmask advertised to peers.
    pub capabilities: u64,
    /// External metadata document, addressed by URI. Bounded length.
    pub metadata_uri: String,
    /// Accrued reputation score.
    pub reputation: u64,
    /// Total invitations this agent has issued.
    pub invites_sent: u64,
    /// When the most recent invitation was issued.
    pub last_invite_at: Option<DateTime<Utc>>,
    /// Derivation bump for re-derivation checks.
    pub bump: u8,
}

/// Direct point-to-point message between agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAccount {
    /// Sender's *agent* address (the canonical message seed).
    pub sender: Address,
    /// Recipient's wallet key.
    pub recipient: PublicKey,
    /// Hash of the payload held in the blob store.
    pub payload_hash: ContentHash,
    pub kind: MessageKind,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    /// After this instant the message is reported as expired on read and
    /// rejects further status updates. Never deleted.
    pub expires_at: DateTime<Utc>,
    pub bump: u8,
}

impl MessageAccount {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Status as observed at `now`: expiry overrides the stored value.
    pub fn status_at(&self, now: DateTime<Utc>) -> MessageStatus {
        if self.is_expired(now) {
            MessageStatus::Expired
        } else {
            self.status
        }
    }
}

/// Group communication space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAccount {
    /// Wallet key of the creator; part of the address derivation.
    pub creator: PublicKey,
    /// Unique per creator.
    pub name: String,
    pub description: String,
    pub visibility: ChannelVisibility,
    pub max_participants: u32,
    /// Live membership count. Never exceeds `max_participants`.
    pub participant_count: u32,
    /// Fee in escrow units charged at join time; zero means free.
    pub fee_per_message: u64,
    /// Running total of fees collected from joiners' escrows.
    pub escrow_total: u64,
    /// Inactive channels reject joins, invitations, and broadcasts.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub bump: u8,
}

impl ChannelAccount {
    pub fn is_full(&self) -> bool {
        self.participant_count >= self.max_participants
    }

    pub fn requires_fee(&self) -> bool {
        self.fee_per_message > 0
    }
}

/// Membership record linking an agent to a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantAccount {
    pub channel: Address,
    pub agent: Address,
    pub joined_at: DateTime<Utc>,
    /// Broadcast rate-limit state; reset on each (re)join.
    pub rate: RateWindow,
    /// Leaving deactivates the record rather than deleting it, so a later
    /// rejoin revalidates and reactivates in place.
    pub is_active: bool,
    pub bump: u8,
}

/// Single-use access grant for a private channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationAccount {
    pub channel: Address,
    /// Wallet key the grant is bound to; no cross-use.
    pub invitee: PublicKey,
    /// Agent address of the issuing participant.
    pub inviter: Address,
    pub nonce: u64,
    /// Hash binding (channel, invitee, nonce, created_at).
    pub commitment: [u8; 32],
    /// Set on consumption; a used invitation never grants access again.
    pub used: bool,
    pub created_at: DateTime<Utc>,
    pub bump: u8,
}

/// Prepaid balance backing paid channel access, one per
/// (channel, depositor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowAccount {
    pub channel: Address,
    /// Wallet key that funded the balance and may withdraw it.
    pub depositor: PublicKey,
    /// Mutated exclusively through checked arithmetic.
    pub balance: u64,
    pub bump: u8,
}

/// Broadcast message persisted for a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMessageAccount {
    pub channel: Address,
    /// Sender's agent address.
    pub sender: Address,
    pub payload_hash: ContentHash,
    pub kind: MessageKind,
    /// Optional back-reference to an earlier message in the same channel.
    pub reply_to: Option<Address>,
    pub nonce: u64,
    pub created_at: DateTime<Utc>,
    pub bump: u8,
}

/// Discriminant for the account types a ledger slot can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountKind {
    Agent,
    Message,
    Channel,
    Participant,
    Invitation,
    Escrow,
    ChannelMessage,
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AccountKind::Agent => "agent",
            AccountKind::Message => "message",
            AccountKind::Channel => "channel",
            AccountKind::Participant => "participant",
            AccountKind::Invitation => "invitation",
            AccountKind::Escrow => "escrow",
            AccountKind::ChannelMessage => "channel_message",
        };
        write!(f, "{}", s)
    }
}

/// Typed payload of a ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountData {
    Agent(AgentAccount),
    Message(MessageAccount),
    Channel(ChannelAccount),
    Participant(ParticipantAccount),
    Invitation(InvitationAccount),
    Escrow(EscrowAccount),
    ChannelMessage(ChannelMessageAccount),
}

impl AccountData {
    pub fn kind(&self) -> AccountKind {
        match self {
            AccountData::Agent(_) => AccountKind::Agent,
            AccountData::Message(_) => AccountKind::Message,
            AccountData::Channel(_) => AccountKind::Channel,
            AccountData::Participant(_) => AccountKind::Participant,
            AccountData::Invitation(_) => AccountKind::Invitation,
            AccountData::Escrow(_) => AccountKind::Escrow,
            AccountData::ChannelMessage(_) => AccountKind::ChannelMessage,
        }
    }

    pub fn as_agent(&self) -> Option<&AgentAccount> {
        match self {
            AccountData::Agent(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&MessageAccount> {
        match self {
            AccountData::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_channel(&self) -> Option<&ChannelAccount> {
        match self {
            AccountData::Channel(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_participant(&self) -> Option<&ParticipantAccount> {
        match self {
            AccountData::Participant(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_invitation(&self) -> Option<&InvitationAccount> {
        match self {
            AccountData::Invitation(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_escrow(&self) -> Option<&EscrowAccount> {
        match self {
            AccountData::Escrow(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_channel_message(&self) -> Option<&ChannelMessageAccount> {
        match self {
            AccountData::ChannelMessage(m) => Some(m),
            _ => None,
        }
    }
}
