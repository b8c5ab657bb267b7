/// Derivation namespace for agent identity accounts.
pub const AGENT_NAMESPACE: &str = "agent";

/// Derivation namespace for direct message accounts.
pub const MESSAGE_NAMESPACE: &str = "message";

/// Derivation namespace for channel accounts.
pub const CHANNEL_NAMESPACE: &str = "channel";

/// Derivation namespace for channel participant accounts.
pub const PARTICIPANT_NAMESPACE: &str = "participant";

/// Derivation namespace for channel invitation accounts.
pub const INVITATION_NAMESPACE: &str = "invitation";

/// Derivation namespace for escrow accounts.
pub const ESCROW_NAMESPACE: &str = "escrow";

/// Derivation namespace for channel broadcast message accounts.
pub const CHANNEL_MESSAGE_NAMESPACE: &str = "channel_message";

/// Addresses whose first byte is this prefix are reserved for the host
/// runtime. Derivation skips bump values that land in the reserved space.
pub const RESERVED_ADDRESS_PREFIX: u8 = 0x00;

/// Maximum length in bytes of a single derivation seed part.
pub const MAX_SEED_LEN: usize = 128;

/// Default direct-message time-to-live (7 days).
pub const DEFAULT_MESSAGE_TTL_SECS: u64 = 604_800;

/// Hard per-participant cooldown between channel broadcasts.
pub const BROADCAST_COOLDOWN_MS: u64 = 1_000;

/// Length of the rolling burst window for channel broadcasts.
pub const BROADCAST_BURST_WINDOW_SECS: u64 = 10;

/// Maximum broadcasts allowed inside one burst window.
pub const BROADCAST_BURST_LIMIT: u32 = 10;

/// Cooldown between invitations issued by a single agent.
pub const INVITE_COOLDOWN_SECS: u64 = 60;

/// Maximum length of an agent metadata URI.
pub const MAX_METADATA_URI_LEN: usize = 256;

/// Maximum length of a channel name.
pub const MAX_CHANNEL_NAME_LEN: usize = 64;

/// Maximum length of a channel description.
pub const MAX_CHANNEL_DESCRIPTION_LEN: usize = 512;

/// Maximum size in bytes of a broadcast payload handed to the blob store.
pub const MAX_BROADCAST_CONTENT_LEN: usize = 8_192;

/// Reputation credited to a sender per delivered message or broadcast.
pub const REPUTATION_PER_MESSAGE: u64 = 1;

/// Default participant capacity for new channels.
pub const DEFAULT_MAX_PARTICIPANTS: u32 = 1_000;
