//! Protocol configuration loading from TOML and environment variables.
//!
//! Embedders read the protocol parameters from:
//! 1. A TOML config file (default: config/agentmesh.toml)
//! 2. Environment variables (override TOML values)
//!
//! Environment variable prefix: AGENTMESH_

use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::ProtocolError;

/// Top-level protocol configuration. Instruction handlers take this by
/// reference; a default instance matches the protocol constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Direct messaging parameters.
    #[serde(default)]
    pub messaging: MessagingConfig,
    /// Broadcast rate-limit parameters.
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    /// Invitation throttle parameters.
    #[serde(default)]
    pub invitations: InvitationConfig,
    /// Field length bounds.
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Direct messaging parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Message time-to-live in seconds.
    #[serde(default = "default_message_ttl")]
    pub ttl_secs: u64,
}

/// Broadcast rate-limit parameters: a hard cooldown between consecutive
/// broadcasts plus a burst cap over a rolling window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Minimum gap between two broadcasts from one participant.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    /// Length of the burst window in seconds.
    #[serde(default = "default_burst_window")]
    pub burst_window_secs: u64,
    /// Maximum broadcasts per burst window.
    #[serde(default = "default_burst_limit")]
    pub burst_limit: u32,
    /// Maximum broadcast payload size in bytes.
    #[serde(default = "default_max_content_len")]
    pub max_content_len: usize,
}

/// Invitation throttle parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationConfig {
    /// Minimum gap between invitations issued by one agent.
    #[serde(default = "default_invite_cooldown")]
    pub cooldown_secs: u64,
}

/// Field length bounds enforced at account creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_metadata_uri_len")]
    pub max_metadata_uri_len: usize,
    #[serde(default = "default_max_channel_name_len")]
    pub max_channel_name_len: usize,
    #[serde(default = "default_max_channel_description_len")]
    pub max_channel_description_len: usize,
}

// -- Defaults --

fn default_message_ttl() -> u64 {
    constants::DEFAULT_MESSAGE_TTL_SECS
}
fn default_cooldown_ms() -> u64 {
    constants::BROADCAST_COOLDOWN_MS
}
fn default_burst_window() -> u64 {
    constants::BROADCAST_BURST_WINDOW_SECS
}
fn default_burst_limit() -> u32 {
    constants::BROADCAST_BURST_LIMIT
}
fn default_max_content_len() -> usize {
    constants::MAX_BROADCAST_CONTENT_LEN
}
fn default_invite_cooldown() -> u64 {
    constants::INVITE_COOLDOWN_SECS
}
fn default_max_metadata_uri_len() -> usize {
    constants::MAX_METADATA_URI_LEN
}
fn default_max_channel_name_len() -> usize {
    constants::MAX_CHANNEL_NAME_LEN
}
fn default_max_channel_description_len() -> usize {
    constants::MAX_CHANNEL_DESCRIPTION_LEN
}

// -- Trait impls --

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            messaging: MessagingConfig::default(),
            broadcast: BroadcastConfig::default(),
            invitations: InvitationConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_message_ttl(),
        }
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
            burst_window_secs: default_burst_window(),
            burst_limit: default_burst_limit(),
            max_content_len: default_max_content_len(),
        }
    }
}

impl Default for InvitationConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_invite_cooldown(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_metadata_uri_len: default_max_metadata_uri_len(),
            max_channel_name_len: default_max_channel_name_len(),
            max_channel_description_len: default_max_channel_description_len(),
        }
    }
}

impl ProtocolConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ProtocolError> {
        let content = std::fs::read_to_string(path)?;
        let config: ProtocolConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, with environment variable
    /// overrides. A missing file falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ProtocolError> {
        let mut config = if let Some(path) = path {
            if path.exists() {
                Self::from_file(path)?
            } else {
                tracing::warn!(
                    path = %path.display(),
                    "Config file not found, using defaults"
                );
                Self::default()
            }
        } else {
            Self::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("AGENTMESH_MESSAGE_TTL_SECS") {
            if let Ok(ttl) = val.parse() {
                self.messaging.ttl_secs = ttl;
            }
        }
        if let Ok(val) = std::env::var("AGENTMESH_BROADCAST_COOLDOWN_MS") {
            if let Ok(ms) = val.parse() {
                self.broadcast.cooldown_ms = ms;
            }
        }
        if let Ok(val) = std::env::var("AGENTMESH_BURST_WINDOW_SECS") {
            if let Ok(secs) = val.parse() {
                self.broadcast.burst_window_secs = secs;
            }
        }
        if let Ok(val) = std::env::var("AGENTMESH_BURST_LIMIT") {
            if let Ok(limit) = val.parse() {
                self.broadcast.burst_limit = limit;
            }
        }
        if let Ok(val) = std::env::var("AGENTMESH_INVITE_COOLDOWN_SECS") {
            if let Ok(secs) = val.parse() {
                self.invitations.cooldown_secs = secs;
            }
        }
    }

    /// Message TTL as a duration.
    pub fn message_ttl(&self) -> Duration {
        Duration::seconds(self.messaging.ttl_secs as i64)
    }

    /// Broadcast cooldown as a duration.
    pub fn broadcast_cooldown(&self) -> Duration {
        Duration::milliseconds(self.broadcast.cooldown_ms as i64)
    }

    /// Burst window as a duration.
    pub fn burst_window(&self) -> Duration {
        Duration::seconds(self.broadcast.burst_window_secs as i64)
    }

    /// Invitation cooldown as a duration.
    pub fn invite_cooldown(&self) -> Duration {
        Duration::seconds(self.invitations.cooldown_secs as i64)
    }
}
