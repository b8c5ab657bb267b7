//! Two-tier broadcast rate limiting.
//!
//! A participant's broadcast is admitted only if both checks pass:
//! 1. **Cooldown** - at least the configured cooldown has elapsed since
//!    their previous broadcast. Exactly the cooldown is enough.
//! 2. **Burst window** - fewer than the configured limit of broadcasts
//!    have been recorded in the current window. The window resets only
//!    once strictly more than its length has elapsed since it opened, so
//!    a burst cannot be laundered by straddling the boundary instant.
//!
//! The combination resists both rapid-fire spam (cooldown) and
//! slow-drip bursts that a single fixed-window counter would let through
//! at window edges.

use chrono::{DateTime, Utc};

use agentmesh_protocol::accounts::RateWindow;
use agentmesh_protocol::ProtocolConfig;

use crate::ChannelError;

/// Admit-or-reject a broadcast at `now`, updating the window state on
/// admission. On rejection the state is untouched and the error carries
/// a retry hint.
pub fn record_broadcast(
    rate: &mut RateWindow,
    config: &ProtocolConfig,
    now: DateTime<Utc>,
) -> Result<(), ChannelError> {
    let cooldown = config.broadcast_cooldown();
    if let Some(last) = rate.last_event_at {
        let elapsed = now - last;
        if elapsed < cooldown {
            return Err(ChannelError::RateLimitExceeded {
                retry_after_ms: (cooldown - elapsed).num_milliseconds(),
            });
        }
    }

    let window = config.burst_window();
    let window_start = match rate.window_start {
        Some(start) if now - start <= window => start,
        _ => {
            // Window expired (or first event): open a fresh one.
            rate.window_start = Some(now);
            rate.count = 0;
            now
        }
    };

    if rate.count >= config.broadcast.burst_limit {
        return Err(ChannelError::RateLimitExceeded {
            retry_after_ms: (window_start + window - now).num_milliseconds().max(1),
        });
    }

    rate.count = rate
        .count
        .checked_add(1)
        .ok_or(ChannelError::ArithmeticOverflow)?;
    rate.last_event_at = Some(now);
    Ok(())
}
