//! Invitation issuance for private channels.
//!
//! An invitation is a single-use grant bound by a commitment hash to its
//! channel, invitee, nonce, and issuance time. Derivation from
//! (channel, invitee) caps outstanding invitations at one per invitee;
//! a consumed invitation may be replaced, an unconsumed one may not.

use agentmesh_ledger::{Ledger, LedgerError, Transaction};
use agentmesh_protocol::accounts::{AccountData, InvitationAccount};
use agentmesh_protocol::crypto::invitation_commitment;
use agentmesh_protocol::derivation::{agent_address, invitation_address, participant_address};
use agentmesh_protocol::{Address, ProtocolConfig, PublicKey};

use crate::ChannelError;

/// Issue an invitation to `invitee`. The signer must be an active
/// participant, and inviters are throttled by a per-agent cooldown.
pub fn invite_to_channel(
    txn: &mut Transaction<'_>,
    config: &ProtocolConfig,
    signer: &PublicKey,
    channel: &Address,
    invitee: PublicKey,
    nonce: u64,
) -> Result<Address, ChannelError> {
    let (inviter_agent, _) = agent_address(signer)?;
    let mut inviter = txn
        .agent(&inviter_agent)
        .map_err(|_| ChannelError::AgentNotFound(inviter_agent))?;

    let channel_account = match txn.channel(channel) {
        Ok(account) => account,
        Err(LedgerError::AccountNotFound(a)) => return Err(ChannelError::ChannelNotFound(a)),
        Err(e) => return Err(e.into()),
    };
    if !channel_account.is_active {
        return Err(ChannelError::ChannelInactive(*channel));
    }

    let (inviter_participant, _) = participant_address(channel, &inviter_agent)?;
    let is_member = txn
        .participant(&inviter_participant)
        .map(|record| record.is_active)
        .unwrap_or(false);
    if !is_member {
        return Err(ChannelError::NotAParticipant);
    }

    // An invitee who is already an active member needs no invitation.
    let (invitee_agent, _) = agent_address(&invitee)?;
    let (invitee_participant, _) = participant_address(channel, &invitee_agent)?;
    if txn
        .participant(&invitee_participant)
        .map(|record| record.is_active)
        .unwrap_or(false)
    {
        return Err(ChannelError::AlreadyParticipant);
    }

    let now = txn.now();
    if let Some(last) = inviter.last_invite_at {
        let cooldown = config.invite_cooldown();
        let elapsed = now - last;
        if elapsed < cooldown {
            return Err(ChannelError::RateLimitExceeded {
                retry_after_ms: (cooldown - elapsed).num_milliseconds(),
            });
        }
    }

    let (address, bump) = invitation_address(channel, &invitee)?;
    let existing = match txn.invitation(&address) {
        Ok(invitation) => {
            if !invitation.used {
                return Err(ChannelError::DuplicateInvitation);
            }
            Some(invitation)
        }
        Err(LedgerError::AccountNotFound(_)) => None,
        Err(e) => return Err(e.into()),
    };

    let invitation = InvitationAccount {
        channel: *channel,
        invitee,
        inviter: inviter_agent,
        nonce,
        commitment: invitation_commitment(channel, &invitee, nonce, now),
        used: false,
        created_at: now,
        bump,
    };
    match existing {
        // A consumed invitation's slot is reusable: the invitee left and
        // is being invited again.
        Some(_) => txn.update(address, AccountData::Invitation(invitation))?,
        None => txn.create(address, AccountData::Invitation(invitation))?,
    }

    inviter.invites_sent = inviter
        .invites_sent
        .checked_add(1)
        .ok_or(ChannelError::ArithmeticOverflow)?;
    inviter.last_invite_at = Some(now);
    txn.update(inviter_agent, AccountData::Agent(inviter))?;

    tracing::info!(channel = %channel, invitee = %invitee, "Invitation issued");
    Ok(address)
}

/// Look up the invitation for (channel, invitee), if any. Read-only.
pub fn get_invitation(
    ledger: &Ledger,
    channel: &Address,
    invitee: &PublicKey,
) -> Option<InvitationAccount> {
    invitation_address(channel, invitee)
        .ok()
        .and_then(|(address, _)| ledger.account(&address).cloned())
        .and_then(|data| data.as_invitation().cloned())
}
