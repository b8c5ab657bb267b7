//! Channel lifecycle instructions: create, join, leave, deactivate.
//!
//! The join path is the subsystem's critical section: visibility,
//! capacity, invitation, and fee checks all happen against the
//! transaction snapshot, and the fee debit, invitation consumption,
//! participant record, and count increment are staged into the same
//! transaction — either all of them commit or none do.

use agentmesh_ledger::{Ledger, LedgerError, Transaction};
use agentmesh_protocol::accounts::{
    AccountData, ChannelAccount, ChannelVisibility, ParticipantAccount, RateWindow,
};
use agentmesh_protocol::crypto::{constant_time_eq, invitation_commitment};
use agentmesh_protocol::derivation::{
    agent_address, channel_address, invitation_address, participant_address,
};
use agentmesh_protocol::{Address, ProtocolConfig, PublicKey};

use crate::ChannelError;

/// Create a channel. The creator is *not* made a participant; see
/// [`create_channel_with_owner`] for the variant that joins them
/// atomically.
#[allow(clippy::too_many_arguments)]
pub fn create_channel(
    txn: &mut Transaction<'_>,
    config: &ProtocolConfig,
    signer: &PublicKey,
    name: String,
    description: String,
    visibility: ChannelVisibility,
    max_participants: u32,
    fee_per_message: u64,
) -> Result<Address, ChannelError> {
    create_inner(
        txn,
        config,
        signer,
        name,
        description,
        visibility,
        max_participants,
        fee_per_message,
        false,
    )
}

/// Create a channel and the creator's own participant record in one
/// atomic operation, so a creator is never a stranger to their own
/// channel.
#[allow(clippy::too_many_arguments)]
pub fn create_channel_with_owner(
    txn: &mut Transaction<'_>,
    config: &ProtocolConfig,
    signer: &PublicKey,
    name: String,
    description: String,
    visibility: ChannelVisibility,
    max_participants: u32,
    fee_per_message: u64,
) -> Result<Address, ChannelError> {
    create_inner(
        txn,
        config,
        signer,
        name,
        description,
        visibility,
        max_participants,
        fee_per_message,
        true,
    )
}

#[allow(clippy::too_many_arguments)]
fn create_inner(
    txn: &mut Transaction<'_>,
    config: &ProtocolConfig,
    signer: &PublicKey,
    name: String,
    description: String,
    visibility: ChannelVisibility,
    max_participants: u32,
    fee_per_message: u64,
    with_owner: bool,
) -> Result<Address, ChannelError> {
    let (agent, _) = agent_address(signer)?;
    if txn.agent(&agent).is_err() {
        return Err(ChannelError::AgentNotFound(agent));
    }

    let max_name = config.limits.max_channel_name_len;
    if name.is_empty() || name.len() > max_name {
        return Err(ChannelError::InvalidName {
            len: name.len(),
            max: max_name,
        });
    }
    let max_description = config.limits.max_channel_description_len;
    if description.len() > max_description {
        return Err(ChannelError::InvalidDescription {
            len: description.len(),
            max: max_description,
        });
    }
    if max_participants == 0 {
        return Err(ChannelError::InvalidCapacity { min: 1 });
    }

    let (channel, bump) = channel_address(signer, &name)?;
    if txn.contains(&channel) {
        return Err(ChannelError::NameTaken(name));
    }

    let now = txn.now();
    txn.create(
        channel,
        AccountData::Channel(ChannelAccount {
            creator: *signer,
            name: name.clone(),
            description,
            visibility,
            max_participants,
            participant_count: if with_owner { 1 } else { 0 },
            fee_per_message,
            escrow_total: 0,
            is_active: true,
            created_at: now,
            bump,
        }),
    )?;

    if with_owner {
        let (participant, participant_bump) = participant_address(&channel, &agent)?;
        txn.create(
            participant,
            AccountData::Participant(ParticipantAccount {
                channel,
                agent,
                joined_at: now,
                rate: RateWindow::new(),
                is_active: true,
                bump: participant_bump,
            }),
        )?;
    }

    tracing::info!(channel = %channel, name = %name, ?visibility, "Channel created");
    Ok(channel)
}

/// Join a channel as the signer's agent.
///
/// Public channels admit anyone below capacity. Private channels
/// additionally consume a valid, unused invitation bound to the signer.
/// Fee-gated channels debit the join fee from the signer's escrow in the
/// same transaction; on any failure nothing is staged.
pub fn join_channel(
    txn: &mut Transaction<'_>,
    signer: &PublicKey,
    channel: &Address,
) -> Result<Address, ChannelError> {
    let (agent, _) = agent_address(signer)?;
    if txn.agent(&agent).is_err() {
        return Err(ChannelError::AgentNotFound(agent));
    }

    let mut channel_account = load_channel(txn, channel)?;
    if !channel_account.is_active {
        return Err(ChannelError::ChannelInactive(*channel));
    }

    let (participant, participant_bump) = participant_address(channel, &agent)?;
    let existing = match txn.participant(&participant) {
        Ok(record) => {
            if record.is_active {
                return Err(ChannelError::AlreadyParticipant);
            }
            Some(record)
        }
        Err(LedgerError::AccountNotFound(_)) => None,
        Err(e) => return Err(e.into()),
    };

    // Capacity is checked before anything else can admit the caller: a
    // full channel rejects every join, invitation or not.
    if channel_account.is_full() {
        return Err(ChannelError::ChannelFull {
            max: channel_account.max_participants,
        });
    }

    if channel_account.visibility == ChannelVisibility::Private {
        consume_invitation(txn, channel, signer)?;
    }

    if channel_account.requires_fee() {
        let fee = channel_account.fee_per_message;
        agentmesh_escrow::debit_join_fee(txn, channel, signer, fee)?;
        channel_account.escrow_total = channel_account
            .escrow_total
            .checked_add(fee)
            .ok_or(ChannelError::ArithmeticOverflow)?;
    }

    channel_account.participant_count = channel_account
        .participant_count
        .checked_add(1)
        .ok_or(ChannelError::ArithmeticOverflow)?;

    let now = txn.now();
    let record = ParticipantAccount {
        channel: *channel,
        agent,
        joined_at: now,
        rate: RateWindow::new(),
        is_active: true,
        bump: participant_bump,
    };
    match existing {
        Some(_) => txn.update(participant, AccountData::Participant(record))?,
        None => txn.create(participant, AccountData::Participant(record))?,
    }
    txn.update(*channel, AccountData::Channel(channel_account))?;

    tracing::info!(channel = %channel, agent = %agent, "Agent joined channel");
    Ok(participant)
}

/// Leave a channel. The participant record is deactivated, not deleted,
/// and escrow is untouched (its lifecycle is independent of membership).
pub fn leave_channel(
    txn: &mut Transaction<'_>,
    signer: &PublicKey,
    channel: &Address,
) -> Result<(), ChannelError> {
    let (agent, _) = agent_address(signer)?;
    let (participant, _) = participant_address(channel, &agent)?;

    let mut record = match txn.participant(&participant) {
        Ok(record) if record.is_active => record,
        Ok(_) => return Err(ChannelError::NotAParticipant),
        Err(LedgerError::AccountNotFound(_)) => return Err(ChannelError::NotAParticipant),
        Err(e) => return Err(e.into()),
    };

    let mut channel_account = load_channel(txn, channel)?;
    channel_account.participant_count = channel_account
        .participant_count
        .checked_sub(1)
        .ok_or(ChannelError::ArithmeticUnderflow)?;

    record.is_active = false;
    txn.update(participant, AccountData::Participant(record))?;
    txn.update(*channel, AccountData::Channel(channel_account))?;

    tracing::info!(channel = %channel, agent = %agent, "Agent left channel");
    Ok(())
}

/// Mark a channel inactive. Creator-signed only; inactive channels
/// reject joins, invitations, and broadcasts but retain all records.
pub fn deactivate_channel(
    txn: &mut Transaction<'_>,
    signer: &PublicKey,
    channel: &Address,
) -> Result<(), ChannelError> {
    let mut channel_account = load_channel(txn, channel)?;
    if channel_account.creator != *signer {
        return Err(ChannelError::Unauthorized);
    }

    channel_account.is_active = false;
    txn.update(*channel, AccountData::Channel(channel_account))?;

    tracing::info!(channel = %channel, "Channel deactivated");
    Ok(())
}

/// Look up a channel account. Read-only.
pub fn get_channel(ledger: &Ledger, channel: &Address) -> Result<ChannelAccount, ChannelError> {
    ledger
        .account(channel)
        .and_then(|data| data.as_channel())
        .cloned()
        .ok_or(ChannelError::ChannelNotFound(*channel))
}

/// Whether an agent currently holds active membership. Read-only.
pub fn is_participant(ledger: &Ledger, channel: &Address, agent: &Address) -> bool {
    participant_address(channel, agent)
        .ok()
        .and_then(|(address, _)| ledger.account(&address).cloned())
        .and_then(|data| data.as_participant().cloned())
        .map(|record| record.is_active)
        .unwrap_or(false)
}

fn load_channel(
    txn: &Transaction<'_>,
    channel: &Address,
) -> Result<ChannelAccount, ChannelError> {
    match txn.channel(channel) {
        Ok(account) => Ok(account),
        Err(LedgerError::AccountNotFound(a)) => Err(ChannelError::ChannelNotFound(a)),
        Err(e) => Err(e.into()),
    }
}

/// Validate and consume the signer's invitation for a private channel.
fn consume_invitation(
    txn: &mut Transaction<'_>,
    channel: &Address,
    invitee: &PublicKey,
) -> Result<(), ChannelError> {
    let (address, _) = invitation_address(channel, invitee)?;
    let mut invitation = match txn.invitation(&address) {
        Ok(invitation) => invitation,
        Err(LedgerError::AccountNotFound(_)) => return Err(ChannelError::InvitationRequired),
        Err(e) => return Err(e.into()),
    };

    if invitation.used {
        return Err(ChannelError::InvitationAlreadyUsed);
    }
    if invitation.invitee != *invitee || invitation.channel != *channel {
        return Err(ChannelError::InvitationMismatch);
    }
    let expected = invitation_commitment(
        &invitation.channel,
        &invitation.invitee,
        invitation.nonce,
        invitation.created_at,
    );
    if !constant_time_eq(&expected, &invitation.commitment) {
        return Err(ChannelError::InvitationMismatch);
    }

    invitation.used = true;
    txn.update(address, AccountData::Invitation(invitation))?;
    Ok(())
}
