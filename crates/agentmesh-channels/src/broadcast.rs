//! Channel broadcasts.
//!
//! A broadcast stores its payload in the content-addressed blob store and
//! persists a channel message account keyed by (channel, sender agent,
//! nonce). Admission runs the two-tier rate limit against the sender's
//! participant record; the payload only reaches the blob store once every
//! check has passed.

use agentmesh_ledger::{BlobStore, Ledger, LedgerError, Transaction};
use agentmesh_protocol::accounts::{AccountData, ChannelMessageAccount, MessageKind};
use agentmesh_protocol::derivation::{
    agent_address, channel_message_address, participant_address,
};
use agentmesh_protocol::{Address, ProtocolConfig, PublicKey, REPUTATION_PER_MESSAGE};

use crate::rate_limit::record_broadcast;
use crate::ChannelError;

/// Broadcast `content` to a channel the signer participates in.
#[allow(clippy::too_many_arguments)]
pub fn broadcast_message(
    txn: &mut Transaction<'_>,
    blobs: &mut BlobStore,
    config: &ProtocolConfig,
    signer: &PublicKey,
    channel: &Address,
    content: &[u8],
    kind: MessageKind,
    reply_to: Option<Address>,
    nonce: u64,
) -> Result<Address, ChannelError> {
    let (agent, _) = agent_address(signer)?;
    let mut sender = txn
        .agent(&agent)
        .map_err(|_| ChannelError::AgentNotFound(agent))?;

    let channel_account = match txn.channel(channel) {
        Ok(account) => account,
        Err(LedgerError::AccountNotFound(a)) => return Err(ChannelError::ChannelNotFound(a)),
        Err(e) => return Err(e.into()),
    };
    if !channel_account.is_active {
        return Err(ChannelError::ChannelInactive(*channel));
    }

    let (participant_addr, _) = participant_address(channel, &agent)?;
    let mut participant = match txn.participant(&participant_addr) {
        Ok(record) if record.is_active => record,
        Ok(_) | Err(LedgerError::AccountNotFound(_)) => {
            return Err(ChannelError::NotAParticipant)
        }
        Err(e) => return Err(e.into()),
    };

    let max = config.broadcast.max_content_len;
    if content.len() > max {
        return Err(ChannelError::ContentTooLarge {
            len: content.len(),
            max,
        });
    }

    record_broadcast(&mut participant.rate, config, txn.now())?;

    if let Some(target) = reply_to {
        let parent = match txn.channel_message(&target) {
            Ok(parent) => parent,
            Err(_) => return Err(ChannelError::ReplyNotFound(target)),
        };
        if parent.channel != *channel {
            return Err(ChannelError::ReplyNotFound(target));
        }
    }

    let (address, bump) = channel_message_address(channel, &agent, nonce)?;
    if txn.contains(&address) {
        return Err(ChannelError::DuplicateBroadcast(nonce));
    }

    let payload_hash = blobs.store(content);
    txn.create(
        address,
        AccountData::ChannelMessage(ChannelMessageAccount {
            channel: *channel,
            sender: agent,
            payload_hash,
            kind,
            reply_to,
            nonce,
            created_at: txn.now(),
            bump,
        }),
    )?;
    txn.update(participant_addr, AccountData::Participant(participant))?;

    sender.reputation = sender
        .reputation
        .checked_add(REPUTATION_PER_MESSAGE)
        .ok_or(ChannelError::ArithmeticOverflow)?;
    txn.update(agent, AccountData::Agent(sender))?;

    tracing::info!(message = %address, channel = %channel, "Broadcast sent");
    Ok(address)
}

/// All broadcasts for a channel, oldest first. A full scan; production
/// deployments point an off-chain indexer at the ledger instead.
pub fn channel_messages(ledger: &Ledger, channel: &Address) -> Vec<ChannelMessageAccount> {
    let mut messages: Vec<ChannelMessageAccount> = ledger
        .iter()
        .filter_map(|(_, record)| record.data.as_channel_message())
        .filter(|message| message.channel == *channel)
        .cloned()
        .collect();
    messages.sort_by_key(|message| message.created_at);
    messages
}
