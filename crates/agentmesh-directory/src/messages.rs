//! Direct message store instructions.
//!
//! A message account is addressed by the tuple (sender agent address,
//! recipient key, payload hash, kind). The sender's *agent* address is the
//! canonical seed on every path — including status updates — so both
//! derivation paths always name the same account.
//!
//! Expiry is passive: reads past `expires_at` report the message as
//! expired and updates are rejected, but nothing is deleted.

use agentmesh_ledger::{Ledger, Transaction};
use agentmesh_protocol::accounts::{AccountData, MessageAccount, MessageKind, MessageStatus};
use agentmesh_protocol::crypto::ContentHash;
use agentmesh_protocol::derivation::{
    agent_address, message_address, verify_derivation, Seed,
};
use agentmesh_protocol::{
    Address, ProtocolConfig, PublicKey, MESSAGE_NAMESPACE, REPUTATION_PER_MESSAGE,
};
use chrono::{DateTime, Utc};

use crate::DirectoryError;

/// A message as observed at a point in time: the stored account plus its
/// effective status (expiry overrides the stored value).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub message: MessageAccount,
    pub status: MessageStatus,
}

/// Send a direct message to a registered recipient.
///
/// An expired record of the same tuple is reset in place; a live one is a
/// duplicate. The sender's reputation accrues on success.
pub fn send_message(
    txn: &mut Transaction<'_>,
    config: &ProtocolConfig,
    signer: &PublicKey,
    recipient: &PublicKey,
    payload_hash: ContentHash,
    kind: MessageKind,
) -> Result<Address, DirectoryError> {
    let (sender_agent, _) = agent_address(signer)?;
    let mut sender = txn
        .agent(&sender_agent)
        .map_err(|_| DirectoryError::AgentNotFound(sender_agent))?;

    let (recipient_agent, _) = agent_address(recipient)?;
    if txn.agent(&recipient_agent).is_err() {
        return Err(DirectoryError::RecipientNotFound(*recipient));
    }

    let (address, bump) = message_address(&sender_agent, recipient, &payload_hash, kind)?;

    let now = txn.now();
    let message = MessageAccount {
        sender: sender_agent,
        recipient: *recipient,
        payload_hash,
        kind,
        status: MessageStatus::Pending,
        created_at: now,
        expires_at: now + config.message_ttl(),
        bump,
    };

    if txn.contains(&address) {
        let existing = txn.message(&address)?;
        if !existing.is_expired(now) {
            return Err(DirectoryError::DuplicateMessage(address));
        }
        // The previous message with this tuple ran out its TTL; reuse the
        // slot for a fresh pending message.
        txn.update(address, AccountData::Message(message))?;
    } else {
        txn.create(address, AccountData::Message(message))?;
    }

    sender.reputation = sender
        .reputation
        .checked_add(REPUTATION_PER_MESSAGE)
        .ok_or(DirectoryError::ArithmeticOverflow)?;
    txn.update(sender_agent, AccountData::Agent(sender))?;

    tracing::info!(message = %address, sender = %sender_agent, "Message sent");
    Ok(address)
}

/// Advance a message's delivery status. Recipient-only, monotonic.
pub fn update_message_status(
    txn: &mut Transaction<'_>,
    signer: &PublicKey,
    message: &Address,
    new_status: MessageStatus,
) -> Result<(), DirectoryError> {
    let mut account = txn
        .message(message)
        .map_err(|_| DirectoryError::MessageNotFound(*message))?;

    if account.recipient != *signer {
        return Err(DirectoryError::Unauthorized);
    }
    // Address-substitution defense: the stored fields must re-derive to
    // the account being mutated.
    if !verify_derivation(
        message,
        MESSAGE_NAMESPACE,
        &[
            Seed::Addr(&account.sender),
            Seed::Key(&account.recipient),
            Seed::Hash(&account.payload_hash),
            Seed::Bytes2(account.kind.seed_bytes()),
        ],
        account.bump,
    ) {
        return Err(DirectoryError::Unauthorized);
    }

    if account.is_expired(txn.now()) {
        return Err(DirectoryError::MessageExpired(*message));
    }

    if !account.status.can_transition_to(new_status) {
        return Err(DirectoryError::InvalidStatusTransition {
            from: account.status,
            to: new_status,
        });
    }

    account.status = new_status;
    txn.update(*message, AccountData::Message(account))?;

    tracing::debug!(message = %message, status = %new_status, "Message status updated");
    Ok(())
}

/// Read a message with its effective status at `now`. Read-only.
pub fn get_message(
    ledger: &Ledger,
    message: &Address,
    now: DateTime<Utc>,
) -> Result<MessageView, DirectoryError> {
    let account = ledger
        .account(message)
        .and_then(|data| data.as_message())
        .cloned()
        .ok_or(DirectoryError::MessageNotFound(*message))?;
    let status = account.status_at(now);
    Ok(MessageView {
        message: account,
        status,
    })
}
