//! Instruction dispatch engine.
//!
//! The engine owns the ledger and blob store and is the single entry
//! point for state transitions. Each instruction runs inside one ledger
//! transaction: every validation failure surfaces before commit, so an
//! instruction either applies all of its account writes or none.

use chrono::{DateTime, Utc};

use agentmesh_channels as channels;
use agentmesh_directory as directory;
use agentmesh_escrow as escrow;
use agentmesh_ledger::{BlobStore, Ledger};
use agentmesh_protocol::{Address, ProtocolConfig, PublicKey};

use crate::envelope::{Instruction, SignedInstruction};
use crate::EngineError;

/// Result of a successfully executed instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// The instruction that ran.
    pub instruction: &'static str,
    /// Address created or primarily touched, when the operation has one.
    pub address: Option<Address>,
}

/// Executes instructions against the ledger.
pub struct Engine {
    ledger: Ledger,
    blobs: BlobStore,
    config: ProtocolConfig,
}

impl Engine {
    pub fn new(config: ProtocolConfig) -> Self {
        Self {
            ledger: Ledger::new(),
            blobs: BlobStore::new(),
            config,
        }
    }

    /// Verify a signed envelope, then execute its instruction at `now`.
    pub fn execute_signed(
        &mut self,
        signed: &SignedInstruction,
        now: DateTime<Utc>,
    ) -> Result<Receipt, EngineError> {
        signed.verify()?;
        self.execute(&signed.signer, signed.instruction.clone(), now)
    }

    /// Execute an instruction whose signer the host has already
    /// authenticated.
    pub fn execute(
        &mut self,
        signer: &PublicKey,
        instruction: Instruction,
        now: DateTime<Utc>,
    ) -> Result<Receipt, EngineError> {
        let name = instruction.name();
        tracing::debug!(instruction = name, signer = %signer, "Executing instruction");

        let config = &self.config;
        let blobs = &mut self.blobs;
        let mut txn = self.ledger.transaction(now);

        let address = match instruction {
            Instruction::RegisterAgent {
                capabilities,
                metadata_uri,
            } => Some(directory::register_agent(
                &mut txn,
                config,
                signer,
                capabilities,
                metadata_uri,
            )?),
            Instruction::UpdateAgent {
                agent,
                new_capabilities,
                new_metadata_uri,
            } => {
                directory::update_agent(
                    &mut txn,
                    config,
                    signer,
                    &agent,
                    new_capabilities,
                    new_metadata_uri,
                )?;
                Some(agent)
            }
            Instruction::SendMessage {
                recipient,
                payload_hash,
                kind,
            } => Some(directory::send_message(
                &mut txn,
                config,
                signer,
                &recipient,
                payload_hash,
                kind,
            )?),
            Instruction::UpdateMessageStatus { message, status } => {
                directory::update_message_status(&mut txn, signer, &message, status)?;
                Some(message)
            }
            Instruction::CreateChannel {
                name,
                description,
                visibility,
                max_participants,
                fee_per_message,
            } => Some(channels::create_channel(
                &mut txn,
                config,
                signer,
                name,
                description,
                visibility,
                max_participants,
                fee_per_message,
            )?),
            Instruction::CreateChannelWithOwner {
                name,
                description,
                visibility,
                max_participants,
                fee_per_message,
            } => Some(channels::create_channel_with_owner(
                &mut txn,
                config,
                signer,
                name,
                description,
                visibility,
                max_participants,
                fee_per_message,
            )?),
            Instruction::JoinChannel { channel } => {
                Some(channels::join_channel(&mut txn, signer, &channel)?)
            }
            Instruction::LeaveChannel { channel } => {
                channels::leave_channel(&mut txn, signer, &channel)?;
                Some(channel)
            }
            Instruction::DeactivateChannel { channel } => {
                channels::deactivate_channel(&mut txn, signer, &channel)?;
                Some(channel)
            }
            Instruction::InviteToChannel {
                channel,
                invitee,
                nonce,
            } => Some(channels::invite_to_channel(
                &mut txn, config, signer, &channel, invitee, nonce,
            )?),
            Instruction::BroadcastMessage {
                channel,
                content,
                kind,
                reply_to,
                nonce,
            } => Some(channels::broadcast_message(
                &mut txn, blobs, config, signer, &channel, &content, kind, reply_to, nonce,
            )?),
            Instruction::DepositEscrow { channel, amount } => {
                Some(escrow::deposit(&mut txn, signer, &channel, amount)?)
            }
            Instruction::WithdrawEscrow { channel, amount } => {
                escrow::withdraw(&mut txn, signer, &channel, amount)?;
                None
            }
        };

        txn.commit();
        Ok(Receipt {
            instruction: name,
            address,
        })
    }

    /// Committed account state, for queries.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Payload bytes behind the content hashes in account state.
    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Store payload bytes ahead of a [`Instruction::SendMessage`], which
    /// carries only the content hash.
    pub fn blobs_mut(&mut self) -> &mut BlobStore {
        &mut self.blobs
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }
}
