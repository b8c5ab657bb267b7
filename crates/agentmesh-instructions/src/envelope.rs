//! Signed instruction envelope.
//!
//! Clients serialize an [`Instruction`] to canonical JSON, sign it with
//! their wallet key, and submit the envelope. The host runtime verifies
//! the signature before dispatch; handlers then treat the signer key as
//! authenticated.

use ed25519_dalek::{Signature, SigningKey};
use serde::{Deserialize, Serialize};

use agentmesh_protocol::accounts::{ChannelVisibility, MessageKind, MessageStatus};
use agentmesh_protocol::crypto::{sign_payload, verify_signature, ContentHash};
use agentmesh_protocol::{Address, ProtocolError, PublicKey};

use crate::EngineError;

/// The complete set of state-transition operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Instruction {
    RegisterAgent {
        capabilities: u64,
        metadata_uri: String,
    },
    UpdateAgent {
        agent: Address,
        new_capabilities: Option<u64>,
        new_metadata_uri: Option<String>,
    },
    SendMessage {
        recipient: PublicKey,
        payload_hash: ContentHash,
        kind: MessageKind,
    },
    UpdateMessageStatus {
        message: Address,
        status: MessageStatus,
    },
    CreateChannel {
        name: String,
        description: String,
        visibility: ChannelVisibility,
        max_participants: u32,
        fee_per_message: u64,
    },
    /// V2 creation: also creates the creator's participant record in the
    /// same transaction.
    CreateChannelWithOwner {
        name: String,
        description: String,
        visibility: ChannelVisibility,
        max_participants: u32,
        fee_per_message: u64,
    },
    JoinChannel {
        channel: Address,
    },
    LeaveChannel {
        channel: Address,
    },
    DeactivateChannel {
        channel: Address,
    },
    InviteToChannel {
        channel: Address,
        invitee: PublicKey,
        nonce: u64,
    },
    BroadcastMessage {
        channel: Address,
        content: Vec<u8>,
        kind: MessageKind,
        reply_to: Option<Address>,
        nonce: u64,
    },
    DepositEscrow {
        channel: Address,
        amount: u64,
    },
    WithdrawEscrow {
        channel: Address,
        amount: u64,
    },
}

impl Instruction {
    /// Instruction name for logs and receipts.
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::RegisterAgent { .. } => "register_agent",
            Instruction::UpdateAgent { .. } => "update_agent",
            Instruction::SendMessage { .. } => "send_message",
            Instruction::UpdateMessageStatus { .. } => "update_message_status",
            Instruction::CreateChannel { .. } => "create_channel",
            Instruction::CreateChannelWithOwner { .. } => "create_channel_with_owner",
            Instruction::JoinChannel { .. } => "join_channel",
            Instruction::LeaveChannel { .. } => "leave_channel",
            Instruction::DeactivateChannel { .. } => "deactivate_channel",
            Instruction::InviteToChannel { .. } => "invite_to_channel",
            Instruction::BroadcastMessage { .. } => "broadcast_message",
            Instruction::DepositEscrow { .. } => "deposit_escrow",
            Instruction::WithdrawEscrow { .. } => "withdraw_escrow",
        }
    }

    /// Canonical bytes the wallet signs: the JSON encoding of the
    /// instruction.
    pub fn signing_payload(&self) -> Result<Vec<u8>, EngineError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// An instruction plus the wallet signature authorizing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedInstruction {
    pub instruction: Instruction,
    /// The wallet key claiming authorship.
    pub signer: PublicKey,
    /// Hex-encoded Ed25519 signature over the signing payload.
    pub signature: String,
}

impl SignedInstruction {
    /// Sign an instruction with a wallet key.
    pub fn sign(signing_key: &SigningKey, instruction: Instruction) -> Result<Self, EngineError> {
        let payload = instruction.signing_payload()?;
        let signature = sign_payload(signing_key, &payload);
        Ok(Self {
            instruction,
            signer: PublicKey::from_verifying_key(&signing_key.verifying_key()),
            signature: hex::encode(signature.to_bytes()),
        })
    }

    /// Verify the envelope signature against the claimed signer.
    pub fn verify(&self) -> Result<(), EngineError> {
        let bytes = hex::decode(&self.signature)
            .map_err(|e| ProtocolError::InvalidSignature(e.to_string()))?;
        let bytes: [u8; 64] = bytes
            .try_into()
            .map_err(|_| ProtocolError::InvalidSignature("expected 64 bytes".into()))?;
        let signature = Signature::from_bytes(&bytes);
        let payload = self.instruction.signing_payload()?;
        verify_signature(&self.signer, &payload, &signature)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentmesh_protocol::crypto::generate_keypair;

    #[test]
    fn test_sign_and_verify_envelope() {
        let wallet = generate_keypair();
        let signed = SignedInstruction::sign(
            &wallet,
            Instruction::RegisterAgent {
                capabilities: 1,
                metadata_uri: "ipfs://meta".into(),
            },
        )
        .unwrap();
        assert!(signed.verify().is_ok());
    }

    #[test]
    fn test_tampered_instruction_fails_verification() {
        let wallet = generate_keypair();
        let mut signed = SignedInstruction::sign(
            &wallet,
            Instruction::DepositEscrow {
                channel: Address::new([1; 32]),
                amount: 10,
            },
        )
        .unwrap();
        signed.instruction = Instruction::DepositEscrow {
            channel: Address::new([1; 32]),
            amount: 10_000,
        };
        assert!(signed.verify().is_err());
    }

    #[test]
    fn test_wrong_signer_fails_verification() {
        let wallet = generate_keypair();
        let other = generate_keypair();
        let mut signed = SignedInstruction::sign(
            &wallet,
            Instruction::LeaveChannel {
                channel: Address::new([2; 32]),
            },
        )
        .unwrap();
        signed.signer = PublicKey::from_verifying_key(&other.verifying_key());
        assert!(signed.verify().is_err());
    }
}
