//! End-to-end instruction flows through the signed envelope and engine.

use agentmesh_channels::ChannelError;
use agentmesh_directory::DirectoryError;
use agentmesh_escrow::EscrowError;
use agentmesh_instructions::{Engine, EngineError, Instruction, SignedInstruction};
use agentmesh_protocol::accounts::{ChannelVisibility, MessageKind, MessageStatus};
use agentmesh_protocol::crypto::generate_keypair;
use agentmesh_protocol::derivation::agent_address;
use agentmesh_protocol::{ProtocolConfig, ProtocolError, PublicKey};
use chrono::{DateTime, Duration, TimeZone, Utc};
use ed25519_dalek::SigningKey;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap()
}

fn wallet() -> (SigningKey, PublicKey) {
    let signing_key = generate_keypair();
    let public = PublicKey::from_verifying_key(&signing_key.verifying_key());
    (signing_key, public)
}

fn run(
    engine: &mut Engine,
    wallet: &SigningKey,
    instruction: Instruction,
    at: DateTime<Utc>,
) -> Result<agentmesh_instructions::Receipt, EngineError> {
    let signed = SignedInstruction::sign(wallet, instruction).unwrap();
    engine.execute_signed(&signed, at)
}

fn register(engine: &mut Engine, wallet: &SigningKey, at: DateTime<Utc>) {
    run(
        engine,
        wallet,
        Instruction::RegisterAgent {
            capabilities: 0b11,
            metadata_uri: "ipfs://meta".into(),
        },
        at,
    )
    .unwrap();
}

#[test]
fn full_channel_lifecycle() {
    let mut engine = Engine::new(ProtocolConfig::default());
    let (alice_key, _alice) = wallet();
    let (bob_key, bob) = wallet();
    register(&mut engine, &alice_key, start());
    register(&mut engine, &bob_key, start());

    // Alice creates a private, fee-gated channel and is a member of it
    // from the same instruction.
    let receipt = run(
        &mut engine,
        &alice_key,
        Instruction::CreateChannelWithOwner {
            name: "warroom".into(),
            description: "ops".into(),
            visibility: ChannelVisibility::Private,
            max_participants: 4,
            fee_per_message: 5,
        },
        start(),
    )
    .unwrap();
    let channel = receipt.address.unwrap();

    // Bob funds escrow, receives an invitation, and joins; the fee moves
    // in the same instruction as the membership grant.
    run(
        &mut engine,
        &bob_key,
        Instruction::DepositEscrow {
            channel,
            amount: 12,
        },
        start() + Duration::seconds(1),
    )
    .unwrap();
    run(
        &mut engine,
        &alice_key,
        Instruction::InviteToChannel {
            channel,
            invitee: bob,
            nonce: 99,
        },
        start() + Duration::seconds(2),
    )
    .unwrap();
    run(
        &mut engine,
        &bob_key,
        Instruction::JoinChannel { channel },
        start() + Duration::seconds(3),
    )
    .unwrap();

    let state = agentmesh_channels::get_channel(engine.ledger(), &channel).unwrap();
    assert_eq!(state.participant_count, 2);
    assert_eq!(state.escrow_total, 5);
    assert_eq!(
        agentmesh_escrow::balance(engine.ledger(), &channel, &bob).unwrap(),
        7
    );

    // Bob broadcasts; the payload lands in the blob store.
    let receipt = run(
        &mut engine,
        &bob_key,
        Instruction::BroadcastMessage {
            channel,
            content: b"checking in".to_vec(),
            kind: MessageKind::Text,
            reply_to: None,
            nonce: 1,
        },
        start() + Duration::seconds(10),
    )
    .unwrap();
    let message = receipt.address.unwrap();
    let stored = engine
        .ledger()
        .account(&message)
        .unwrap()
        .as_channel_message()
        .unwrap()
        .clone();
    assert_eq!(engine.blobs().get(&stored.payload_hash).unwrap(), b"checking in");

    // Bob withdraws what is left of his escrow.
    run(
        &mut engine,
        &bob_key,
        Instruction::WithdrawEscrow { channel, amount: 7 },
        start() + Duration::seconds(11),
    )
    .unwrap();
    assert_eq!(
        agentmesh_escrow::balance(engine.ledger(), &channel, &bob).unwrap(),
        0
    );
}

#[test]
fn direct_message_round_trip() {
    let mut engine = Engine::new(ProtocolConfig::default());
    let (alice_key, _) = wallet();
    let (bob_key, bob) = wallet();
    register(&mut engine, &alice_key, start());
    register(&mut engine, &bob_key, start());

    let payload = b"meet at dawn";
    let payload_hash = engine.blobs_mut().store(payload);

    let receipt = run(
        &mut engine,
        &alice_key,
        Instruction::SendMessage {
            recipient: bob,
            payload_hash,
            kind: MessageKind::Text,
        },
        start(),
    )
    .unwrap();
    let message = receipt.address.unwrap();

    for status in [MessageStatus::Delivered, MessageStatus::Read] {
        run(
            &mut engine,
            &bob_key,
            Instruction::UpdateMessageStatus { message, status },
            start() + Duration::seconds(1),
        )
        .unwrap();
    }

    let view =
        agentmesh_directory::get_message(engine.ledger(), &message, start() + Duration::hours(1))
            .unwrap();
    assert_eq!(view.status, MessageStatus::Read);
    assert_eq!(engine.blobs().get(&view.message.payload_hash).unwrap(), payload);
}

#[test]
fn forged_envelope_is_rejected_before_dispatch() {
    let mut engine = Engine::new(ProtocolConfig::default());
    let (alice_key, _) = wallet();
    let (mallory_key, _) = wallet();
    register(&mut engine, &alice_key, start());

    // Mallory signs an instruction but claims Alice's key as signer.
    let mut signed = SignedInstruction::sign(
        &mallory_key,
        Instruction::RegisterAgent {
            capabilities: 0,
            metadata_uri: "ipfs://fake".into(),
        },
    )
    .unwrap();
    signed.signer = PublicKey::from_verifying_key(&alice_key.verifying_key());

    let result = engine.execute_signed(&signed, start());
    assert!(matches!(
        result,
        Err(EngineError::Protocol(ProtocolError::InvalidSignature(_)))
    ));
}

#[test]
fn failed_instruction_leaves_no_trace() {
    let mut engine = Engine::new(ProtocolConfig::default());
    let (alice_key, _) = wallet();
    let (bob_key, bob) = wallet();
    register(&mut engine, &alice_key, start());
    register(&mut engine, &bob_key, start());

    let receipt = run(
        &mut engine,
        &alice_key,
        Instruction::CreateChannelWithOwner {
            name: "paid".into(),
            description: String::new(),
            visibility: ChannelVisibility::Public,
            max_participants: 4,
            fee_per_message: 10,
        },
        start(),
    )
    .unwrap();
    let channel = receipt.address.unwrap();

    run(
        &mut engine,
        &bob_key,
        Instruction::DepositEscrow { channel, amount: 9 },
        start(),
    )
    .unwrap();
    let accounts_before = engine.ledger().len();

    let result = run(
        &mut engine,
        &bob_key,
        Instruction::JoinChannel { channel },
        start() + Duration::seconds(1),
    );
    assert!(matches!(
        result,
        Err(EngineError::Channel(ChannelError::Escrow(
            EscrowError::InsufficientBalance {
                available: 9,
                required: 10,
            }
        )))
    ));

    // The whole transaction rolled back: same account count, untouched
    // balances and membership.
    assert_eq!(engine.ledger().len(), accounts_before);
    assert_eq!(
        agentmesh_escrow::balance(engine.ledger(), &channel, &bob).unwrap(),
        9
    );
    let state = agentmesh_channels::get_channel(engine.ledger(), &channel).unwrap();
    assert_eq!(state.participant_count, 1);
    let (bob_agent, _) = agent_address(&bob).unwrap();
    assert!(!agentmesh_channels::is_participant(
        engine.ledger(),
        &channel,
        &bob_agent
    ));
}

#[test]
fn subsystem_errors_pass_through_typed() {
    let mut engine = Engine::new(ProtocolConfig::default());
    let (alice_key, _) = wallet();
    register(&mut engine, &alice_key, start());

    let result = run(
        &mut engine,
        &alice_key,
        Instruction::RegisterAgent {
            capabilities: 0,
            metadata_uri: "ipfs://again".into(),
        },
        start(),
    );
    assert!(matches!(
        result,
        Err(EngineError::Directory(
            DirectoryError::AgentAlreadyRegistered(_)
        ))
    ));
}
