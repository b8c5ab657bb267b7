//! Message store: addressing, duplicates, status transitions, expiry.

use agentmesh_directory::{
    get_agent, get_message, register_agent, send_message, update_message_status, DirectoryError,
};
use agentmesh_ledger::Ledger;
use agentmesh_protocol::crypto::ContentHash;
use agentmesh_protocol::{
    Address, MessageKind, MessageStatus, ProtocolConfig, PublicKey,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 10, 8, 0, 0).unwrap()
}

fn key(byte: u8) -> PublicKey {
    PublicKey::new([byte; 32])
}

fn setup() -> (Ledger, ProtocolConfig, PublicKey, PublicKey) {
    let mut ledger = Ledger::new();
    let config = ProtocolConfig::default();
    let alice = key(1);
    let bob = key(2);
    for owner in [&alice, &bob] {
        let mut txn = ledger.transaction(now());
        register_agent(&mut txn, &config, owner, 0, "ipfs://meta".into()).unwrap();
        txn.commit();
    }
    (ledger, config, alice, bob)
}

fn send(
    ledger: &mut Ledger,
    config: &ProtocolConfig,
    sender: &PublicKey,
    recipient: &PublicKey,
    payload: &[u8],
    at: DateTime<Utc>,
) -> Result<Address, DirectoryError> {
    let mut txn = ledger.transaction(at);
    let result = send_message(
        &mut txn,
        config,
        sender,
        recipient,
        ContentHash::compute(payload),
        MessageKind::Text,
    );
    if result.is_ok() {
        txn.commit();
    }
    result
}

#[test]
fn send_requires_registered_sender() {
    let (mut ledger, config, _, bob) = setup();
    let stranger = key(9);
    let result = send(&mut ledger, &config, &stranger, &bob, b"hi", now());
    assert!(matches!(result, Err(DirectoryError::AgentNotFound(_))));
}

#[test]
fn send_requires_registered_recipient() {
    let (mut ledger, config, alice, _) = setup();
    let stranger = key(9);
    let result = send(&mut ledger, &config, &alice, &stranger, b"hi", now());
    assert!(matches!(result, Err(DirectoryError::RecipientNotFound(_))));
}

#[test]
fn send_creates_pending_message_with_ttl() {
    let (mut ledger, config, alice, bob) = setup();
    let address = send(&mut ledger, &config, &alice, &bob, b"hi", now()).unwrap();

    let view = get_message(&ledger, &address, now()).unwrap();
    assert_eq!(view.status, MessageStatus::Pending);
    assert_eq!(view.message.recipient, bob);
    assert_eq!(view.message.expires_at, now() + Duration::days(7));

    // Sender reputation accrues.
    assert_eq!(get_agent(&ledger, &alice).unwrap().reputation, 1);
}

#[test]
fn duplicate_send_rejected_while_live() {
    let (mut ledger, config, alice, bob) = setup();
    send(&mut ledger, &config, &alice, &bob, b"hi", now()).unwrap();

    let result = send(
        &mut ledger,
        &config,
        &alice,
        &bob,
        b"hi",
        now() + Duration::hours(1),
    );
    assert!(matches!(result, Err(DirectoryError::DuplicateMessage(_))));
}

#[test]
fn expired_slot_accepts_fresh_message() {
    let (mut ledger, config, alice, bob) = setup();
    let address = send(&mut ledger, &config, &alice, &bob, b"hi", now()).unwrap();

    let later = now() + Duration::days(8);
    let resent = send(&mut ledger, &config, &alice, &bob, b"hi", later).unwrap();
    assert_eq!(address, resent);

    let view = get_message(&ledger, &resent, later).unwrap();
    assert_eq!(view.status, MessageStatus::Pending);
    assert_eq!(view.message.created_at, later);
}

#[test]
fn different_kind_is_a_different_message() {
    let (mut ledger, config, alice, bob) = setup();
    let text = send(&mut ledger, &config, &alice, &bob, b"hi", now()).unwrap();

    let mut txn = ledger.transaction(now());
    let data = send_message(
        &mut txn,
        &config,
        &alice,
        &bob,
        ContentHash::compute(b"hi"),
        MessageKind::Data,
    )
    .unwrap();
    txn.commit();
    assert_ne!(text, data);
}

#[test]
fn status_walks_forward_only() {
    let (mut ledger, config, alice, bob) = setup();
    let address = send(&mut ledger, &config, &alice, &bob, b"hi", now()).unwrap();

    for status in [MessageStatus::Delivered, MessageStatus::Read] {
        let mut txn = ledger.transaction(now());
        update_message_status(&mut txn, &bob, &address, status).unwrap();
        txn.commit();
    }
    assert_eq!(
        get_message(&ledger, &address, now()).unwrap().status,
        MessageStatus::Read
    );

    let mut txn = ledger.transaction(now());
    let result = update_message_status(&mut txn, &bob, &address, MessageStatus::Delivered);
    assert!(matches!(
        result,
        Err(DirectoryError::InvalidStatusTransition {
            from: MessageStatus::Read,
            to: MessageStatus::Delivered,
        })
    ));
}

#[test]
fn only_recipient_updates_status() {
    let (mut ledger, config, alice, bob) = setup();
    let address = send(&mut ledger, &config, &alice, &bob, b"hi", now()).unwrap();

    // Neither the sender nor a third party may touch delivery status.
    for signer in [alice, key(9)] {
        let mut txn = ledger.transaction(now());
        let result = update_message_status(&mut txn, &signer, &address, MessageStatus::Delivered);
        assert!(matches!(result, Err(DirectoryError::Unauthorized)));
    }
}

#[test]
fn expired_message_rejects_updates_and_reads_expired() {
    let (mut ledger, config, alice, bob) = setup();
    let address = send(&mut ledger, &config, &alice, &bob, b"hi", now()).unwrap();

    let later = now() + Duration::days(7) + Duration::seconds(1);
    let mut txn = ledger.transaction(later);
    let result = update_message_status(&mut txn, &bob, &address, MessageStatus::Delivered);
    assert!(matches!(result, Err(DirectoryError::MessageExpired(_))));

    let view = get_message(&ledger, &address, later).unwrap();
    assert_eq!(view.status, MessageStatus::Expired);
    // Stored status is untouched; expiry is a read-time property.
    assert_eq!(view.message.status, MessageStatus::Pending);
}

#[test]
fn failed_is_reachable_then_terminal() {
    let (mut ledger, config, alice, bob) = setup();
    let address = send(&mut ledger, &config, &alice, &bob, b"hi", now()).unwrap();

    let mut txn = ledger.transaction(now());
    update_message_status(&mut txn, &bob, &address, MessageStatus::Failed).unwrap();
    txn.commit();

    let mut txn = ledger.transaction(now());
    let result = update_message_status(&mut txn, &bob, &address, MessageStatus::Read);
    assert!(matches!(
        result,
        Err(DirectoryError::InvalidStatusTransition { .. })
    ));
}
