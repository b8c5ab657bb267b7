//! Agent registry: registration, owner-only updates, lookups.

use agentmesh_directory::{get_agent, register_agent, update_agent, DirectoryError};
use agentmesh_ledger::Ledger;
use agentmesh_protocol::{ProtocolConfig, PublicKey};
use chrono::{DateTime, TimeZone, Utc};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 10, 8, 0, 0).unwrap()
}

fn key(byte: u8) -> PublicKey {
    PublicKey::new([byte; 32])
}

fn register(ledger: &mut Ledger, owner: &PublicKey) -> agentmesh_protocol::Address {
    let config = ProtocolConfig::default();
    let mut txn = ledger.transaction(now());
    let address = register_agent(&mut txn, &config, owner, 0b101, "ipfs://agent-meta".into())
        .expect("registration should succeed");
    txn.commit();
    address
}

#[test]
fn register_creates_fresh_agent() {
    let mut ledger = Ledger::new();
    let alice = key(1);
    register(&mut ledger, &alice);

    let agent = get_agent(&ledger, &alice).unwrap();
    assert_eq!(agent.owner, alice);
    assert_eq!(agent.capabilities, 0b101);
    assert_eq!(agent.reputation, 0);
    assert_eq!(agent.invites_sent, 0);
    assert!(agent.last_invite_at.is_none());
}

#[test]
fn register_twice_fails() {
    let mut ledger = Ledger::new();
    let config = ProtocolConfig::default();
    let alice = key(1);
    register(&mut ledger, &alice);

    let mut txn = ledger.transaction(now());
    let result = register_agent(&mut txn, &config, &alice, 0, "ipfs://other".into());
    assert!(matches!(
        result,
        Err(DirectoryError::AgentAlreadyRegistered(_))
    ));
}

#[test]
fn register_rejects_oversized_metadata() {
    let mut ledger = Ledger::new();
    let config = ProtocolConfig::default();
    let uri = "x".repeat(config.limits.max_metadata_uri_len + 1);

    let mut txn = ledger.transaction(now());
    let result = register_agent(&mut txn, &config, &key(1), 0, uri);
    assert!(matches!(
        result,
        Err(DirectoryError::InvalidMetadata { .. })
    ));
}

#[test]
fn update_changes_only_provided_fields() {
    let mut ledger = Ledger::new();
    let config = ProtocolConfig::default();
    let alice = key(1);
    let address = register(&mut ledger, &alice);

    let mut txn = ledger.transaction(now());
    update_agent(&mut txn, &config, &alice, &address, Some(0xff), None).unwrap();
    txn.commit();

    let agent = get_agent(&ledger, &alice).unwrap();
    assert_eq!(agent.capabilities, 0xff);
    assert_eq!(agent.metadata_uri, "ipfs://agent-meta");
}

#[test]
fn update_by_non_owner_fails_and_mutates_nothing() {
    let mut ledger = Ledger::new();
    let config = ProtocolConfig::default();
    let alice = key(1);
    let mallory = key(2);
    let address = register(&mut ledger, &alice);

    {
        let mut txn = ledger.transaction(now());
        let result = update_agent(
            &mut txn,
            &config,
            &mallory,
            &address,
            Some(u64::MAX),
            Some("ipfs://hijacked".into()),
        );
        assert!(matches!(result, Err(DirectoryError::Unauthorized)));
    }

    let agent = get_agent(&ledger, &alice).unwrap();
    assert_eq!(agent.capabilities, 0b101);
    assert_eq!(agent.metadata_uri, "ipfs://agent-meta");
}

#[test]
fn update_rejects_substituted_account() {
    // Mallory registers her own agent, then tries to mutate it while
    // claiming Alice's address; and vice versa. Both must fail.
    let mut ledger = Ledger::new();
    let config = ProtocolConfig::default();
    let alice = key(1);
    let mallory = key(2);
    let alice_addr = register(&mut ledger, &alice);

    register(&mut ledger, &mallory);

    let mut txn = ledger.transaction(now());
    let result = update_agent(&mut txn, &config, &mallory, &alice_addr, Some(7), None);
    assert!(matches!(result, Err(DirectoryError::Unauthorized)));
}

#[test]
fn get_agent_unknown_owner() {
    let ledger = Ledger::new();
    assert!(matches!(
        get_agent(&ledger, &key(9)),
        Err(DirectoryError::AgentNotFound(_))
    ));
}
