//! Derivation uniqueness and idempotence across the full account schema.

use agentmesh_protocol::crypto::ContentHash;
use agentmesh_protocol::derivation::{
    agent_address, channel_address, channel_message_address, escrow_address, invitation_address,
    message_address, participant_address, verify_derivation, Seed,
};
use agentmesh_protocol::{
    Address, MessageKind, PublicKey, AGENT_NAMESPACE, RESERVED_ADDRESS_PREFIX,
};

fn key(byte: u8) -> PublicKey {
    PublicKey::new([byte; 32])
}

#[test]
fn same_inputs_same_address_every_time() {
    let owner = key(1);
    for _ in 0..10 {
        let (addr, bump) = agent_address(&owner).unwrap();
        let (again, bump_again) = agent_address(&owner).unwrap();
        assert_eq!(addr, again);
        assert_eq!(bump, bump_again);
    }
}

#[test]
fn distinct_owners_distinct_agent_addresses() {
    let mut seen = std::collections::HashSet::new();
    for byte in 0..=255u8 {
        let (addr, _) = agent_address(&key(byte)).unwrap();
        assert!(seen.insert(addr), "collision for owner byte {}", byte);
    }
}

#[test]
fn derived_addresses_avoid_reserved_prefix() {
    for byte in 0..=255u8 {
        let (addr, _) = agent_address(&key(byte)).unwrap();
        assert_ne!(addr.as_bytes()[0], RESERVED_ADDRESS_PREFIX);
    }
}

#[test]
fn schemas_never_collide_on_shared_keys() {
    // Build one address per schema from overlapping key material; all
    // seven must be pairwise distinct.
    let owner = key(7);
    let other = key(8);
    let (agent, _) = agent_address(&owner).unwrap();
    let hash = ContentHash::compute(b"payload");

    let addresses = vec![
        agent,
        message_address(&agent, &other, &hash, MessageKind::Text).unwrap().0,
        channel_address(&owner, "general").unwrap().0,
        participant_address(&agent, &agent).unwrap().0,
        invitation_address(&agent, &other).unwrap().0,
        escrow_address(&agent, &owner).unwrap().0,
        channel_message_address(&agent, &agent, 0).unwrap().0,
    ];

    for (i, a) in addresses.iter().enumerate() {
        for (j, b) in addresses.iter().enumerate() {
            if i != j {
                assert_ne!(a, b, "schemas {} and {} collided", i, j);
            }
        }
    }
}

#[test]
fn message_kind_distinguishes_addresses() {
    let (agent, _) = agent_address(&key(2)).unwrap();
    let recipient = key(3);
    let hash = ContentHash::compute(b"same payload");

    let kinds = [
        MessageKind::Text,
        MessageKind::Data,
        MessageKind::Command,
        MessageKind::Response,
        MessageKind::Custom(0),
        MessageKind::Custom(7),
    ];
    let mut seen = std::collections::HashSet::new();
    for kind in kinds {
        let (addr, _) = message_address(&agent, &recipient, &hash, kind).unwrap();
        assert!(seen.insert(addr), "kind {:?} collided", kind);
    }
}

#[test]
fn channel_name_is_scoped_to_creator() {
    let (a, _) = channel_address(&key(10), "general").unwrap();
    let (b, _) = channel_address(&key(11), "general").unwrap();
    let (c, _) = channel_address(&key(10), "general2").unwrap();
    assert_ne!(a, b);
    assert_ne!(a, c);
}

#[test]
fn seed_order_matters() {
    let x = Address::new([20; 32]);
    let y = Address::new([21; 32]);
    let (ab, _) = participant_address(&x, &y).unwrap();
    let (ba, _) = participant_address(&y, &x).unwrap();
    assert_ne!(ab, ba);
}

#[test]
fn nonce_distinguishes_broadcasts() {
    let channel = Address::new([30; 32]);
    let sender = Address::new([31; 32]);
    let (first, _) = channel_message_address(&channel, &sender, 1).unwrap();
    let (second, _) = channel_message_address(&channel, &sender, 2).unwrap();
    assert_ne!(first, second);
}

#[test]
fn stored_bump_verifies_and_wrong_bump_fails() {
    let owner = key(40);
    let (addr, bump) = agent_address(&owner).unwrap();
    assert!(verify_derivation(
        &addr,
        AGENT_NAMESPACE,
        &[Seed::Key(&owner)],
        bump
    ));
    assert!(!verify_derivation(
        &addr,
        AGENT_NAMESPACE,
        &[Seed::Key(&owner)],
        bump.wrapping_sub(1)
    ));
}
