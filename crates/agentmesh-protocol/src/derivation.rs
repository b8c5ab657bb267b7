//! Deterministic account address derivation.
//!
//! Every account address is computed from a namespace tag and an ordered
//! list of typed seed parts:
//!
//! ```text
//! address = SHA-256(domain || namespace || seed_1 || .. || seed_n || bump)
//! ```
//!
//! Each seed part is encoded as a type tag, a little-endian u16 length, and
//! the raw bytes, so two different seed lists can never produce the same
//! hash input. The bump starts at 255 and decrements past any candidate
//! whose first byte falls in the runtime-reserved address space; the chosen
//! bump is stored in the account so verifiers can re-derive with a single
//! hash.
//!
//! Derivation substitutes for unique-key constraints: one logical entity,
//! one address, with no central uniqueness index.

use sha2::{Digest, Sha256};

use crate::accounts::MessageKind;
use crate::constants::{
    AGENT_NAMESPACE, CHANNEL_MESSAGE_NAMESPACE, CHANNEL_NAMESPACE, ESCROW_NAMESPACE,
    INVITATION_NAMESPACE, MAX_SEED_LEN, MESSAGE_NAMESPACE, PARTICIPANT_NAMESPACE,
    RESERVED_ADDRESS_PREFIX,
};
use crate::crypto::ContentHash;
use crate::identity::{Address, PublicKey};
use crate::ProtocolError;

/// Domain separator, versioned so a future scheme change cannot collide
/// with addresses derived under this one.
const DERIVATION_DOMAIN: &[u8] = b"amcp/address/v1";

/// A typed seed part. The type tag is hashed along with the bytes, so a
/// wallet key used as a `Key` seed can never collide with the same 32
/// bytes used as an `Addr` seed in another scheme.
#[derive(Debug, Clone, Copy)]
pub enum Seed<'a> {
    /// A wallet public key.
    Key(&'a PublicKey),
    /// A derived account address.
    Addr(&'a Address),
    /// A fixed-length content hash.
    Hash(&'a ContentHash),
    /// A UTF-8 string (channel names).
    Str(&'a str),
    /// A little-endian u64 (nonces).
    U64(u64),
    /// Small fixed-width discriminants (message kinds).
    Bytes2([u8; 2]),
}

impl Seed<'_> {
    fn tag(&self) -> u8 {
        match self {
            Seed::Key(_) => 0x01,
            Seed::Addr(_) => 0x02,
            Seed::Hash(_) => 0x03,
            Seed::Str(_) => 0x04,
            Seed::U64(_) => 0x05,
            Seed::Bytes2(_) => 0x06,
        }
    }

    fn bytes(&self) -> Vec<u8> {
        match self {
            Seed::Key(key) => key.as_bytes().to_vec(),
            Seed::Addr(addr) => addr.as_bytes().to_vec(),
            Seed::Hash(hash) => hash.as_bytes().to_vec(),
            Seed::Str(s) => s.as_bytes().to_vec(),
            Seed::U64(n) => n.to_le_bytes().to_vec(),
            Seed::Bytes2(b) => b.to_vec(),
        }
    }
}

fn candidate(namespace: &str, seeds: &[Seed<'_>], bump: u8) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(DERIVATION_DOMAIN);
    hasher.update((namespace.len() as u16).to_le_bytes());
    hasher.update(namespace.as_bytes());
    for seed in seeds {
        let bytes = seed.bytes();
        hasher.update([seed.tag()]);
        hasher.update((bytes.len() as u16).to_le_bytes());
        hasher.update(&bytes);
    }
    hasher.update([bump]);
    hasher.finalize().into()
}

/// Derive the unique address for `(namespace, seeds)`.
///
/// Deterministic: the same inputs always yield the same `(address, bump)`.
/// Returns `DerivationExhausted` if every bump value lands in the reserved
/// space (probability ~2^-2048, kept as an explicit error rather than a
/// panic).
pub fn derive_address(
    namespace: &str,
    seeds: &[Seed<'_>],
) -> Result<(Address, u8), ProtocolError> {
    for seed in seeds {
        let len = seed.bytes().len();
        if len > MAX_SEED_LEN {
            return Err(ProtocolError::SeedTooLong {
                len,
                max: MAX_SEED_LEN,
            });
        }
    }
    for bump in (0..=255u8).rev() {
        let hash = candidate(namespace, seeds, bump);
        if hash[0] != RESERVED_ADDRESS_PREFIX {
            return Ok((Address::new(hash), bump));
        }
    }
    Err(ProtocolError::DerivationExhausted(namespace.to_string()))
}

/// Re-derive with a known bump and compare against a claimed address.
///
/// Used by instruction handlers to reject address-substitution: a caller
/// must not be able to pass an unrelated account of the right type where a
/// derived one is expected.
pub fn verify_derivation(
    expected: &Address,
    namespace: &str,
    seeds: &[Seed<'_>],
    bump: u8,
) -> bool {
    candidate(namespace, seeds, bump) == expected.0
}

// -- Typed derivations, one per account schema --

/// Agent account: one per owner wallet key.
pub fn agent_address(owner: &PublicKey) -> Result<(Address, u8), ProtocolError> {
    derive_address(AGENT_NAMESPACE, &[Seed::Key(owner)])
}

/// Direct message account. The sender is identified by its *agent*
/// address, never the raw wallet key; every path that touches a message
/// account derives from the same tuple.
pub fn message_address(
    sender_agent: &Address,
    recipient: &PublicKey,
    payload_hash: &ContentHash,
    kind: MessageKind,
) -> Result<(Address, u8), ProtocolError> {
    derive_address(
        MESSAGE_NAMESPACE,
        &[
            Seed::Addr(sender_agent),
            Seed::Key(recipient),
            Seed::Hash(payload_hash),
            Seed::Bytes2(kind.seed_bytes()),
        ],
    )
}

/// Channel account: name is unique per creator.
pub fn channel_address(creator: &PublicKey, name: &str) -> Result<(Address, u8), ProtocolError> {
    derive_address(CHANNEL_NAMESPACE, &[Seed::Key(creator), Seed::Str(name)])
}

/// Participant account: at most one per (channel, agent) pair.
pub fn participant_address(
    channel: &Address,
    agent: &Address,
) -> Result<(Address, u8), ProtocolError> {
    derive_address(
        PARTICIPANT_NAMESPACE,
        &[Seed::Addr(channel), Seed::Addr(agent)],
    )
}

/// Invitation account: at most one outstanding per (channel, invitee).
pub fn invitation_address(
    channel: &Address,
    invitee: &PublicKey,
) -> Result<(Address, u8), ProtocolError> {
    derive_address(
        INVITATION_NAMESPACE,
        &[Seed::Addr(channel), Seed::Key(invitee)],
    )
}

/// Escrow account: one balance per (channel, depositor).
pub fn escrow_address(
    channel: &Address,
    depositor: &PublicKey,
) -> Result<(Address, u8), ProtocolError> {
    derive_address(ESCROW_NAMESPACE, &[Seed::Addr(channel), Seed::Key(depositor)])
}

/// Channel broadcast message account: the nonce keeps distinct broadcasts
/// from the same sender collision-free.
pub fn channel_message_address(
    channel: &Address,
    sender_agent: &Address,
    nonce: u64,
) -> Result<(Address, u8), ProtocolError> {
    derive_address(
        CHANNEL_MESSAGE_NAMESPACE,
        &[Seed::Addr(channel), Seed::Addr(sender_agent), Seed::U64(nonce)],
    )
}
