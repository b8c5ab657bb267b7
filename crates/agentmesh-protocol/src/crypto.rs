use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::identity::{Address, PublicKey};
use crate::ProtocolError;

/// Generate a new Ed25519 keypair.
pub fn generate_keypair() -> SigningKey {
    let mut rng = rand::thread_rng();
    SigningKey::generate(&mut rng)
}

/// Sign an instruction payload with the signing key.
pub fn sign_payload(signing_key: &SigningKey, payload: &[u8]) -> Signature {
    signing_key.sign(payload)
}

/// Verify a payload signature against a wallet public key.
pub fn verify_signature(
    public_key: &PublicKey,
    payload: &[u8],
    signature: &Signature,
) -> Result<(), ProtocolError> {
    let verifying_key = public_key.verifying_key()?;
    verifying_key
        .verify(payload, signature)
        .map_err(|e| ProtocolError::InvalidSignature(e.to_string()))
}

/// Compute SHA-256 hash of data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let hash = Sha256::digest(data);
    let mut result = [0u8; 32];
    result.copy_from_slice(&hash);
    result
}

/// SHA-256 digest identifying message or metadata content held in the
/// external blob store. Only the hash lives in account state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash content bytes into their identifier.
    pub fn compute(content: &[u8]) -> Self {
        Self(sha256(content))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check that `content` actually hashes to this identifier.
    pub fn matches(&self, content: &[u8]) -> bool {
        constant_time_eq(&self.0, &sha256(content))
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Compute the commitment binding an invitation to its channel, invitee,
/// nonce, and issuance time. A join attempt must reproduce this hash
/// exactly from the stored invitation fields.
pub fn invitation_commitment(
    channel: &Address,
    invitee: &PublicKey,
    nonce: u64,
    issued_at: DateTime<Utc>,
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"amcp/invitation/v1");
    hasher.update(channel.as_bytes());
    hasher.update(invitee.as_bytes());
    hasher.update(nonce.to_le_bytes());
    hasher.update(issued_at.timestamp().to_le_bytes());
    hasher.finalize().into()
}

/// Constant-time equality over fixed-length digests.
///
/// Comparison cost does not depend on where the inputs differ, so
/// commitment checks leak no timing information.
pub fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
