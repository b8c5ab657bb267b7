use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Ed25519 public key of a wallet. Wallet keys authorize state transitions
/// by signing instructions; they never own account storage directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self(key.to_bytes())
    }

    /// Reconstruct the dalek verifying key for signature checks.
    ///
    /// Fails if the bytes are not a valid curve point.
    pub fn verifying_key(&self) -> Result<VerifyingKey, ProtocolError> {
        VerifyingKey::from_bytes(&self.0)
            .map_err(|e| ProtocolError::InvalidPublicKey(e.to_string()))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_hex(s: &str) -> Result<Self, ProtocolError> {
        let bytes = hex::decode(s).map_err(|e| ProtocolError::InvalidPublicKey(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ProtocolError::InvalidPublicKey("expected 32 bytes".into()))?;
        Ok(Self(arr))
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::str::FromStr for PublicKey {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// Derived account address. Addresses are computed from a namespace and
/// seeds (see [`crate::derivation`]), never chosen freely, so uniqueness
/// holds without a central index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_hex(s: &str) -> Result<Self, ProtocolError> {
        let bytes = hex::decode(s).map_err(|e| ProtocolError::InvalidAddress(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ProtocolError::InvalidAddress("expected 32 bytes".into()))?;
        Ok(Self(arr))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::str::FromStr for Address {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
