//! Content-addressed blob store collaborator.
//!
//! Account state carries only content hashes; the bytes behind them live
//! here (standing in for an external store such as IPFS). The contract:
//! given a hash, the store supplies bytes whose hash matches — content is
//! re-verified on every read, so the core never trusts stored bytes.

use std::collections::HashMap;

use agentmesh_protocol::crypto::ContentHash;

use crate::LedgerError;

/// Content-addressed storage for message payloads and metadata bodies.
///
/// Identical content maps to one entry (deduplication); any bit flip
/// changes the hash and is caught on read.
#[derive(Debug, Default)]
pub struct BlobStore {
    blobs: HashMap<ContentHash, Vec<u8>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store content and return its hash. Storing the same bytes twice is
    /// a no-op.
    pub fn store(&mut self, content: &[u8]) -> ContentHash {
        let hash = ContentHash::compute(content);
        self.blobs
            .entry(hash)
            .or_insert_with(|| content.to_vec());
        hash
    }

    /// Retrieve content by hash, verifying it on the way out.
    pub fn get(&self, hash: &ContentHash) -> Result<Vec<u8>, LedgerError> {
        let content = self
            .blobs
            .get(hash)
            .ok_or(LedgerError::BlobNotFound(*hash))?;
        if !hash.matches(content) {
            tracing::warn!(%hash, "Blob failed hash verification");
            return Err(LedgerError::BlobCorrupted(*hash));
        }
        Ok(content.clone())
    }

    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.blobs.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn corrupt_for_test(&mut self, hash: &ContentHash, bytes: Vec<u8>) {
        self.blobs.insert(*hash, bytes);
    }
}
