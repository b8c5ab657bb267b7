//! AgentMesh Ledger - account storage with atomic instruction transactions
//!
//! Models the host-ledger contract the protocol core relies on: uniquely
//! addressed account records, per-account version numbers, and a staging
//! transaction whose writes commit all-or-nothing. Also hosts the
//! content-addressed blob store collaborator (payload bytes live there,
//! only hashes live in account state).

pub mod blob_store;
pub mod ledger;

pub use blob_store::BlobStore;
pub use ledger::{AccountRecord, Ledger, Transaction};

use agentmesh_protocol::crypto::ContentHash;
use agentmesh_protocol::{AccountKind, Address};
use thiserror::Error;

/// Errors originating from the ledger layer.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Account not found: {0}")]
    AccountNotFound(Address),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(Address),

    #[error("Account {address} holds a {found} record, expected {expected}")]
    WrongAccountKind {
        address: Address,
        expected: AccountKind,
        found: AccountKind,
    },

    #[error("Blob not found: {0}")]
    BlobNotFound(ContentHash),

    #[error("Blob {0} failed hash verification")]
    BlobCorrupted(ContentHash),
}
