//! Account ledger with transactional, all-or-nothing instruction commits.
//!
//! The host chain executes each instruction as a serialized atomic state
//! transition. This module models that contract:
//! - Every account is a versioned record addressed by its derived address.
//! - An instruction opens a [`Transaction`], reads a consistent snapshot
//!   (staged writes shadow committed state), and stages its writes.
//! - `commit` applies every staged write and bumps each touched account's
//!   version; dropping the transaction applies nothing.
//!
//! Validation failures therefore never leave partial state: handlers
//! return an error before `commit` and the staged writes evaporate.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use agentmesh_protocol::accounts::{
    AccountData, AgentAccount, ChannelAccount, ChannelMessageAccount, EscrowAccount,
    InvitationAccount, MessageAccount, ParticipantAccount,
};
use agentmesh_protocol::{AccountKind, Address};

use crate::LedgerError;

/// A committed account: typed payload plus the bookkeeping the ledger
/// maintains on every commit.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountRecord {
    pub data: AccountData,
    /// Monotonic per-account version, bumped on every committed write.
    /// Substitutes for compare-and-commit under the host's serialization.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The account ledger. Single-writer: one transaction at a time, enforced
/// by the exclusive borrow.
#[derive(Debug, Default)]
pub struct Ledger {
    accounts: HashMap<Address, AccountRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a transaction executing at `now` (the host clock).
    pub fn transaction(&mut self, now: DateTime<Utc>) -> Transaction<'_> {
        Transaction {
            ledger: self,
            now,
            staged: BTreeMap::new(),
        }
    }

    /// Committed record for an address.
    pub fn record(&self, address: &Address) -> Option<&AccountRecord> {
        self.accounts.get(address)
    }

    /// Committed account data for an address.
    pub fn account(&self, address: &Address) -> Option<&AccountData> {
        self.accounts.get(address).map(|record| &record.data)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Iterate over all committed records. Full scans are an indexer
    /// concern in production; this exists for queries and tests.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &AccountRecord)> {
        self.accounts.iter()
    }
}

/// Staged view of the ledger for a single instruction.
///
/// Reads observe staged writes first, then committed state, so an
/// instruction always sees its own effects. Writes stay staged until
/// [`Transaction::commit`]; a dropped transaction mutates nothing.
pub struct Transaction<'a> {
    ledger: &'a mut Ledger,
    now: DateTime<Utc>,
    staged: BTreeMap<Address, AccountData>,
}

impl Transaction<'_> {
    /// The instant this instruction executes at.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Snapshot read: staged write if present, committed state otherwise.
    pub fn get(&self, address: &Address) -> Option<AccountData> {
        if let Some(staged) = self.staged.get(address) {
            return Some(staged.clone());
        }
        self.ledger.account(address).cloned()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.staged.contains_key(address) || self.ledger.contains(address)
    }

    /// Stage creation of a new account. Fails if the address already
    /// holds data, committed or staged.
    pub fn create(&mut self, address: Address, data: AccountData) -> Result<(), LedgerError> {
        if self.contains(&address) {
            return Err(LedgerError::AccountAlreadyExists(address));
        }
        self.staged.insert(address, data);
        Ok(())
    }

    /// Stage an update to an existing account (committed or created
    /// earlier in this same transaction).
    pub fn update(&mut self, address: Address, data: AccountData) -> Result<(), LedgerError> {
        if !self.contains(&address) {
            return Err(LedgerError::AccountNotFound(address));
        }
        self.staged.insert(address, data);
        Ok(())
    }

    /// Apply every staged write. Existing accounts get a version bump and
    /// a refreshed `updated_at`; new accounts start at version 1.
    pub fn commit(self) {
        let count = self.staged.len();
        for (address, data) in self.staged {
            match self.ledger.accounts.get_mut(&address) {
                Some(record) => {
                    record.data = data;
                    record.version += 1;
                    record.updated_at = self.now;
                }
                None => {
                    self.ledger.accounts.insert(
                        address,
                        AccountRecord {
                            data,
                            version: 1,
                            created_at: self.now,
                            updated_at: self.now,
                        },
                    );
                }
            }
        }
        tracing::debug!(accounts = count, "Transaction committed");
    }

    fn typed<T>(
        &self,
        address: &Address,
        expected: AccountKind,
        extract: impl FnOnce(&AccountData) -> Option<T>,
    ) -> Result<T, LedgerError> {
        let data = self
            .get(address)
            .ok_or(LedgerError::AccountNotFound(*address))?;
        extract(&data).ok_or(LedgerError::WrongAccountKind {
            address: *address,
            expected,
            found: data.kind(),
        })
    }

    pub fn agent(&self, address: &Address) -> Result<AgentAccount, LedgerError> {
        self.typed(address, AccountKind::Agent, |d| d.as_agent().cloned())
    }

    pub fn message(&self, address: &Address) -> Result<MessageAccount, LedgerError> {
        self.typed(address, AccountKind::Message, |d| d.as_message().cloned())
    }

    pub fn channel(&self, address: &Address) -> Result<ChannelAccount, LedgerError> {
        self.typed(address, AccountKind::Channel, |d| d.as_channel().cloned())
    }

    pub fn participant(&self, address: &Address) -> Result<ParticipantAccount, LedgerError> {
        self.typed(address, AccountKind::Participant, |d| {
            d.as_participant().cloned()
        })
    }

    pub fn invitation(&self, address: &Address) -> Result<InvitationAccount, LedgerError> {
        self.typed(address, AccountKind::Invitation, |d| {
            d.as_invitation().cloned()
        })
    }

    pub fn escrow(&self, address: &Address) -> Result<EscrowAccount, LedgerError> {
        self.typed(address, AccountKind::Escrow, |d| d.as_escrow().cloned())
    }

    pub fn channel_message(&self, address: &Address) -> Result<ChannelMessageAccount, LedgerError> {
        self.typed(address, AccountKind::ChannelMessage, |d| {
            d.as_channel_message().cloned()
        })
    }
}
