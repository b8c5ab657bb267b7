//! AgentMesh Escrow - prepaid balances backing paid channel access
//!
//! One escrow account per (channel, depositor), addressed by
//! `derive("escrow", channel, depositor)`. Balances move only through
//! deposit, depositor-signed withdrawal, or the join-fee debit staged
//! inside a paid channel join — and every mutation is checked arithmetic.

use agentmesh_ledger::{Ledger, LedgerError, Transaction};
use agentmesh_protocol::accounts::{AccountData, EscrowAccount};
use agentmesh_protocol::derivation::{escrow_address, verify_derivation, Seed};
use agentmesh_protocol::{Address, PublicKey, ESCROW_NAMESPACE};
use thiserror::Error;

/// Errors originating from the escrow subsystem.
#[derive(Error, Debug)]
pub enum EscrowError {
    #[error("Channel not found: {0}")]
    ChannelNotFound(Address),

    #[error("Escrow not found: {0}")]
    EscrowNotFound(Address),

    #[error("Unauthorized: signer is not the depositor")]
    Unauthorized,

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Insufficient balance: {available} available, {required} required")]
    InsufficientBalance { available: u64, required: u64 },

    #[error("Arithmetic overflow on escrow balance")]
    ArithmeticOverflow,

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] agentmesh_protocol::ProtocolError),
}

/// Deposit into the signer's escrow for a channel, creating the account
/// on first use.
pub fn deposit(
    txn: &mut Transaction<'_>,
    signer: &PublicKey,
    channel: &Address,
    amount: u64,
) -> Result<Address, EscrowError> {
    if amount == 0 {
        return Err(EscrowError::InvalidAmount);
    }
    require_channel(txn, channel)?;

    let (address, bump) = escrow_address(channel, signer)?;

    if txn.contains(&address) {
        let mut account = txn.escrow(&address)?;
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or(EscrowError::ArithmeticOverflow)?;
        txn.update(address, AccountData::Escrow(account))?;
    } else {
        txn.create(
            address,
            AccountData::Escrow(EscrowAccount {
                channel: *channel,
                depositor: *signer,
                balance: amount,
                bump,
            }),
        )?;
    }

    tracing::info!(escrow = %address, amount, "Escrow deposit");
    Ok(address)
}

/// Withdraw from the signer's own escrow. Depositor-signed only.
pub fn withdraw(
    txn: &mut Transaction<'_>,
    signer: &PublicKey,
    channel: &Address,
    amount: u64,
) -> Result<(), EscrowError> {
    if amount == 0 {
        return Err(EscrowError::InvalidAmount);
    }

    let (address, _) = escrow_address(channel, signer)?;
    let mut account = match txn.escrow(&address) {
        Ok(account) => account,
        Err(LedgerError::AccountNotFound(a)) => return Err(EscrowError::EscrowNotFound(a)),
        Err(e) => return Err(e.into()),
    };

    if account.depositor != *signer
        || !verify_derivation(
            &address,
            ESCROW_NAMESPACE,
            &[Seed::Addr(channel), Seed::Key(signer)],
            account.bump,
        )
    {
        return Err(EscrowError::Unauthorized);
    }

    account.balance = account
        .balance
        .checked_sub(amount)
        .ok_or(EscrowError::InsufficientBalance {
            available: account.balance,
            required: amount,
        })?;
    txn.update(address, AccountData::Escrow(account))?;

    tracing::info!(escrow = %address, amount, "Escrow withdrawal");
    Ok(())
}

/// Debit the join fee from a depositor's escrow, staged inside the same
/// transaction as the join itself so fee deduction and access grant
/// commit or fail as one.
///
/// A missing escrow account reads as a zero balance.
pub fn debit_join_fee(
    txn: &mut Transaction<'_>,
    channel: &Address,
    depositor: &PublicKey,
    fee: u64,
) -> Result<(), EscrowError> {
    let (address, _) = escrow_address(channel, depositor)?;
    let mut account = match txn.escrow(&address) {
        Ok(account) => account,
        Err(LedgerError::AccountNotFound(_)) => {
            return Err(EscrowError::InsufficientBalance {
                available: 0,
                required: fee,
            })
        }
        Err(e) => return Err(e.into()),
    };

    account.balance = account
        .balance
        .checked_sub(fee)
        .ok_or(EscrowError::InsufficientBalance {
            available: account.balance,
            required: fee,
        })?;
    txn.update(address, AccountData::Escrow(account))?;

    tracing::debug!(escrow = %address, fee, "Join fee debited");
    Ok(())
}

/// Current balance for (channel, depositor); missing accounts read as
/// zero. Read-only.
pub fn balance(
    ledger: &Ledger,
    channel: &Address,
    depositor: &PublicKey,
) -> Result<u64, EscrowError> {
    let (address, _) = escrow_address(channel, depositor)?;
    Ok(ledger
        .account(&address)
        .and_then(|data| data.as_escrow())
        .map(|account| account.balance)
        .unwrap_or(0))
}

fn require_channel(txn: &Transaction<'_>, channel: &Address) -> Result<(), EscrowError> {
    match txn.channel(channel) {
        Ok(_) => Ok(()),
        Err(LedgerError::AccountNotFound(a)) => Err(EscrowError::ChannelNotFound(a)),
        Err(e) => Err(e.into()),
    }
}
