//! Agent registry instructions.
//!
//! One agent account per owner wallet key, addressed by
//! `derive("agent", owner)`. Registration is open; updates require the
//! owner's signature *and* a re-derivation check, so a signer cannot pass
//! an unrelated agent account where their own is expected.

use agentmesh_ledger::{Ledger, Transaction};
use agentmesh_protocol::accounts::{AccountData, AgentAccount};
use agentmesh_protocol::derivation::{agent_address, verify_derivation, Seed};
use agentmesh_protocol::{Address, ProtocolConfig, PublicKey, AGENT_NAMESPACE};

use crate::DirectoryError;

/// Register the signer as an agent. Fails if the signer already has one.
pub fn register_agent(
    txn: &mut Transaction<'_>,
    config: &ProtocolConfig,
    signer: &PublicKey,
    capabilities: u64,
    metadata_uri: String,
) -> Result<Address, DirectoryError> {
    check_metadata(config, &metadata_uri)?;

    let (address, bump) = agent_address(signer)?;
    if txn.contains(&address) {
        return Err(DirectoryError::AgentAlreadyRegistered(address));
    }

    txn.create(
        address,
        AccountData::Agent(AgentAccount {
            owner: *signer,
            capabilities,
            metadata_uri,
            reputation: 0,
            invites_sent: 0,
            last_invite_at: None,
            bump,
        }),
    )?;

    tracing::info!(agent = %address, owner = %signer, "Agent registered");
    Ok(address)
}

/// Update the signer's own agent account. Only the provided fields
/// change; omitted fields keep their prior values.
pub fn update_agent(
    txn: &mut Transaction<'_>,
    config: &ProtocolConfig,
    signer: &PublicKey,
    agent: &Address,
    new_capabilities: Option<u64>,
    new_metadata_uri: Option<String>,
) -> Result<(), DirectoryError> {
    let mut account = txn.agent(agent)?;

    if account.owner != *signer {
        return Err(DirectoryError::Unauthorized);
    }
    // The stored owner must also re-derive to this exact address;
    // otherwise the caller substituted a different agent account whose
    // owner field happens to match.
    if !verify_derivation(agent, AGENT_NAMESPACE, &[Seed::Key(signer)], account.bump) {
        return Err(DirectoryError::Unauthorized);
    }

    if let Some(uri) = &new_metadata_uri {
        check_metadata(config, uri)?;
    }

    if let Some(capabilities) = new_capabilities {
        account.capabilities = capabilities;
    }
    if let Some(uri) = new_metadata_uri {
        account.metadata_uri = uri;
    }

    txn.update(*agent, AccountData::Agent(account))?;

    tracing::debug!(agent = %agent, "Agent updated");
    Ok(())
}

/// Look up an agent by its owner key. Read-only.
pub fn get_agent(ledger: &Ledger, owner: &PublicKey) -> Result<AgentAccount, DirectoryError> {
    let (address, _) = agent_address(owner)?;
    ledger
        .account(&address)
        .and_then(|data| data.as_agent())
        .cloned()
        .ok_or(DirectoryError::AgentNotFound(address))
}

fn check_metadata(config: &ProtocolConfig, uri: &str) -> Result<(), DirectoryError> {
    let max = config.limits.max_metadata_uri_len;
    if uri.len() > max {
        return Err(DirectoryError::InvalidMetadata {
            len: uri.len(),
            max,
        });
    }
    Ok(())
}
