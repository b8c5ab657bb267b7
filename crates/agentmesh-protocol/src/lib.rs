//! AMCP - Core account types, address derivation, and crypto
//!
//! Implements the foundation of the Agent Mesh Communication Protocol (AMCP):
//! deterministic account address derivation, Ed25519 identity keys, the
//! account record schema shared by every subsystem, and protocol-wide
//! configuration.

pub mod accounts;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod derivation;
pub mod error;
pub mod identity;

pub use accounts::*;
pub use config::*;
pub use constants::*;
pub use derivation::*;
pub use error::*;
pub use identity::*;
