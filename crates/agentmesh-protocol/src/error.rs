use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Address derivation exhausted all bump values for namespace '{0}'")]
    DerivationExhausted(String),

    #[error("Seed too long: {len} bytes (max {max})")]
    SeedTooLong { len: usize, max: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}
