use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Secret key must be exactly 32 bytes long, got {0}")]
    InvalidKeyLength(usize),

    #[error("Missing required field: secret_key")]
    MissingSecretKey,

    #[error("Invalid server port: {0}")]
    InvalidPort(u16),

    #[error("Heartbeat timeout must be at least {min} seconds, got {actual}")]
    InvalidHeartbeat { min: u64, actual: u64 },

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
