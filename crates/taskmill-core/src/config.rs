use crate::error::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Required length of the shared secret key in bytes.
pub const SECRET_KEY_LENGTH: usize = 32;

/// Minimum accepted heartbeat timeout in seconds.
const MIN_HEARTBEAT_TIMEOUT: u64 = 10;

/// The pre-distributed shared secret used for message authentication
/// and encryption. Length is validated once at load time, never per
/// message.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey([u8; SECRET_KEY_LENGTH]);

impl SecretKey {
    pub fn new(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() != SECRET_KEY_LENGTH {
            return Err(ConfigError::InvalidKeyLength(bytes.len()));
        }
        let mut key = [0u8; SECRET_KEY_LENGTH];
        key.copy_from_slice(bytes);
        Ok(SecretKey(key))
    }

    pub fn from_str_key(key: &str) -> Result<Self, ConfigError> {
        Self::new(key.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; SECRET_KEY_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    // Key material stays out of logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(..)")
    }
}

/// Shared configuration for both the server and the node side.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the node connects to.
    pub server_address: String,
    /// Port the server listens on and the node connects to.
    pub server_port: u16,
    /// Heartbeat interval and liveness timeout in seconds.
    pub heartbeat_timeout: u64,
    /// Node-side error budget before giving up.
    pub quit_counter: u32,
    /// Maximum number of outstanding connection handlers on the server.
    pub max_handlers: usize,
    /// Shared secret for the wire codec.
    pub secret_key: SecretKey,
}

/// Raw on-disk shape; validated into a `Config`.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    secret_key: Option<String>,
    server_address: Option<String>,
    server_port: Option<u16>,
    heartbeat_timeout: Option<u64>,
    quit_counter: Option<u32>,
    max_handlers: Option<usize>,
}

impl Config {
    /// Build a configuration with defaults from a secret key.
    pub fn new(secret_key: &str) -> Result<Self, ConfigError> {
        Ok(Config {
            server_address: "127.0.0.1".to_string(),
            server_port: 3100,
            heartbeat_timeout: 60 * 5,
            quit_counter: 5,
            max_handlers: 10,
            secret_key: SecretKey::from_str_key(secret_key)?,
        })
    }

    /// Parse a YAML configuration string.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let raw: ConfigFile = serde_yaml::from_str(contents)?;

        let secret_key = raw.secret_key.ok_or(ConfigError::MissingSecretKey)?;
        let mut config = Config::new(&secret_key)?;

        if let Some(address) = raw.server_address {
            config.server_address = address;
        }

        if let Some(port) = raw.server_port {
            if port == 0 {
                return Err(ConfigError::InvalidPort(port));
            }
            config.server_port = port;
        }

        if let Some(timeout) = raw.heartbeat_timeout {
            if timeout < MIN_HEARTBEAT_TIMEOUT {
                return Err(ConfigError::InvalidHeartbeat {
                    min: MIN_HEARTBEAT_TIMEOUT,
                    actual: timeout,
                });
            }
            config.heartbeat_timeout = timeout;
        }

        if let Some(counter) = raw.quit_counter {
            config.quit_counter = counter;
        }

        if let Some(max) = raw.max_handlers {
            config.max_handlers = max;
        }

        Ok(config)
    }

    /// Load a YAML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// "address:port" as used by the transport.
    pub fn server_endpoint(&self) -> String {
        format!("{}:{}", self.server_address, self.server_port)
    }
}
