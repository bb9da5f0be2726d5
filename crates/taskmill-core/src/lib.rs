mod config;
mod error;
mod node_id;

pub use config::{Config, SecretKey, SECRET_KEY_LENGTH};
pub use error::{ConfigError, Result};
pub use node_id::{NodeId, NODE_ID_LENGTH};
