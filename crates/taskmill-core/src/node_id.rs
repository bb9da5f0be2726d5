use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed width of a node identity on the wire.
pub const NODE_ID_LENGTH: usize = 64;

/// Unique identity of a node process, generated once at startup.
///
/// 64 characters drawn from `0-9A-Za-z`. It is an identifier, not a
/// credential: the shared secret key is what authenticates messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Generate a fresh random identity using the thread-local RNG.
    pub fn generate() -> Self {
        let id: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(NODE_ID_LENGTH)
            .map(char::from)
            .collect();
        NodeId(id)
    }

    /// Reconstruct an identity from its wire representation.
    ///
    /// Fails on anything that is not exactly 64 bytes of valid UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != NODE_ID_LENGTH {
            return None;
        }
        let id = std::str::from_utf8(bytes).ok()?;
        Some(NodeId(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
