mod codec;
mod compress;
mod crypto;
mod message;
mod transport;
mod wire;

pub use codec::{NodeCodec, ServerCodec};
pub use compress::{compress, decompress};
pub use crypto::{decrypt, encrypt, Encrypted, NONCE_LENGTH, TAG_LENGTH};
pub use message::{NodeMessage, ServerMessage};
pub use transport::Connection;
pub use wire::{wire_decode, wire_encode};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Decompression failed")]
    Decompression,

    #[error("Encryption failed")]
    Encryption,

    // Deliberately opaque: a tag mismatch and a wrong key must be
    // indistinguishable to the peer.
    #[error("Decryption failed")]
    Decryption,

    #[error("Size mismatch: need at least {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Malformed envelope")]
    MalformedEnvelope,

    #[error("Invalid message type: {0:#04x}")]
    InvalidMessageType(u8),

    #[error("Message too large: {0} bytes")]
    MessageTooLarge(usize),

    #[error("Connect error: {0}")]
    Connect(#[source] std::io::Error),

    #[error("Write error: {0}")]
    Write(#[source] std::io::Error),

    #[error("Read error: {0}")]
    Read(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Maximum frame size accepted by the transport: 16MB.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;
