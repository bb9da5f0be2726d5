use crate::{ProtocolError, Result};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use taskmill_core::SecretKey;

/// ChaCha20-Poly1305 nonce width.
pub const NONCE_LENGTH: usize = 12;
/// Poly1305 authentication tag width.
pub const TAG_LENGTH: usize = 16;

/// Output of the encryption stage: nonce, tag and ciphertext kept as
/// separate fields so the wire layout stays explicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encrypted {
    pub nonce: [u8; NONCE_LENGTH],
    pub tag: [u8; TAG_LENGTH],
    pub ciphertext: Vec<u8>,
}

/// Encrypt a payload with ChaCha20-Poly1305 under a fresh random nonce.
///
/// The nonce must never repeat under the same key; `OsRng` gives a
/// fresh 96-bit value per call.
pub fn encrypt(plain: &[u8], key: &SecretKey) -> Result<Encrypted> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    let mut nonce = [0u8; NONCE_LENGTH];
    OsRng.fill_bytes(&mut nonce);

    // The aead crate appends the 16-byte tag to the ciphertext.
    let mut sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), plain)
        .map_err(|_| ProtocolError::Encryption)?;

    let boundary = sealed.len() - TAG_LENGTH;
    let mut tag = [0u8; TAG_LENGTH];
    tag.copy_from_slice(&sealed[boundary..]);
    sealed.truncate(boundary);

    Ok(Encrypted {
        nonce,
        tag,
        ciphertext: sealed,
    })
}

/// Decrypt and authenticate. Any failure, tag mismatch and wrong key
/// included, is the single opaque [`ProtocolError::Decryption`].
pub fn decrypt(message: &Encrypted, key: &SecretKey) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    let mut sealed = Vec::with_capacity(message.ciphertext.len() + TAG_LENGTH);
    sealed.extend_from_slice(&message.ciphertext);
    sealed.extend_from_slice(&message.tag);

    cipher
        .decrypt(Nonce::from_slice(&message.nonce), sealed.as_ref())
        .map_err(|_| ProtocolError::Decryption)
}
