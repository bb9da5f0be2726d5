use crate::compress::{compress, decompress};
use crate::crypto::{decrypt, encrypt, Encrypted, NONCE_LENGTH, TAG_LENGTH};
use crate::{ProtocolError, Result};
use taskmill_core::SecretKey;

/// Fixed header in front of the ciphertext: nonce then tag.
const WIRE_HEADER: usize = NONCE_LENGTH + TAG_LENGTH;

/// Compress, then encrypt, then lay out as
/// `[12-byte nonce][16-byte tag][ciphertext]`.
///
/// Compression comes first: ciphertext is high-entropy and would not
/// compress. The compression stage's own 4-byte length prefix ends up
/// inside the encrypted region.
pub fn wire_encode(plain: &[u8], key: &SecretKey) -> Result<Vec<u8>> {
    let compressed = compress(plain);
    let encrypted = encrypt(&compressed, key)?;

    let mut out = Vec::with_capacity(WIRE_HEADER + encrypted.ciphertext.len());
    out.extend_from_slice(&encrypted.nonce);
    out.extend_from_slice(&encrypted.tag);
    out.extend_from_slice(&encrypted.ciphertext);
    Ok(out)
}

/// Reverse of [`wire_encode`]. Any stage failure aborts the decode
/// with that stage's error; no partial plaintext is ever returned.
pub fn wire_decode(blob: &[u8], key: &SecretKey) -> Result<Vec<u8>> {
    if blob.len() < WIRE_HEADER {
        return Err(ProtocolError::SizeMismatch {
            expected: WIRE_HEADER,
            actual: blob.len(),
        });
    }

    let mut nonce = [0u8; NONCE_LENGTH];
    nonce.copy_from_slice(&blob[..NONCE_LENGTH]);
    let mut tag = [0u8; TAG_LENGTH];
    tag.copy_from_slice(&blob[NONCE_LENGTH..WIRE_HEADER]);

    let encrypted = Encrypted {
        nonce,
        tag,
        ciphertext: blob[WIRE_HEADER..].to_vec(),
    };

    let compressed = decrypt(&encrypted, key)?;
    decompress(&compressed)
}
