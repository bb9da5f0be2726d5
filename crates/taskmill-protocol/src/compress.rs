use crate::{ProtocolError, Result};

/// Width of the uncompressed-length prefix.
const LENGTH_PREFIX: usize = 4;

/// Compress a payload with LZ4, prefixed with the big-endian 4-byte
/// length of the uncompressed input.
///
/// The prefix uses the same byte order as the transport framing, so
/// both ends of the stack agree on `0xDEADBEEF -> [DE, AD, BE, EF]`.
pub fn compress(plain: &[u8]) -> Vec<u8> {
    let compressed = lz4_flex::block::compress(plain);

    let mut out = Vec::with_capacity(LENGTH_PREFIX + compressed.len());
    out.extend_from_slice(&(plain.len() as u32).to_be_bytes());
    out.extend_from_slice(&compressed);
    out
}

/// Reverse of [`compress`]: read the expected output length, then
/// decompress the remainder to exactly that many bytes.
pub fn decompress(blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < LENGTH_PREFIX {
        return Err(ProtocolError::SizeMismatch {
            expected: LENGTH_PREFIX,
            actual: blob.len(),
        });
    }

    let mut prefix = [0u8; LENGTH_PREFIX];
    prefix.copy_from_slice(&blob[..LENGTH_PREFIX]);
    let original_size = u32::from_be_bytes(prefix) as usize;

    lz4_flex::block::decompress(&blob[LENGTH_PREFIX..], original_size)
        .map_err(|_| ProtocolError::Decompression)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_prefix_is_big_endian() {
        let n: u32 = 0xDEADBEEF;
        assert_eq!(n.to_be_bytes(), [0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(u32::from_be_bytes([0xDE, 0xAD, 0xBE, 0xEF]), 0xDEADBEEF);

        let n: u32 = 0xAABBCCDD;
        assert_eq!(n.to_be_bytes(), [0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(u32::from_be_bytes([0xAA, 0xBB, 0xCC, 0xDD]), 0xAABBCCDD);
    }

    #[test]
    fn test_roundtrip() {
        let msg = b"Hello world, this is a test for compressing a message. \
                    Add some more content: test, test, test, test, test, test, test, test.";

        let compressed = compress(msg);

        let mut prefix = [0u8; 4];
        prefix.copy_from_slice(&compressed[..4]);
        assert_eq!(u32::from_be_bytes(prefix) as usize, msg.len());
        // Repetitive input must actually shrink.
        assert!(compressed.len() < msg.len());

        let decompressed = decompress(&compressed).unwrap();
        assert_eq!(decompressed, msg);
    }

    #[test]
    fn test_empty_payload_roundtrip() {
        let compressed = compress(b"");
        let decompressed = decompress(&compressed).unwrap();
        assert!(decompressed.is_empty());
    }

    #[test]
    fn test_truncated_blob_fails() {
        let result = decompress(&[0x00, 0x01]);
        assert!(matches!(
            result,
            Err(ProtocolError::SizeMismatch { expected: 4, actual: 2 })
        ));
    }

    #[test]
    fn test_corrupted_blob_fails() {
        let mut compressed = compress(b"some payload that will be damaged in transit");
        let last = compressed.len() - 1;
        compressed.truncate(last);
        assert!(matches!(
            decompress(&compressed),
            Err(ProtocolError::Decompression)
        ));
    }

    #[test]
    fn test_wrong_length_prefix_fails() {
        let mut compressed = compress(b"payload");
        // Claim a different uncompressed size than the block holds.
        compressed[3] = compressed[3].wrapping_add(1);
        assert!(matches!(
            decompress(&compressed),
            Err(ProtocolError::Decompression)
        ));
    }
}
