// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Pluggable metadata compression.
//!
//! Schema blobs are compressed opportunistically: the encoder keeps the
//! compressed form only when it is strictly smaller, and a header flag
//! records which form went on the wire. The decoder branches on that flag
//! before any other parsing.

use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::{MetaError, Result};

/// Compressor applied to encoded schema payloads.
///
/// Implementations must be pure byte transforms:
/// `decompress(compress(x)) == x`.
pub trait MetaCompressor: Send + Sync {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Inflate `data`, failing if the output would exceed `max_size`.
    ///
    /// The bound guards against decompression bombs; callers pass their
    /// configured maximum metadata size.
    fn decompress(&self, data: &[u8], max_size: usize) -> Result<Vec<u8>>;
}

/// Reference Deflate implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeflateCompressor;

impl MetaCompressor for DeflateCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(data)
            .map_err(|e| MetaError::CompressionFailed {
                reason: e.to_string(),
            })?;
        let compressed = encoder.finish().map_err(|e| MetaError::CompressionFailed {
            reason: e.to_string(),
        })?;
        log::debug!(
            "[TYPEDEF] compressed metadata: {} bytes -> {} bytes",
            data.len(),
            compressed.len()
        );
        Ok(compressed)
    }

    fn decompress(&self, data: &[u8], max_size: usize) -> Result<Vec<u8>> {
        let mut decompressed = Vec::new();
        let mut decoder = DeflateDecoder::new(data).take(max_size as u64 + 1);
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| MetaError::CompressionFailed {
                reason: e.to_string(),
            })?;
        if decompressed.len() > max_size {
            return Err(MetaError::MetaSizeExceeded {
                size: decompressed.len(),
                max: max_size,
            });
        }
        Ok(decompressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_decompress_roundtrip() {
        // Repetitive data where compression is guaranteed to help.
        let pattern = b"field_name ";
        let original: Vec<u8> = pattern.iter().cycle().take(550).copied().collect();
        let c = DeflateCompressor;

        let compressed = c.compress(&original).unwrap();
        assert!(compressed.len() < original.len());

        let decompressed = c.decompress(&compressed, 1 << 20).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_incompressible_data_roundtrips() {
        let original: Vec<u8> = (0..=255u8).collect();
        let c = DeflateCompressor;
        let compressed = c.compress(&original).unwrap();
        let decompressed = c.decompress(&compressed, 1 << 20).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_decompress_invalid_data() {
        let c = DeflateCompressor;
        let result = c.decompress(b"\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF", 1 << 20);
        assert!(result.is_err());
    }

    #[test]
    fn test_decompress_respects_bound() {
        let original = vec![0u8; 4096];
        let c = DeflateCompressor;
        let compressed = c.compress(&original).unwrap();
        assert!(matches!(
            c.decompress(&compressed, 128),
            Err(MetaError::MetaSizeExceeded { .. })
        ));
    }
}
