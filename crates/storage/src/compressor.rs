//! Pluggable compressor implementations (`SPEC_FULL.md` §4.3).
//!
//! [`ZstdCompressor`] is the default a cold processor is constructed with;
//! [`NoopCompressor`] exists for tests and for deployments that want the
//! cold-tier batching/retention machinery without paying a compression cost.

use tierdb_core::error::{Error, Result};
use tierdb_core::traits::Compressor;
use tracing::warn;

/// zstd-backed compressor. `level` is mapped onto zstd's own `1..=22` range
/// by multiplying by 4, so the spec's `1..=5` levels span zstd's low and mid
/// compression settings.
#[derive(Debug, Default)]
pub struct ZstdCompressor;

impl Compressor for ZstdCompressor {
    fn compress(&self, level: u8, data: &[u8]) -> Result<Vec<u8>> {
        let zstd_level = (level.clamp(1, 5) as i32) * 4;
        zstd::encode_all(data, zstd_level).map_err(|e| {
            warn!(error = %e, input_len = data.len(), "zstd compression failed");
            Error::Validation(format!("zstd compress failed: {e}"))
        })
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        zstd::decode_all(data).map_err(|e| {
            warn!(error = %e, input_len = data.len(), "zstd decompression failed");
            Error::Validation(format!("zstd decompress failed: {e}"))
        })
    }
}

/// Identity compressor: returns its input unchanged. Used in tests and by
/// callers that disable `compression_enabled`.
#[derive(Debug, Default)]
pub struct NoopCompressor;

impl Compressor for NoopCompressor {
    fn compress(&self, _level: u8, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}

/// `compressed_size / original_size`, for the ratio a cold processor reports
/// per archived batch. `0.0` original size returns `1.0` (no-op ratio) to
/// avoid a division by zero.
pub fn compression_ratio(original_size: usize, compressed_size: usize) -> f64 {
    if original_size == 0 {
        return 1.0;
    }
    compressed_size as f64 / original_size as f64
}
