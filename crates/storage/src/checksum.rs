//! Fast non-cryptographic checksum for archived batches, so a cold
//! processor can detect a corrupted or truncated batch on load without
//! decompressing it first.

use xxhash_rust::xxh3::xxh3_64;

/// 64-bit xxh3 checksum of `data`.
pub fn checksum(data: &[u8]) -> u64 {
    xxh3_64(data)
}

/// Whether `data` matches a previously computed `expected` checksum.
pub fn verify(data: &[u8], expected: u64) -> bool {
    checksum(data) == expected
}
