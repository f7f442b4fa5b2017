//! Storage-layer building blocks shared by hot and cold processors: secondary
//! indices, the retention queue, the cold-tier batch buffer, the archive
//! index, and the pluggable compressor implementations.

pub mod archive;
pub mod batch;
pub mod checksum;
pub mod compressor;
pub mod index;
pub mod retention;

pub use archive::ArchiveIndex;
pub use batch::{BatchBuffer, DEFAULT_BATCH_SIZE};
pub use checksum::{checksum, verify};
pub use compressor::{compression_ratio, NoopCompressor, ZstdCompressor};
pub use index::IndexSet;
pub use retention::RetentionQueue;
