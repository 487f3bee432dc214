//! Chunked large-file processing with memory-threshold GC hints (§4.5).
//!
//! This crate owns the Large-File Streamer: serializing a value once,
//! slicing it into fixed-size chunks, and feeding them sequentially to a
//! caller-supplied processor while sampling memory pressure between
//! chunks. It has no filesystem dependency of its own — `deploy-core`
//! supplies both the chunk processor (backed by `deploy-fs`) and the size
//! thresholds.

pub mod chunk;
pub mod error;
pub mod memory;

pub use chunk::{
    create_chunked_stream, estimate_time, is_large_file, stream_process, validate_chunk_integrity,
    ChunkedValue, ProgressUpdate, StreamOutcome, DEFAULT_CHUNK_SIZE, DEFAULT_LARGE_FILE_THRESHOLD,
};
pub use error::StreamError;
pub use memory::{optimize_memory, sample_rss, MemoryOptions, MemorySample};
