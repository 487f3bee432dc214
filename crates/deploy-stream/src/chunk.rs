//! Chunked serialization and processing (§4.5).
//!
//! A large value is serialized once, sliced into fixed-size byte chunks,
//! and fed sequentially to a caller-supplied processor. None of this
//! crate's functions touch a filesystem; the processor closure is where
//! bytes actually land on disk, supplied by `deploy-core`.

use std::time::Instant;

use bytes::Bytes;

use crate::error::StreamError;

/// Default threshold (bytes) above which a file is considered large.
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 10 * 1024 * 1024;

/// Default chunk size (bytes) used when none is specified.
pub const DEFAULT_CHUNK_SIZE: usize = 2 * 1024 * 1024;

/// Assumed sustained throughput used by [`estimate_time`], in bytes/ms.
/// Chosen as a conservative disk-write rate; this is an estimate, not a
/// measurement, and is never used to bound actual processing.
const ASSUMED_THROUGHPUT_BYTES_PER_MS: u64 = 50 * 1024;

/// Whether a file of `size_bytes` should be treated as large.
#[must_use]
pub const fn is_large_file(size_bytes: u64, threshold_bytes: u64) -> bool {
    size_bytes >= threshold_bytes
}

/// A value serialized once and sliced into fixed-size chunks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkedValue {
    chunks: Vec<Bytes>,
    total_len: usize,
}

impl ChunkedValue {
    /// The chunks, in order.
    #[must_use]
    pub fn chunks(&self) -> &[Bytes] {
        &self.chunks
    }

    /// Total serialized length across all chunks.
    #[must_use]
    pub const fn total_len(&self) -> usize {
        self.total_len
    }

    /// Concatenate every chunk back into one buffer.
    #[must_use]
    pub fn concat(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_len);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }
}

/// Slice `data` into fixed-size chunks (the last chunk may be shorter).
#[must_use]
pub fn create_chunked_stream(data: &[u8], chunk_size: usize) -> ChunkedValue {
    let chunk_size = chunk_size.max(1);
    let chunks = data.chunks(chunk_size).map(Bytes::copy_from_slice).collect();
    ChunkedValue { chunks, total_len: data.len() }
}

/// Progress reported after each chunk during [`stream_process`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressUpdate {
    /// Chunks processed so far (including the one just completed).
    pub current: usize,
    /// Total chunks in this stream.
    pub total: usize,
    /// `current / total` as a percentage.
    pub percentage: f64,
    /// Estimated remaining time, extrapolated from elapsed-time-per-chunk so far.
    pub estimated_remaining_millis: u64,
}

/// The outcome of a (possibly partial) [`stream_process`] run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamOutcome {
    /// Chunks successfully processed before completion or abort.
    pub chunks_processed: usize,
    /// Total chunks the stream was divided into.
    pub total_chunks: usize,
    /// Total bytes across all chunks.
    pub bytes_processed: usize,
}

/// Serialize `value`, slice it into chunks of `chunk_size` bytes, and invoke
/// `chunk_processor(chunk, index)` sequentially. `progress`, if given, is
/// called after every chunk. Aborts on the processor's first error,
/// returning the error with the partial outcome already recorded by the
/// caller via the progress callback — the streamer never swallows a
/// processor failure.
pub fn stream_process<P, G>(
    value: &serde_json::Value,
    chunk_size: usize,
    mut chunk_processor: P,
    mut progress: Option<G>,
) -> Result<StreamOutcome, StreamError>
where
    P: FnMut(&[u8], usize) -> Result<(), String>,
    G: FnMut(ProgressUpdate),
{
    let serialized = serde_json::to_vec(value)?;
    let chunked = create_chunked_stream(&serialized, chunk_size);
    let total = chunked.chunks().len().max(1);
    let start = Instant::now();

    for (index, chunk) in chunked.chunks().iter().enumerate() {
        if let Err(message) = chunk_processor(chunk, index) {
            return Err(StreamError::ProcessorFailed { chunk_index: index, total_chunks: total, message });
        }
        if let Some(report) = progress.as_mut() {
            let elapsed_millis = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            let current = index + 1;
            let per_chunk = elapsed_millis / current as u64;
            let remaining_chunks = (total - current) as u64;
            report(ProgressUpdate {
                current,
                total,
                percentage: (current as f64 / total as f64) * 100.0,
                estimated_remaining_millis: per_chunk.saturating_mul(remaining_chunks),
            });
        }
    }

    Ok(StreamOutcome {
        chunks_processed: chunked.chunks().len(),
        total_chunks: chunked.chunks().len(),
        bytes_processed: chunked.total_len(),
    })
}

/// Estimate processing time for `size_bytes`, assuming
/// [`ASSUMED_THROUGHPUT_BYTES_PER_MS`] sustained throughput.
#[must_use]
pub const fn estimate_time(size_bytes: u64) -> u64 {
    size_bytes / ASSUMED_THROUGHPUT_BYTES_PER_MS
}

/// Reconstruct `chunks` and check the result deserializes to a value equal
/// to `original` (§8 Invariant 10).
#[must_use]
pub fn validate_chunk_integrity(chunks: &[Bytes], original: &serde_json::Value) -> bool {
    let mut concatenated = Vec::new();
    for chunk in chunks {
        concatenated.extend_from_slice(chunk);
    }
    serde_json::from_slice::<serde_json::Value>(&concatenated).is_ok_and(|value| &value == original)
}
