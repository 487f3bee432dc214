//! Errors produced by the Large-File Streamer (§4.5).

/// An error from a chunk-processing callback, or the streamer itself.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The value could not be serialized before chunking.
    #[error("failed to serialize value for streaming: {0}")]
    Serialize(#[from] serde_json::Error),
    /// A chunk processor returned an error; the stream aborts immediately
    /// and never swallows this.
    #[error("chunk processor failed at chunk {chunk_index} of {total_chunks}: {message}")]
    ProcessorFailed {
        /// Index of the chunk that failed (0-based).
        chunk_index: usize,
        /// Total number of chunks the stream was divided into.
        total_chunks: usize,
        /// Message from the failing processor.
        message: String,
    },
}
