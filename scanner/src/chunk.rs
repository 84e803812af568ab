//! Spectrogram chunks and the pull interface that supplies them.
//!
//! File-format decoding lives outside the core; a [`ChunkSource`] hands us
//! dense power matrices one chunk at a time. Chunk boundaries fall on time
//! samples, never inside a frequency row, and successive chunks must be
//! contiguous in time. The pipeline validates both properties.

use ndarray::{s, Array2};

use crate::error::ScanError;

/// A dense block of power values covering all channels over a contiguous
/// range of time samples. Rows are time samples, columns are frequency
/// channels; channel indexing is identical across all chunks of one
/// observation.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrogramChunk {
    /// Time-sample index of the chunk's first row within the observation.
    pub time_offset: usize,
    /// Power matrix, shape (time samples, channels).
    pub power: Array2<f64>,
}

impl SpectrogramChunk {
    pub fn new(time_offset: usize, power: Array2<f64>) -> Self {
        Self { time_offset, power }
    }

    pub fn num_samples(&self) -> usize {
        self.power.nrows()
    }

    pub fn num_channels(&self) -> usize {
        self.power.ncols()
    }

    /// Time-sample index one past the chunk's last row.
    pub fn time_end(&self) -> usize {
        self.time_offset + self.num_samples()
    }
}

/// Pull interface for one observation's chunk stream.
///
/// Implementations own file handles and decode state; the core only needs
/// the observation identity, a stable channel count, and gap-free chunks.
pub trait ChunkSource {
    /// Identifier of the observation, e.g. the source filename.
    fn observation(&self) -> &str;

    /// Channel count, stable across every chunk.
    fn num_channels(&self) -> usize;

    /// Next chunk in time order, or `None` at end of observation.
    fn next_chunk(&mut self) -> Result<Option<SpectrogramChunk>, ScanError>;
}

impl<T: ChunkSource + ?Sized> ChunkSource for Box<T> {
    fn observation(&self) -> &str {
        (**self).observation()
    }

    fn num_channels(&self) -> usize {
        (**self).num_channels()
    }

    fn next_chunk(&mut self) -> Result<Option<SpectrogramChunk>, ScanError> {
        (**self).next_chunk()
    }
}

/// A chunk source backed by an in-memory array, split into fixed-size
/// chunks. Used by tests and synthetic runs.
pub struct MemoryChunkSource {
    observation: String,
    data: Array2<f64>,
    chunk_len: usize,
    cursor: usize,
}

impl MemoryChunkSource {
    /// Split `data` (time × channel) into chunks of `chunk_len` time
    /// samples; the final chunk may be shorter.
    pub fn new(observation: impl Into<String>, data: Array2<f64>, chunk_len: usize) -> Self {
        assert!(chunk_len > 0, "chunk_len must be positive");
        Self {
            observation: observation.into(),
            data,
            chunk_len,
            cursor: 0,
        }
    }

    pub fn num_samples(&self) -> usize {
        self.data.nrows()
    }
}

impl ChunkSource for MemoryChunkSource {
    fn observation(&self) -> &str {
        &self.observation
    }

    fn num_channels(&self) -> usize {
        self.data.ncols()
    }

    fn next_chunk(&mut self) -> Result<Option<SpectrogramChunk>, ScanError> {
        if self.cursor >= self.data.nrows() {
            return Ok(None);
        }
        let end = (self.cursor + self.chunk_len).min(self.data.nrows());
        let power = self.data.slice(s![self.cursor..end, ..]).to_owned();
        let chunk = SpectrogramChunk::new(self.cursor, power);
        self.cursor = end;
        Ok(Some(chunk))
    }
}
