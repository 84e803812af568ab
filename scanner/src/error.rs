//! Error taxonomy for the scanner.
//!
//! Every error is scoped to a single observation; the multi-observation
//! runner never lets one malformed file abort unrelated work. Input
//! malformation and the pathological-noise diagnostic carry the coordinates
//! of the offending region so an operator can go look at the data.

use thiserror::Error;

/// Errors raised while scanning one observation.
#[derive(Error, Debug)]
pub enum ScanError {
    /// A chunk arrived with a different channel count than the observation
    /// declared. Fatal for the observation.
    #[error("chunk at time offset {time_offset}: expected {expected} channels, got {actual}")]
    ChannelMismatch {
        time_offset: usize,
        expected: usize,
        actual: usize,
    },

    /// Chunks must be contiguous in time with no gaps or overlap.
    #[error("non-contiguous chunk: expected time offset {expected}, got {actual}")]
    NonContiguousChunk { expected: usize, actual: usize },

    /// A chunk with zero time samples or zero channels.
    #[error("empty chunk at time offset {time_offset}")]
    EmptyChunk { time_offset: usize },

    /// The aggregator's open-extent ceiling was exceeded. This means the
    /// noise model is mis-tuned for the data in the reported region, not
    /// that the region is unusually rich in signals.
    #[error(
        "pathological noise: {open} open extents at t={time} across channels \
         {chan_lo}..={chan_hi} (ceiling {ceiling}); check window widths and threshold"
    )]
    PathologicalNoise {
        time: usize,
        chan_lo: usize,
        chan_hi: usize,
        open: usize,
        ceiling: usize,
    },

    /// Operator-triggered abort. No partial hits are flushed.
    #[error("scan cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failure reported by the chunk source (decode errors etc. are the
    /// source's responsibility; we only relay them).
    #[error("chunk source error: {0}")]
    Source(String),

    #[error("hit output error: {0}")]
    Write(#[from] shared::WriteError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
