//! Stage 1 of the technosignature search pipeline: a streaming,
//! completeness-first filter over raw spectrogram archives.
//!
//! The scanner consumes chunks of a time × frequency power matrix and reduces
//! them to a short list of candidate [`shared::Hit`] regions. It is built to
//! stay throughput-bound at archive scale: one pass over the data, several
//! window widths computed simultaneously, memory bounded by
//! O(channels × max window width) regardless of observation length.
//!
//! False positives are expected and cheap — the downstream classifier sorts
//! them out. False negatives are not acceptable, so every tuning default
//! here errs toward detection.
//!
//! Data flows strictly forward:
//!
//! ```text
//! ChunkSource -> StatsEngine -> Detector -> HitAggregator -> HitWriter
//! ```
//!
//! See [`pipeline::scan_observation`] for the threaded per-observation scan
//! and [`run::run_jobs`] for fanning out across independent observations.

pub mod aggregator;
pub mod chunk;
pub mod config;
pub mod detector;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod run;
pub mod synth;

pub use aggregator::HitAggregator;
pub use chunk::{ChunkSource, MemoryChunkSource, SpectrogramChunk};
pub use config::{ScanConfig, WarmupPolicy};
pub use detector::{Detection, Detector};
pub use engine::{StatsEngine, WindowStats, NOISE_FLOOR};
pub use error::ScanError;
pub use pipeline::{scan_observation, CancelToken, ObservationPipeline, ScanSummary};
pub use run::{run_jobs, ObservationReport, ScanJob};
pub use synth::{SignalSpec, SynthSpectrogram};
