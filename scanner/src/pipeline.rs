//! Per-observation scan drivers.
//!
//! [`ObservationPipeline`] runs the whole stage chain synchronously and is
//! what the unit and equivalence tests exercise. [`scan_observation`] runs
//! the same stages across three threads with bounded queues between them,
//! so decode, statistics and aggregation overlap; both paths produce
//! identical hits for identical input.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::bounded;
use shared::{Hit, HitWriter};

use crate::aggregator::HitAggregator;
use crate::chunk::{ChunkSource, SpectrogramChunk};
use crate::config::ScanConfig;
use crate::detector::{Detection, Detector};
use crate::engine::{StatsEngine, WindowStats};
use crate::error::ScanError;

/// Chunks buffered between pipeline stages. Small, to bound memory;
/// backpressure is the point.
const QUEUE_DEPTH: usize = 2;

/// Cooperative cancellation flag, checked between chunks. A cancelled scan
/// produces no output for its observation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counters reported after a completed scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub observation: String,
    pub num_samples: u64,
    pub num_detections: u64,
    pub num_hits: usize,
}

/// Chunk validation plus the statistics/detection stages, one row at a
/// time. Shared by the synchronous and threaded drivers.
struct ChunkScanner {
    num_channels: usize,
    num_widths: usize,
    engine: StatsEngine,
    detector: Detector,
    /// Expected time offset of the next chunk; the first chunk may start
    /// anywhere.
    next_time: Option<usize>,
    row_buf: Vec<f64>,
    stats_buf: Vec<WindowStats>,
    censor_buf: Vec<bool>,
    num_samples: u64,
    num_detections: u64,
}

impl ChunkScanner {
    fn new(num_channels: usize, config: &ScanConfig) -> Result<Self, ScanError> {
        let engine = StatsEngine::new(num_channels, config)?;
        let num_widths = engine.num_widths();
        Ok(Self {
            num_channels,
            num_widths,
            detector: Detector::new(config),
            next_time: None,
            row_buf: vec![0.0; num_channels],
            stats_buf: vec![WindowStats::default(); num_channels * num_widths],
            censor_buf: vec![false; num_channels],
            num_samples: 0,
            num_detections: 0,
            engine,
        })
    }

    fn validate(&mut self, chunk: &SpectrogramChunk) -> Result<(), ScanError> {
        if chunk.num_samples() == 0 || chunk.num_channels() == 0 {
            return Err(ScanError::EmptyChunk {
                time_offset: chunk.time_offset,
            });
        }
        if chunk.num_channels() != self.num_channels {
            return Err(ScanError::ChannelMismatch {
                time_offset: chunk.time_offset,
                expected: self.num_channels,
                actual: chunk.num_channels(),
            });
        }
        if let Some(expected) = self.next_time {
            if chunk.time_offset != expected {
                return Err(ScanError::NonContiguousChunk {
                    expected,
                    actual: chunk.time_offset,
                });
            }
        }
        self.next_time = Some(chunk.time_end());
        Ok(())
    }

    /// Run statistics and thresholding over one chunk, returning its
    /// detections in nondecreasing time order.
    fn process_chunk(&mut self, chunk: &SpectrogramChunk) -> Result<Vec<Detection>, ScanError> {
        self.validate(chunk)?;
        let mut detections = Vec::new();
        for (t_rel, row) in chunk.power.rows().into_iter().enumerate() {
            let time = chunk.time_offset + t_rel;
            for (dst, src) in self.row_buf.iter_mut().zip(row.iter()) {
                *dst = *src;
            }
            self.engine.stats_row(&mut self.stats_buf);
            self.detector.scan_row(
                time,
                &self.row_buf,
                &self.stats_buf,
                self.num_widths,
                &mut detections,
                &mut self.censor_buf,
            );
            self.engine.advance_row(&self.row_buf, &self.censor_buf);
        }
        self.num_samples += chunk.num_samples() as u64;
        self.num_detections += detections.len() as u64;
        Ok(detections)
    }
}

/// Synchronous scan of one observation: feed chunks, collect hits.
pub struct ObservationPipeline {
    observation: String,
    scanner: ChunkScanner,
    aggregator: HitAggregator,
}

impl ObservationPipeline {
    pub fn new(
        observation: impl Into<String>,
        num_channels: usize,
        config: &ScanConfig,
    ) -> Result<Self, ScanError> {
        Ok(Self {
            observation: observation.into(),
            scanner: ChunkScanner::new(num_channels, config)?,
            aggregator: HitAggregator::new(config),
        })
    }

    pub fn observation(&self) -> &str {
        &self.observation
    }

    pub fn num_samples(&self) -> u64 {
        self.scanner.num_samples
    }

    pub fn num_detections(&self) -> u64 {
        self.scanner.num_detections
    }

    /// Process one chunk and return the hits that closed during it, in
    /// emission order.
    pub fn process_chunk(&mut self, chunk: &SpectrogramChunk) -> Result<Vec<Hit>, ScanError> {
        let detections = self.scanner.process_chunk(chunk)?;
        for det in &detections {
            self.aggregator.observe(det)?;
        }
        self.aggregator.advance_to(chunk.time_end() - 1);
        Ok(self.aggregator.drain_closed())
    }

    /// Close all remaining extents at end of observation.
    pub fn finish(mut self) -> Vec<Hit> {
        self.aggregator.finish()
    }
}

/// Scan one observation with the stages spread over three threads:
/// source pull, statistics + thresholding, aggregation + writing. Bounded
/// queues keep at most a few chunks in flight.
///
/// On any error (including cancellation) the writer is never finished, so
/// no partial output is committed.
pub fn scan_observation<S>(
    mut source: S,
    config: &ScanConfig,
    writer: &mut dyn HitWriter,
    cancel: &CancelToken,
) -> Result<ScanSummary, ScanError>
where
    S: ChunkSource + Send,
{
    let observation = source.observation().to_string();
    let num_channels = source.num_channels();
    let mut scanner = ChunkScanner::new(num_channels, config)?;
    let mut aggregator = HitAggregator::new(config);
    let cancel = cancel.clone();

    let (summary_samples, summary_detections) = thread::scope(
        |s| -> Result<(u64, u64), ScanError> {
            let (chunk_tx, chunk_rx) = bounded::<SpectrogramChunk>(QUEUE_DEPTH);
            // Detections per chunk, with the chunk's last time sample so
            // the aggregator can close idle extents on quiet chunks.
            let (det_tx, det_rx) = bounded::<(Vec<Detection>, usize)>(QUEUE_DEPTH);

            let producer = s.spawn(move || -> Result<(), ScanError> {
                loop {
                    if cancel.is_cancelled() {
                        return Err(ScanError::Cancelled);
                    }
                    match source.next_chunk()? {
                        Some(chunk) => {
                            // Send fails only when the scan stage died;
                            // its error is the one worth reporting.
                            if chunk_tx.send(chunk).is_err() {
                                return Ok(());
                            }
                        }
                        None => return Ok(()),
                    }
                }
            });

            let scan_stage = s.spawn(move || -> Result<(u64, u64), ScanError> {
                for chunk in chunk_rx {
                    let detections = scanner.process_chunk(&chunk)?;
                    let last_time = chunk.time_end() - 1;
                    if det_tx.send((detections, last_time)).is_err() {
                        break;
                    }
                }
                Ok((scanner.num_samples, scanner.num_detections))
            });

            let aggregate_result = (|| -> Result<(), ScanError> {
                for (detections, last_time) in &det_rx {
                    for det in &detections {
                        aggregator.observe(det)?;
                    }
                    aggregator.advance_to(last_time);
                    for hit in aggregator.drain_closed() {
                        writer.push(hit)?;
                    }
                }
                Ok(())
            })();
            // Unblock upstream stages before joining.
            drop(det_rx);

            let producer_result = producer
                .join()
                .map_err(|_| ScanError::Source("chunk producer panicked".into()))?;
            let scan_result = scan_stage
                .join()
                .map_err(|_| ScanError::Source("scan stage panicked".into()))?;

            producer_result?;
            let counters = scan_result?;
            aggregate_result?;
            Ok(counters)
        },
    )?;

    for hit in aggregator.finish() {
        writer.push(hit)?;
    }
    writer.finish()?;

    Ok(ScanSummary {
        observation,
        num_samples: summary_samples,
        num_detections: summary_detections,
        num_hits: writer.num_hits(),
    })
}
