//! Fan-out over independent observations.
//!
//! Observations share nothing, so the runner is a plain job queue feeding a
//! fixed pool of workers, each running the full per-observation pipeline.
//! One malformed observation fails alone; every other job still completes
//! and writes its output.

use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::unbounded;
use shared::JsonHitWriter;

use crate::chunk::ChunkSource;
use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::pipeline::{scan_observation, CancelToken, ScanSummary};

/// One observation to scan.
pub struct ScanJob {
    pub source: Box<dyn ChunkSource + Send>,
}

impl ScanJob {
    pub fn new(source: impl ChunkSource + Send + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }
}

/// Outcome of one observation's scan.
#[derive(Debug)]
pub struct ObservationReport {
    pub observation: String,
    pub output: PathBuf,
    pub outcome: Result<ScanSummary, ScanError>,
}

fn output_path(out_dir: &Path, observation: &str) -> PathBuf {
    // Observation names are often file paths; flatten them for output.
    let flat: String = observation
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    out_dir.join(format!("{flat}.hits.json"))
}

/// Scan every job on `workers` threads, writing one hit list per
/// observation under `out_dir`. Returns a report per job, sorted by
/// observation name. Cancellation stops all workers at their next chunk
/// boundary; cancelled observations leave no output file.
pub fn run_jobs(
    jobs: Vec<ScanJob>,
    config: &ScanConfig,
    out_dir: &Path,
    workers: usize,
    cancel: &CancelToken,
) -> Result<Vec<ObservationReport>, ScanError> {
    config.validate()?;
    std::fs::create_dir_all(out_dir)?;
    let workers = workers.max(1).min(jobs.len().max(1));

    let (job_tx, job_rx) = unbounded::<ScanJob>();
    let (report_tx, report_rx) = unbounded::<ObservationReport>();
    for job in jobs {
        // Receiver outlives every send.
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    thread::scope(|s| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let report_tx = report_tx.clone();
            let cancel = cancel.clone();
            s.spawn(move || {
                while let Ok(job) = job_rx.recv() {
                    let observation = job.source.observation().to_string();
                    let output = output_path(out_dir, &observation);
                    let num_channels = job.source.num_channels();
                    let mut writer =
                        JsonHitWriter::new(output.clone(), observation.as_str(), num_channels);
                    log::info!("scanning {observation}");
                    let outcome =
                        scan_observation(job.source, config, &mut writer, &cancel);
                    match &outcome {
                        Ok(summary) => log::info!(
                            "{observation}: {} hits from {} detections over {} samples",
                            summary.num_hits,
                            summary.num_detections,
                            summary.num_samples
                        ),
                        Err(e) => log::error!("{observation}: scan failed: {e}"),
                    }
                    let report = ObservationReport {
                        observation,
                        output,
                        outcome,
                    };
                    if report_tx.send(report).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(report_tx);

    let mut reports: Vec<ObservationReport> = report_rx.iter().collect();
    reports.sort_by(|a, b| a.observation.cmp(&b.observation));
    Ok(reports)
}
