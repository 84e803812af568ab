//! Command-line front end for the scanner.
//!
//! `hitscan synth` generates synthetic observations with injected signals
//! and scans them, which is the quickest way to exercise the full pipeline
//! end to end. `hitscan show` prints a saved hit list.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::HitList;

use scanner::{
    run_jobs, CancelToken, ScanConfig, ScanJob, SignalSpec, SynthSpectrogram,
};

#[derive(Parser)]
#[command(author, version, about = "Streaming spectrogram filter for technosignature searches")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate synthetic observations and scan them
    Synth {
        /// Number of observations to generate
        #[arg(long, default_value_t = 4)]
        observations: usize,

        /// Frequency channels per observation
        #[arg(long, default_value_t = 64)]
        channels: usize,

        /// Time samples per observation
        #[arg(long, default_value_t = 4096)]
        samples: usize,

        /// Injected drifting tones per observation
        #[arg(long, default_value_t = 3)]
        signals: usize,

        /// Injected signal strength, in local noise sigmas
        #[arg(long, default_value_t = 15.0)]
        snr: f64,

        /// RNG seed; omit for a fixed default
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Time samples per chunk fed to the scanner
        #[arg(long, default_value_t = 1024)]
        chunk_len: usize,

        /// Worker threads
        #[arg(long, default_value_t = 2)]
        workers: usize,

        /// Output directory for hit lists
        #[arg(short, long, default_value = "hits")]
        out: PathBuf,

        /// Scan configuration JSON; defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the single-sample SNR threshold
        #[arg(long)]
        threshold: Option<f64>,

        /// Override the window widths, comma separated
        #[arg(long, value_delimiter = ',')]
        widths: Option<Vec<usize>>,
    },

    /// Print a saved hit list
    Show {
        /// Path to a .hits.json file
        path: PathBuf,
    },
}

fn main() {
    env_logger::init();
    if let Err(e) = run(Cli::parse()) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Synth {
            observations,
            channels,
            samples,
            signals,
            snr,
            seed,
            chunk_len,
            workers,
            out,
            config,
            threshold,
            widths,
        } => {
            let mut scan_config = match config {
                Some(path) => ScanConfig::load(&path)?,
                None => ScanConfig::default(),
            };
            if let Some(t) = threshold {
                scan_config.snr_threshold = t;
            }
            if let Some(w) = widths {
                scan_config.window_widths = w;
            }
            scan_config.validate()?;

            let mut rng = StdRng::seed_from_u64(seed);
            let mut jobs = Vec::with_capacity(observations);
            for i in 0..observations {
                let mut synth =
                    SynthSpectrogram::new(channels, samples).with_seed(seed.wrapping_add(i as u64));
                for _ in 0..signals {
                    let start = rng.gen_range(0..samples.saturating_sub(samples / 4).max(1));
                    let dwell = rng.gen_range((samples / 16).max(1)..(samples / 4).max(2));
                    let end = (start + dwell).min(samples - 1);
                    let chan_a = rng.gen_range(0.0..channels as f64);
                    let chan_b =
                        (chan_a + rng.gen_range(-4.0..4.0)).clamp(0.0, (channels - 1) as f64);
                    synth = synth.with_signal(SignalSpec::drifting(start, end, chan_a, chan_b, snr));
                }
                jobs.push(ScanJob::new(synth.source(format!("synth_{i:03}"), chunk_len)));
            }

            let reports = run_jobs(jobs, &scan_config, &out, workers, &CancelToken::new())?;
            for report in &reports {
                match &report.outcome {
                    Ok(summary) => println!(
                        "{}: {} hits ({} detections, {} samples) -> {}",
                        report.observation,
                        summary.num_hits,
                        summary.num_detections,
                        summary.num_samples,
                        report.output.display()
                    ),
                    Err(e) => println!("{}: FAILED: {e}", report.observation),
                }
            }
        }

        Commands::Show { path } => {
            let list = HitList::load(&path)?;
            println!(
                "{}: {} channels, {} hits",
                list.observation,
                list.num_channels,
                list.num_hits()
            );
            for hit in &list.hits {
                println!(
                    "  t {:>6}..={:<6} ch {:>5}..={:<5} peak {:>7.2} @ w{:<4} aspect {:.2}",
                    hit.time_start,
                    hit.time_end,
                    hit.chan_start,
                    hit.chan_end,
                    hit.peak_snr,
                    hit.peak_width,
                    hit.aspect
                );
            }
        }
    }
    Ok(())
}
