//! Synthetic spectrograms with known injected signals.
//!
//! Ground truth for the pipeline tests and the `hitscan synth` demo: white
//! Gaussian noise with a configurable per-channel sigma, plus drifting
//! narrowband tones at a chosen SNR. Generation is deterministic under a
//! seed, and each channel draws from its own RNG stream, so changing one
//! channel's sigma leaves every other channel's realization bit-identical.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::chunk::MemoryChunkSource;

/// One injected narrowband tone.
///
/// The tone occupies time samples `time_start..=time_end` and follows a
/// channel path from `chan_start` to `chan_end`, optionally bowed by
/// `curvature` extra channels at mid-span. Its amplitude at each sample is
/// `snr` times that channel's noise sigma.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSpec {
    pub time_start: usize,
    pub time_end: usize,
    pub chan_start: f64,
    pub chan_end: f64,
    /// Channel deflection added at mid-span; 0.0 gives a straight drift.
    pub curvature: f64,
    /// Number of adjacent channels the tone's power is smeared across.
    pub smear: usize,
    /// Injected amplitude in units of the local noise sigma.
    pub snr: f64,
}

impl SignalSpec {
    /// A straight drifting tone, one channel wide.
    pub fn drifting(
        time_start: usize,
        time_end: usize,
        chan_start: f64,
        chan_end: f64,
        snr: f64,
    ) -> Self {
        Self {
            time_start,
            time_end,
            chan_start,
            chan_end,
            curvature: 0.0,
            smear: 1,
            snr,
        }
    }

    pub fn with_curvature(mut self, curvature: f64) -> Self {
        self.curvature = curvature;
        self
    }

    pub fn with_smear(mut self, smear: usize) -> Self {
        assert!(smear >= 1, "smear must cover at least one channel");
        self.smear = smear;
        self
    }

    /// Channel position at time `t`, before rounding.
    fn channel_at(&self, t: usize) -> f64 {
        let span = (self.time_end - self.time_start).max(1) as f64;
        let s = (t - self.time_start) as f64 / span;
        self.chan_start + (self.chan_end - self.chan_start) * s + self.curvature * 4.0 * s * (1.0 - s)
    }
}

/// Noise and signal description for one synthetic observation.
#[derive(Debug, Clone)]
pub struct SynthSpectrogram {
    pub num_channels: usize,
    pub num_samples: usize,
    /// Constant power offset added to every sample.
    pub baseline: f64,
    /// Noise standard deviation per channel.
    pub noise_sigma: Vec<f64>,
    pub seed: u64,
    pub signals: Vec<SignalSpec>,
}

impl SynthSpectrogram {
    pub fn new(num_channels: usize, num_samples: usize) -> Self {
        Self {
            num_channels,
            num_samples,
            baseline: 100.0,
            noise_sigma: vec![1.0; num_channels],
            seed: 0,
            signals: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the noise sigma of a channel range, e.g. to model a hot
    /// sub-band.
    pub fn with_sigma_band(mut self, channels: std::ops::Range<usize>, sigma: f64) -> Self {
        for ch in channels {
            self.noise_sigma[ch] = sigma;
        }
        self
    }

    pub fn with_signal(mut self, signal: SignalSpec) -> Self {
        self.signals.push(signal);
        self
    }

    /// Render the full power matrix, time × channel.
    pub fn generate(&self) -> Array2<f64> {
        let mut data = Array2::zeros((self.num_samples, self.num_channels));
        let unit = Normal::new(0.0, 1.0).unwrap();

        // Independent RNG stream per channel; sigma scales draws after the
        // fact, so other channels are unaffected by a sigma change.
        for ch in 0..self.num_channels {
            let mut rng = StdRng::seed_from_u64(
                self.seed ^ (ch as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15),
            );
            let sigma = self.noise_sigma[ch];
            for t in 0..self.num_samples {
                data[[t, ch]] = self.baseline + sigma * unit.sample(&mut rng);
            }
        }

        for signal in &self.signals {
            for t in signal.time_start..=signal.time_end.min(self.num_samples.saturating_sub(1)) {
                let center = signal.channel_at(t).round() as isize;
                for k in 0..signal.smear {
                    let ch = center + k as isize;
                    if (0..self.num_channels as isize).contains(&ch) {
                        let ch = ch as usize;
                        data[[t, ch]] += signal.snr * self.noise_sigma[ch];
                    }
                }
            }
        }
        data
    }

    /// Render and wrap as a chunk source.
    pub fn source(&self, observation: impl Into<String>, chunk_len: usize) -> MemoryChunkSource {
        MemoryChunkSource::new(observation, self.generate(), chunk_len)
    }
}
