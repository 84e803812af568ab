//! Rolling local-noise statistics over every channel's power time-series.
//!
//! For each channel and each configured window width W, the engine maintains
//! mean and standard deviation of the trailing W samples *preceding* the
//! current one, updated in O(1) per width as each sample arrives. All widths
//! share one ring buffer of the last `max(W)` stored values per channel, so
//! memory stays at O(channels × max width) no matter how long the
//! observation runs.
//!
//! Noise is estimated over a small trailing window rather than the whole
//! band on purpose: a noisy sub-band then only inflates its own threshold,
//! instead of either flooding the output or masking weak signals elsewhere.
//!
//! Samples that trigger a detection are entered into the history as the
//! widest window's mean rather than their raw value (censored history).
//! Without this, a signal dwelling in one channel longer than W would raise
//! its own noise floor and disappear from its own hit.

use std::collections::VecDeque;

use crate::config::{ScanConfig, WarmupPolicy};
use crate::error::ScanError;

/// Lower bound on the standard-deviation estimate. A zero-variance window
/// (constant power, e.g. a clipped or dead channel) would otherwise produce
/// an infinite SNR for any deviation at all.
pub const NOISE_FLOOR: f64 = 0.01;

/// Minimum samples before a partial window is considered meaningful under
/// [`WarmupPolicy::Partial`].
pub const MIN_PARTIAL_FILL: usize = 4;

/// Rolling sums are recomputed exactly from the ring this often, bounding
/// floating-point drift on long streams.
const REFRESH_INTERVAL: u64 = 1 << 16;

/// Local statistics for one (channel, width) at the current time position.
/// Covers the trailing `count` stored samples, excluding the current one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    /// Configured window width.
    pub width: usize,
    /// Samples currently in the window; less than `width` during warm-up.
    pub count: usize,
    /// Mean power of the window.
    pub mean: f64,
    /// Standard deviation of the window, floored at [`NOISE_FLOOR`].
    pub dev: f64,
}

impl Default for WindowStats {
    fn default() -> Self {
        Self {
            width: 0,
            count: 0,
            mean: 0.0,
            dev: NOISE_FLOOR,
        }
    }
}

impl WindowStats {
    /// Whether these statistics may back a detection under `policy`.
    pub fn usable(&self, policy: WarmupPolicy) -> bool {
        match policy {
            WarmupPolicy::Suppress => self.count == self.width,
            WarmupPolicy::Partial => self.count >= MIN_PARTIAL_FILL.min(self.width),
        }
    }
}

/// Rolling sum and sum-of-squares over the trailing `width` stored values.
#[derive(Debug, Clone)]
struct WidthAccumulator {
    width: usize,
    sum: f64,
    sum_sq: f64,
    count: usize,
}

impl WidthAccumulator {
    fn new(width: usize) -> Self {
        Self {
            width,
            sum: 0.0,
            sum_sq: 0.0,
            count: 0,
        }
    }

    /// Sample standard deviation with the n denominator, like the window it
    /// estimates; the floor keeps SNR finite on degenerate windows.
    fn stats(&self) -> WindowStats {
        if self.count == 0 {
            return WindowStats {
                width: self.width,
                ..WindowStats::default()
            };
        }
        let n = self.count as f64;
        let mean = self.sum / n;
        let variance = (self.sum_sq / n - mean * mean).max(0.0);
        WindowStats {
            width: self.width,
            count: self.count,
            mean,
            dev: variance.sqrt().max(NOISE_FLOOR),
        }
    }
}

/// Per-channel history ring plus one accumulator per width.
#[derive(Debug, Clone)]
struct ChannelState {
    /// Last `max_width` stored values, oldest first.
    ring: VecDeque<f64>,
    accums: Vec<WidthAccumulator>,
    pushes: u64,
}

impl ChannelState {
    fn new(widths: &[usize], max_width: usize) -> Self {
        Self {
            ring: VecDeque::with_capacity(max_width),
            accums: widths.iter().map(|&w| WidthAccumulator::new(w)).collect(),
            pushes: 0,
        }
    }

    /// Enter `stored` into the history: every width's window slides forward
    /// by one sample.
    fn push(&mut self, stored: f64, max_width: usize) {
        for acc in &mut self.accums {
            acc.sum += stored;
            acc.sum_sq += stored * stored;
            if acc.count < acc.width {
                acc.count += 1;
            } else {
                // The value leaving this width's window after the push.
                let out = self.ring[self.ring.len() - acc.width];
                acc.sum -= out;
                acc.sum_sq -= out * out;
            }
        }
        self.ring.push_back(stored);
        if self.ring.len() > max_width {
            self.ring.pop_front();
        }
        self.pushes += 1;
        if self.pushes % REFRESH_INTERVAL == 0 {
            self.refresh();
        }
    }

    /// Recompute every accumulator exactly from the ring.
    fn refresh(&mut self) {
        for acc in &mut self.accums {
            let start = self.ring.len() - acc.count;
            let mut sum = 0.0;
            let mut sum_sq = 0.0;
            for &v in self.ring.iter().skip(start) {
                sum += v;
                sum_sq += v * v;
            }
            acc.sum = sum;
            acc.sum_sq = sum_sq;
        }
    }

    /// Mean of the widest window, used as the substitute value when a
    /// sample is censored. Falls back to the raw value before any history
    /// exists.
    fn widest_mean(&self, fallback: f64) -> f64 {
        match self.accums.last() {
            Some(acc) if acc.count > 0 => acc.sum / acc.count as f64,
            _ => fallback,
        }
    }
}

/// The windowed statistics engine for one observation.
///
/// Call [`stats_row`](Self::stats_row) to read the trailing-window
/// statistics for the current time position, then
/// [`advance_row`](Self::advance_row) to enter the row's samples into the
/// history. The engine never sees time indices; it only knows "one row at a
/// time, in order".
pub struct StatsEngine {
    widths: Vec<usize>,
    max_width: usize,
    channels: Vec<ChannelState>,
}

impl StatsEngine {
    pub fn new(num_channels: usize, config: &ScanConfig) -> Result<Self, ScanError> {
        config.validate()?;
        let mut widths = config.window_widths.clone();
        widths.sort_unstable();
        widths.dedup();
        let max_width = *widths.last().unwrap_or(&0);
        let channels = (0..num_channels)
            .map(|_| ChannelState::new(&widths, max_width))
            .collect();
        Ok(Self {
            widths,
            max_width,
            channels,
        })
    }

    /// Configured widths, ascending and deduplicated.
    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    pub fn num_widths(&self) -> usize {
        self.widths.len()
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Fill `out` (length `num_channels × num_widths`, channel-major, widths
    /// ascending within a channel) with the statistics of every trailing
    /// window at the current position.
    pub fn stats_row(&self, out: &mut [WindowStats]) {
        debug_assert_eq!(out.len(), self.channels.len() * self.widths.len());
        for (ch, state) in self.channels.iter().enumerate() {
            let base = ch * self.widths.len();
            for (wi, acc) in state.accums.iter().enumerate() {
                out[base + wi] = acc.stats();
            }
        }
    }

    /// Enter one time-row of raw power values into the history.
    /// `censored[ch]` marks samples that triggered a detection; those are
    /// stored as the channel's widest-window mean instead of the raw value.
    pub fn advance_row(&mut self, values: &[f64], censored: &[bool]) {
        debug_assert_eq!(values.len(), self.channels.len());
        debug_assert_eq!(censored.len(), self.channels.len());
        for (ch, state) in self.channels.iter_mut().enumerate() {
            let raw = values[ch];
            let stored = if censored[ch] {
                state.widest_mean(raw)
            } else {
                raw
            };
            state.push(stored, self.max_width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn engine_with_widths(channels: usize, widths: &[usize]) -> StatsEngine {
        let config = ScanConfig {
            window_widths: widths.to_vec(),
            ..ScanConfig::default()
        };
        StatsEngine::new(channels, &config).unwrap()
    }

    /// Direct mean/dev over a slice, n denominator, with the floor.
    fn naive_stats(window: &[f64]) -> (f64, f64) {
        let n = window.len() as f64;
        let mean = window.iter().sum::<f64>() / n;
        let var = window.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        (mean, var.sqrt().max(NOISE_FLOOR))
    }

    #[test]
    fn test_rolling_matches_naive() {
        let widths = [4, 8];
        let mut engine = engine_with_widths(1, &widths);
        let mut rng = StdRng::seed_from_u64(7);
        let series: Vec<f64> = (0..200).map(|_| rng.gen_range(0.0..100.0)).collect();

        let mut stats = vec![WindowStats::default(); widths.len()];
        for (t, &value) in series.iter().enumerate() {
            engine.stats_row(&mut stats);
            for (wi, &w) in widths.iter().enumerate() {
                let start = t.saturating_sub(w);
                let window = &series[start..t];
                assert_eq!(stats[wi].count, window.len());
                if !window.is_empty() {
                    let (mean, dev) = naive_stats(window);
                    assert_relative_eq!(stats[wi].mean, mean, epsilon = 1e-9);
                    assert_relative_eq!(stats[wi].dev, dev, epsilon = 1e-9);
                }
            }
            engine.advance_row(&[value], &[false]);
        }
    }

    #[test]
    fn test_dev_floor_on_constant_input() {
        let mut engine = engine_with_widths(1, &[4]);
        for _ in 0..10 {
            engine.advance_row(&[42.0], &[false]);
        }
        let mut stats = vec![WindowStats::default(); 1];
        engine.stats_row(&mut stats);
        assert_eq!(stats[0].count, 4);
        assert_relative_eq!(stats[0].mean, 42.0);
        assert_eq!(stats[0].dev, NOISE_FLOOR);
    }

    #[test]
    fn test_warmup_counts_and_usability() {
        let mut engine = engine_with_widths(1, &[4]);
        let mut stats = vec![WindowStats::default(); 1];

        for t in 0..6 {
            engine.stats_row(&mut stats);
            assert_eq!(stats[0].count, t.min(4));
            let full = stats[0].count == 4;
            assert_eq!(stats[0].usable(WarmupPolicy::Suppress), full);
            assert_eq!(
                stats[0].usable(WarmupPolicy::Partial),
                stats[0].count >= MIN_PARTIAL_FILL
            );
            engine.advance_row(&[t as f64], &[false]);
        }
    }

    #[test]
    fn test_censored_sample_does_not_move_stats() {
        let mut engine = engine_with_widths(1, &[4]);
        for v in [10.0, 10.0, 10.0, 10.0] {
            engine.advance_row(&[v], &[false]);
        }
        let mut before = vec![WindowStats::default(); 1];
        engine.stats_row(&mut before);

        // A huge censored sample is stored as the window mean...
        engine.advance_row(&[1e6], &[true]);
        let mut after = vec![WindowStats::default(); 1];
        engine.stats_row(&mut after);
        assert_relative_eq!(after[0].mean, before[0].mean, epsilon = 1e-9);
        assert_eq!(after[0].dev, NOISE_FLOOR);

        // ...while the same sample uncensored would dominate the window.
        let mut other = engine_with_widths(1, &[4]);
        for v in [10.0, 10.0, 10.0, 10.0] {
            other.advance_row(&[v], &[false]);
        }
        other.advance_row(&[1e6], &[false]);
        let mut poisoned = vec![WindowStats::default(); 1];
        other.stats_row(&mut poisoned);
        assert!(poisoned[0].mean > 1e5);
    }

    #[test]
    fn test_channels_are_independent() {
        let mut engine = engine_with_widths(2, &[2]);
        engine.advance_row(&[1.0, 100.0], &[false, false]);
        engine.advance_row(&[3.0, 300.0], &[false, false]);
        let mut stats = vec![WindowStats::default(); 2];
        engine.stats_row(&mut stats);
        assert_relative_eq!(stats[0].mean, 2.0);
        assert_relative_eq!(stats[1].mean, 200.0);
    }

    #[test]
    fn test_widths_sorted_and_deduped() {
        let engine = engine_with_widths(1, &[64, 16, 64]);
        assert_eq!(engine.widths(), &[16, 64]);
        assert_eq!(engine.num_widths(), 2);
    }
}
