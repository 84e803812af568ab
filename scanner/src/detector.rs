//! Per-sample adaptive thresholding against the rolling noise statistics.
//!
//! A sample triggers on a given width when its deviation from that window's
//! mean, in units of the window's standard deviation, clears the threshold.
//! A second, lower threshold applies to the average of two adjacent
//! channels, normalized against both channels' noise, which recovers
//! narrowband signals whose power straddles a channel boundary; a
//! qualifying pair credits both channels.
//!
//! The detector is stateless across rows. At most one [`Detection`] is
//! emitted per (channel, width) per time sample, carrying the best
//! qualifying SNR.

use crate::config::{ScanConfig, WarmupPolicy};
use crate::engine::WindowStats;

/// One above-threshold event at a single (time, channel) for one window
/// width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub time: usize,
    pub channel: usize,
    /// Window width whose statistics produced this SNR.
    pub width: usize,
    /// Best qualifying SNR for this (channel, width), single or pair.
    pub snr: f64,
}

/// Threshold comparison over one row of samples.
pub struct Detector {
    snr_threshold: f64,
    pair_snr_threshold: f64,
    warmup: WarmupPolicy,
}

impl Detector {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            snr_threshold: config.snr_threshold,
            pair_snr_threshold: config.pair_snr_threshold,
            warmup: config.warmup,
        }
    }

    /// Scan one time-row.
    ///
    /// `values` holds the row's raw power per channel; `stats` is the
    /// engine's output for the same position (channel-major, `num_widths`
    /// entries per channel, widths ascending). Detections are appended in
    /// channel order, widths ascending within a channel. `censored[ch]` is
    /// set for every channel that triggered at any width, so the engine can
    /// keep the sample out of the noise history.
    pub fn scan_row(
        &self,
        time: usize,
        values: &[f64],
        stats: &[WindowStats],
        num_widths: usize,
        detections: &mut Vec<Detection>,
        censored: &mut [bool],
    ) {
        debug_assert_eq!(stats.len(), values.len() * num_widths);
        debug_assert_eq!(censored.len(), values.len());
        censored.iter_mut().for_each(|c| *c = false);

        // Pair SNRs qualified at channel c also credit channel c+1; carry
        // them forward one channel, per width.
        let mut carry = vec![f64::NEG_INFINITY; num_widths];
        let mut next_carry = vec![f64::NEG_INFINITY; num_widths];

        for ch in 0..values.len() {
            let row_stats = &stats[ch * num_widths..(ch + 1) * num_widths];
            let mut triggered = false;
            next_carry.iter_mut().for_each(|c| *c = f64::NEG_INFINITY);

            for (wi, ws) in row_stats.iter().enumerate() {
                let mut best = f64::NEG_INFINITY;
                if ws.usable(self.warmup) {
                    let snr = (values[ch] - ws.mean) / ws.dev;
                    if snr >= self.snr_threshold {
                        best = snr;
                    }
                    if ch + 1 < values.len() {
                        // Normalize the pair against both channels' noise
                        // (RMS of the devs), so a quiet channel adjacent to
                        // a hot sub-band does not fire on the hot channel's
                        // fluctuations alone.
                        let right = &stats[(ch + 1) * num_widths + wi];
                        if right.usable(self.warmup) {
                            let pair_value = (values[ch] + values[ch + 1]) / 2.0;
                            let pair_mean = (ws.mean + right.mean) / 2.0;
                            let pair_dev =
                                ((ws.dev * ws.dev + right.dev * right.dev) / 2.0).sqrt();
                            let pair_snr = (pair_value - pair_mean) / pair_dev;
                            if pair_snr >= self.pair_snr_threshold {
                                best = best.max(pair_snr);
                                next_carry[wi] = pair_snr;
                            }
                        }
                    }
                }
                // Credit carried over from the (ch-1, ch) pair.
                best = best.max(carry[wi]);
                if best > f64::NEG_INFINITY {
                    detections.push(Detection {
                        time,
                        channel: ch,
                        width: ws.width,
                        snr: best,
                    });
                    triggered = true;
                }
            }

            if triggered {
                censored[ch] = true;
            }
            std::mem::swap(&mut carry, &mut next_carry);
        }
    }
}
