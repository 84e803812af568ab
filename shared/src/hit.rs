//! The consolidated candidate-detection record emitted by Stage 1.
//!
//! A [`Hit`] is a rectangular time/frequency extent covering every raw
//! detection that was merged into it, plus the peak SNR observed inside the
//! extent and a coarse shape hint for the downstream classifier. Hits are
//! immutable once emitted.

use serde::{Deserialize, Serialize};

/// A candidate signal region in one observation's spectrogram.
///
/// Extents are inclusive on both ends, in units of time-sample index and
/// frequency-channel index. Two hits from the same observation never overlap
/// in both time and frequency simultaneously; overlapping detections are
/// merged before emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// First time sample covered by the hit (inclusive).
    pub time_start: usize,
    /// Last time sample covered by the hit (inclusive).
    pub time_end: usize,
    /// Lowest frequency channel covered by the hit (inclusive).
    pub chan_start: usize,
    /// Highest frequency channel covered by the hit (inclusive).
    pub chan_end: usize,
    /// Strongest local SNR observed among the merged detections.
    pub peak_snr: f64,
    /// Window width at which the peak SNR occurred.
    pub peak_width: usize,
    /// Shape hint for the classifier: time span divided by channel span.
    pub aspect: f64,
}

impl Hit {
    /// Build a hit from its extent and peak statistics.
    ///
    /// The aspect-ratio shape hint is derived from the extent: tall, narrow
    /// hits (large aspect) look like steady narrowband carriers; wide, short
    /// ones look like broadband bursts.
    pub fn new(
        time_start: usize,
        time_end: usize,
        chan_start: usize,
        chan_end: usize,
        peak_snr: f64,
        peak_width: usize,
    ) -> Self {
        let time_span = (time_end - time_start + 1) as f64;
        let chan_span = (chan_end - chan_start + 1) as f64;
        Self {
            time_start,
            time_end,
            chan_start,
            chan_end,
            peak_snr,
            peak_width,
            aspect: time_span / chan_span,
        }
    }

    /// Number of time samples covered, inclusive.
    pub fn time_span(&self) -> usize {
        self.time_end - self.time_start + 1
    }

    /// Number of frequency channels covered, inclusive.
    pub fn chan_span(&self) -> usize {
        self.chan_end - self.chan_start + 1
    }

    /// Whether this hit covers the given (time, channel) coordinate.
    pub fn contains(&self, time: usize, channel: usize) -> bool {
        time >= self.time_start
            && time <= self.time_end
            && channel >= self.chan_start
            && channel <= self.chan_end
    }

    /// Whether the time *and* frequency extents of two hits both overlap.
    pub fn overlaps(&self, other: &Hit) -> bool {
        self.time_start <= other.time_end
            && self.time_end >= other.time_start
            && self.chan_start <= other.chan_end
            && self.chan_end >= other.chan_start
    }
}
