//! Merging point detections into contiguous hit regions.
//!
//! A drifting narrowband signal produces a cloud of detections tracing a
//! diagonal line through the spectrogram; noise produces isolated points.
//! The aggregator grows axis-aligned extents around detections that fall
//! within a small time/channel tolerance of each other, so one signal
//! becomes one [`Hit`] rather than hundreds.
//!
//! Detections must arrive in nondecreasing time order. An extent closes
//! once the time cursor moves past its last extension by more than the time
//! tolerance; closed extents are emitted in nondecreasing `time_end` order.

use shared::Hit;

use crate::config::ScanConfig;
use crate::detector::Detection;
use crate::error::ScanError;

/// An in-progress hit region still eligible for extension.
#[derive(Debug, Clone)]
struct OpenExtent {
    time_start: usize,
    time_end: usize,
    chan_start: usize,
    chan_end: usize,
    peak_snr: f64,
    peak_width: usize,
}

impl OpenExtent {
    fn from_detection(det: &Detection) -> Self {
        Self {
            time_start: det.time,
            time_end: det.time,
            chan_start: det.channel,
            chan_end: det.channel,
            peak_snr: det.snr,
            peak_width: det.width,
        }
    }

    /// Whether a detection at `channel` is within `tol` channels of this
    /// extent's span. Time adjacency is implied for any still-open extent.
    fn channel_adjacent(&self, channel: usize, tol: usize) -> bool {
        channel + tol >= self.chan_start && channel <= self.chan_end + tol
    }

    fn absorb(&mut self, det: &Detection) {
        self.time_end = self.time_end.max(det.time);
        self.chan_start = self.chan_start.min(det.channel);
        self.chan_end = self.chan_end.max(det.channel);
        if det.snr > self.peak_snr {
            self.peak_snr = det.snr;
            self.peak_width = det.width;
        }
    }

    fn merge(&mut self, other: OpenExtent) {
        self.time_start = self.time_start.min(other.time_start);
        self.time_end = self.time_end.max(other.time_end);
        self.chan_start = self.chan_start.min(other.chan_start);
        self.chan_end = self.chan_end.max(other.chan_end);
        if other.peak_snr > self.peak_snr {
            self.peak_snr = other.peak_snr;
            self.peak_width = other.peak_width;
        }
    }

    fn into_hit(self) -> Hit {
        Hit::new(
            self.time_start,
            self.time_end,
            self.chan_start,
            self.chan_end,
            self.peak_snr,
            self.peak_width,
        )
    }
}

/// Grows and closes hit extents as detections stream in.
pub struct HitAggregator {
    time_tolerance: usize,
    channel_tolerance: usize,
    max_open: usize,
    open: Vec<OpenExtent>,
    /// Closed but not yet drained.
    pending: Vec<Hit>,
}

impl HitAggregator {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            time_tolerance: config.time_tolerance,
            channel_tolerance: config.channel_tolerance,
            max_open: config.max_open_extents,
            open: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn num_open(&self) -> usize {
        self.open.len()
    }

    /// Fold one detection in. Extends an adjacent open extent, merges
    /// extents the detection bridges, or opens a new one. Fails with
    /// [`ScanError::PathologicalNoise`] when opening a new extent would
    /// exceed the configured ceiling.
    pub fn observe(&mut self, det: &Detection) -> Result<(), ScanError> {
        self.advance_to(det.time);

        // Find every open extent the detection is adjacent to. The first
        // becomes the merge target; the rest fold into it, since the
        // detection bridges them.
        let mut target: Option<usize> = None;
        let mut i = 0;
        while i < self.open.len() {
            if self.open[i].channel_adjacent(det.channel, self.channel_tolerance) {
                match target {
                    None => {
                        target = Some(i);
                        i += 1;
                    }
                    Some(t) => {
                        let bridged = self.open.swap_remove(i);
                        self.open[t].merge(bridged);
                    }
                }
            } else {
                i += 1;
            }
        }

        match target {
            Some(t) => self.open[t].absorb(det),
            None => {
                if self.open.len() >= self.max_open {
                    let chan_lo = self
                        .open
                        .iter()
                        .map(|e| e.chan_start)
                        .min()
                        .unwrap_or(det.channel)
                        .min(det.channel);
                    let chan_hi = self
                        .open
                        .iter()
                        .map(|e| e.chan_end)
                        .max()
                        .unwrap_or(det.channel)
                        .max(det.channel);
                    return Err(ScanError::PathologicalNoise {
                        time: det.time,
                        chan_lo,
                        chan_hi,
                        open: self.open.len() + 1,
                        ceiling: self.max_open,
                    });
                }
                self.open.push(OpenExtent::from_detection(det));
            }
        }
        Ok(())
    }

    /// Move the time cursor to `time`, closing extents no detection at or
    /// after `time` could still extend.
    pub fn advance_to(&mut self, time: usize) {
        let mut i = 0;
        while i < self.open.len() {
            if self.open[i].time_end + self.time_tolerance < time {
                let extent = self.open.swap_remove(i);
                self.pending.push(extent.into_hit());
            } else {
                i += 1;
            }
        }
    }

    /// Take all closed hits, ordered by (time_end, time_start, chan_start).
    /// Across successive drains the `time_end` sequence is nondecreasing.
    pub fn drain_closed(&mut self) -> Vec<Hit> {
        let mut hits = std::mem::take(&mut self.pending);
        hits.sort_by(|a, b| {
            (a.time_end, a.time_start, a.chan_start).cmp(&(b.time_end, b.time_start, b.chan_start))
        });
        hits
    }

    /// Close every remaining extent at end of observation and drain.
    pub fn finish(&mut self) -> Vec<Hit> {
        for extent in self.open.drain(..) {
            self.pending.push(extent.into_hit());
        }
        self.drain_closed()
    }
}
