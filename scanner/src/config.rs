//! Scanner configuration.
//!
//! These are the values the core consumes; how they get here (CLI flags,
//! JSON file, defaults) is up to the caller. Defaults are deliberately
//! conservative: a false positive costs a little classifier time, a false
//! negative loses a candidate forever.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Behavior while a channel's window has fewer than `width` samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarmupPolicy {
    /// Produce no detections for a width until its window is full. Affects
    /// only the first `max(width)` samples of each observation.
    Suppress,
    /// Detect using partial-window statistics once at least
    /// [`MIN_PARTIAL_FILL`](crate::engine::MIN_PARTIAL_FILL) samples are
    /// present. Higher variance near observation start, but no blind period.
    Partial,
}

/// Tunable values for one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Minimum single-sample SNR to trigger a detection. Nominal range
    /// 10–25; the default sits at the permissive end.
    pub snr_threshold: f64,
    /// Minimum SNR for the two-adjacent-channel average. Lower than
    /// `snr_threshold` because the pair estimate averages down noise.
    pub pair_snr_threshold: f64,
    /// Trailing window widths, in time samples. All widths are computed in
    /// the same pass.
    pub window_widths: Vec<usize>,
    /// Maximum number of empty time samples between a detection and an open
    /// extent for them to merge. Also the closing delay for idle extents.
    pub time_tolerance: usize,
    /// Maximum channel distance between a detection and an open extent's
    /// channel span for them to merge.
    pub channel_tolerance: usize,
    /// Ceiling on simultaneously open extents before the scan is flagged as
    /// pathological for the observation.
    pub max_open_extents: usize,
    /// Behavior before a window fills at observation start.
    pub warmup: WarmupPolicy,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            snr_threshold: 10.0,
            pair_snr_threshold: 7.0,
            window_widths: vec![16, 64],
            time_tolerance: 3,
            channel_tolerance: 2,
            max_open_extents: 512,
            warmup: WarmupPolicy::Suppress,
        }
    }
}

impl ScanConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ScanError> {
        let text = std::fs::read_to_string(path)?;
        let config: ScanConfig = serde_json::from_str(&text)
            .map_err(|e| ScanError::InvalidConfig(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency. Called by the pipeline constructor, so
    /// invalid values fail before any data is touched.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.snr_threshold <= 0.0 {
            return Err(ScanError::InvalidConfig(format!(
                "snr_threshold must be positive, got {}",
                self.snr_threshold
            )));
        }
        if self.pair_snr_threshold <= 0.0 {
            return Err(ScanError::InvalidConfig(format!(
                "pair_snr_threshold must be positive, got {}",
                self.pair_snr_threshold
            )));
        }
        if self.window_widths.is_empty() {
            return Err(ScanError::InvalidConfig(
                "at least one window width is required".into(),
            ));
        }
        for &width in &self.window_widths {
            // Variance needs at least two samples.
            if width < 2 {
                return Err(ScanError::InvalidConfig(format!(
                    "window width must be at least 2, got {width}"
                )));
            }
        }
        if self.max_open_extents == 0 {
            return Err(ScanError::InvalidConfig(
                "max_open_extents must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Largest configured window width.
    pub fn max_width(&self) -> usize {
        self.window_widths.iter().copied().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScanConfig::default();
        config.validate().unwrap();
        assert_eq!(config.max_width(), 64);
        assert!(config.pair_snr_threshold < config.snr_threshold);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = ScanConfig::default();
        config.snr_threshold = 0.0;
        assert!(config.validate().is_err());

        let mut config = ScanConfig::default();
        config.window_widths = vec![];
        assert!(config.validate().is_err());

        let mut config = ScanConfig::default();
        config.window_widths = vec![16, 1];
        assert!(config.validate().is_err());

        let mut config = ScanConfig::default();
        config.max_open_extents = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_partial_json_takes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"snr_threshold": 12.5, "window_widths": [8, 32], "warmup": "partial"}}"#
        )
        .unwrap();

        let config = ScanConfig::load(&path).unwrap();
        assert_eq!(config.snr_threshold, 12.5);
        assert_eq!(config.window_widths, vec![8, 32]);
        assert_eq!(config.warmup, WarmupPolicy::Partial);
        // Unspecified fields keep their defaults
        assert_eq!(config.time_tolerance, 3);
        assert_eq!(config.max_open_extents, 512);
    }

    #[test]
    fn test_load_invalid_json_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            ScanConfig::load(&path),
            Err(ScanError::InvalidConfig(_))
        ));
    }
}
