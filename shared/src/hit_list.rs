//! The persisted per-observation hit document.
//!
//! One JSON document per observation, holding every hit the scanner emitted
//! plus enough metadata to interpret the channel indices. JSON keeps the
//! format extensible for later stages; serialization is deterministic so a
//! replayed scan produces a byte-identical file.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::hit::Hit;
use crate::writer::WriteError;

/// All hits found in one observation, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitList {
    /// Identifier of the source observation (typically the input filename).
    pub observation: String,
    /// Total number of frequency channels in the observation.
    pub num_channels: usize,
    /// Hits ordered by nondecreasing `time_end`.
    pub hits: Vec<Hit>,
}

impl HitList {
    /// Create an empty hit list for an observation.
    pub fn new(observation: impl Into<String>, num_channels: usize) -> Self {
        Self {
            observation: observation.into(),
            num_channels,
            hits: Vec::new(),
        }
    }

    pub fn num_hits(&self) -> usize {
        self.hits.len()
    }

    /// Serialize to pretty-printed JSON. Field order is fixed by the struct
    /// definition, so output is deterministic.
    pub fn to_json(&self) -> Result<String, WriteError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the document to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<(), WriteError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Load a previously saved document.
    pub fn load(path: &Path) -> Result<Self, WriteError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_list() -> HitList {
        let mut list = HitList::new("guppi_58000_0001", 4);
        list.hits.push(Hit::new(100, 150, 2, 3, 15.2, 64));
        list.hits.push(Hit::new(400, 410, 0, 0, 11.0, 16));
        list
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obs.hits.json");

        let list = sample_list();
        list.save(&path).unwrap();
        let back = HitList::load(&path).unwrap();
        assert_eq!(list, back);
    }

    #[test]
    fn test_deterministic_json() {
        let a = sample_list().to_json().unwrap();
        let b = sample_list().to_json().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does_not_exist.json");
        assert!(HitList::load(&path).is_err());
    }
}
