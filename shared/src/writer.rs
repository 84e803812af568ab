//! Hit persistence boundary.
//!
//! The scanner hands closed hits to a [`HitWriter`] in emission order and
//! calls [`HitWriter::finish`] exactly once at the end of a successful scan.
//! Writers must not reorder or drop hits, and an observation that is aborted
//! mid-scan must leave no output at all. [`JsonHitWriter`] achieves the
//! latter by buffering the whole document and only touching the filesystem
//! in `finish`.

use std::path::PathBuf;

use thiserror::Error;

use crate::hit::Hit;
use crate::hit_list::HitList;

/// Errors from hit persistence.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("hit out of order: time_end {actual} after {previous}")]
    OutOfOrder { previous: usize, actual: usize },
    #[error("writer already finished")]
    AlreadyFinished,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Sink for closed hits from one observation.
pub trait HitWriter {
    /// Append one hit. Hits must arrive with nondecreasing `time_end`.
    fn push(&mut self, hit: Hit) -> Result<(), WriteError>;

    /// Commit the output. Called once, only after a complete scan.
    fn finish(&mut self) -> Result<(), WriteError>;

    /// Number of hits pushed so far.
    fn num_hits(&self) -> usize;
}

/// Checks the nondecreasing-`time_end` contract shared by all writers.
fn check_order(last: Option<usize>, hit: &Hit) -> Result<(), WriteError> {
    if let Some(previous) = last {
        if hit.time_end < previous {
            return Err(WriteError::OutOfOrder {
                previous,
                actual: hit.time_end,
            });
        }
    }
    Ok(())
}

/// Writes a [`HitList`] JSON document when the scan completes.
pub struct JsonHitWriter {
    path: PathBuf,
    list: HitList,
    last_time_end: Option<usize>,
    finished: bool,
}

impl JsonHitWriter {
    pub fn new(path: PathBuf, observation: impl Into<String>, num_channels: usize) -> Self {
        Self {
            path,
            list: HitList::new(observation, num_channels),
            last_time_end: None,
            finished: false,
        }
    }
}

impl HitWriter for JsonHitWriter {
    fn push(&mut self, hit: Hit) -> Result<(), WriteError> {
        if self.finished {
            return Err(WriteError::AlreadyFinished);
        }
        check_order(self.last_time_end, &hit)?;
        self.last_time_end = Some(hit.time_end);
        self.list.hits.push(hit);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), WriteError> {
        if self.finished {
            return Err(WriteError::AlreadyFinished);
        }
        self.finished = true;
        self.list.save(&self.path)?;
        log::debug!(
            "wrote {} hits for {} to {}",
            self.list.num_hits(),
            self.list.observation,
            self.path.display()
        );
        Ok(())
    }

    fn num_hits(&self) -> usize {
        self.list.num_hits()
    }
}

/// In-memory writer for tests and summaries.
#[derive(Debug, Default)]
pub struct MemoryHitWriter {
    pub hits: Vec<Hit>,
    last_time_end: Option<usize>,
    pub finished: bool,
}

impl MemoryHitWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HitWriter for MemoryHitWriter {
    fn push(&mut self, hit: Hit) -> Result<(), WriteError> {
        if self.finished {
            return Err(WriteError::AlreadyFinished);
        }
        check_order(self.last_time_end, &hit)?;
        self.last_time_end = Some(hit.time_end);
        self.hits.push(hit);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), WriteError> {
        if self.finished {
            return Err(WriteError::AlreadyFinished);
        }
        self.finished = true;
        Ok(())
    }

    fn num_hits(&self) -> usize {
        self.hits.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_writer_accepts_ordered_hits() {
        let mut writer = MemoryHitWriter::new();
        writer.push(Hit::new(0, 10, 1, 1, 12.0, 16)).unwrap();
        writer.push(Hit::new(5, 10, 3, 3, 11.0, 16)).unwrap();
        writer.push(Hit::new(20, 30, 0, 0, 13.0, 64)).unwrap();
        writer.finish().unwrap();
        assert_eq!(writer.num_hits(), 3);
        assert!(writer.finished);
    }

    #[test]
    fn test_memory_writer_rejects_out_of_order() {
        let mut writer = MemoryHitWriter::new();
        writer.push(Hit::new(0, 30, 1, 1, 12.0, 16)).unwrap();
        let err = writer.push(Hit::new(5, 10, 3, 3, 11.0, 16)).unwrap_err();
        assert!(matches!(
            err,
            WriteError::OutOfOrder {
                previous: 30,
                actual: 10
            }
        ));
    }

    #[test]
    fn test_push_after_finish_fails() {
        let mut writer = MemoryHitWriter::new();
        writer.finish().unwrap();
        assert!(matches!(
            writer.push(Hit::new(0, 1, 0, 0, 10.0, 16)),
            Err(WriteError::AlreadyFinished)
        ));
    }

    #[test]
    fn test_json_writer_complete_or_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obs.hits.json");

        // Without finish, nothing is written.
        {
            let mut writer = JsonHitWriter::new(path.clone(), "obs", 4);
            writer.push(Hit::new(0, 10, 1, 1, 12.0, 16)).unwrap();
        }
        assert!(!path.exists());

        // With finish, the whole document appears.
        let mut writer = JsonHitWriter::new(path.clone(), "obs", 4);
        writer.push(Hit::new(0, 10, 1, 1, 12.0, 16)).unwrap();
        writer.finish().unwrap();
        let list = HitList::load(&path).unwrap();
        assert_eq!(list.num_hits(), 1);
        assert_eq!(list.observation, "obs");
        assert_eq!(list.num_channels, 4);
    }
}
