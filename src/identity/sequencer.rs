//! Persisted monotonic hostname counter.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::StateError;
use crate::utils::persist::write_atomic;

/// Hands out hostname suffixes, one per new assignment.
///
/// The counter only ever grows. It lives in its own file, separate from the
/// assignment map, so the two may drift (e.g. after an operator removes an
/// assignment by hand); suffixes are still never reused.
#[derive(Debug)]
pub struct HostnameSequencer {
    path: PathBuf,
    value: u64,
}

impl HostnameSequencer {
    /// Read the counter file at `path`.
    ///
    /// A missing file starts at 0. Unparsable content is logged and also
    /// starts at 0; this never fails.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let value = match fs::read_to_string(&path) {
            Ok(content) => parse_counter(&content).unwrap_or_else(|| {
                crate::log!("warn"; "hostname counter `{}` is not a number, starting at 0", path.display());
                0
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => 0,
            Err(e) => {
                crate::log!("warn"; "cannot read hostname counter `{}`: {}, starting at 0", path.display(), e);
                0
            }
        };

        crate::debug!("identity"; "hostname counter starts at {}", value);
        Self { path, value }
    }

    /// Return the current value and advance the counter.
    ///
    /// Call [`persist`](Self::persist) before exposing a hostname built from
    /// the returned index. At `u64::MAX` the counter stops advancing.
    pub fn next(&mut self) -> u64 {
        let index = self.value;
        match self.value.checked_add(1) {
            Some(next) => self.value = next,
            None => {
                crate::log!("warn"; "hostname counter `{}` is exhausted, suffix {} will repeat", self.path.display(), index);
            }
        }
        index
    }

    /// Value the next call to [`next`](Self::next) returns.
    pub fn peek(&self) -> u64 {
        self.value
    }

    /// Overwrite the counter file with the current value.
    pub fn persist(&self) -> Result<(), StateError> {
        write_atomic(&self.path, self.value.to_string().as_bytes())
            .map_err(|e| StateError::Io(self.path.clone(), e))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse_counter(content: &str) -> Option<u64> {
    content.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_starts_at_zero() {
        let dir = TempDir::new().unwrap();
        let sequencer = HostnameSequencer::load(dir.path().join("counter"));
        assert_eq!(sequencer.peek(), 0);
    }

    #[test]
    fn test_corrupt_counter_starts_at_zero() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counter");
        fs::write(&path, "not-a-number").unwrap();

        let sequencer = HostnameSequencer::load(&path);
        assert_eq!(sequencer.peek(), 0);
    }

    #[test]
    fn test_negative_counter_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counter");
        fs::write(&path, "-4").unwrap();

        assert_eq!(HostnameSequencer::load(&path).peek(), 0);
    }

    #[test]
    fn test_reads_existing_value() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counter");
        fs::write(&path, "17\n").unwrap();

        assert_eq!(HostnameSequencer::load(&path).peek(), 17);
    }

    #[test]
    fn test_next_returns_current_then_increments() {
        let dir = TempDir::new().unwrap();
        let mut sequencer = HostnameSequencer::load(dir.path().join("counter"));

        assert_eq!(sequencer.next(), 0);
        assert_eq!(sequencer.next(), 1);
        assert_eq!(sequencer.next(), 2);
        assert_eq!(sequencer.peek(), 3);
    }

    #[test]
    fn test_persist_round_trips_through_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counter");

        let mut sequencer = HostnameSequencer::load(&path);
        sequencer.next();
        sequencer.next();
        sequencer.persist().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "2");
        assert_eq!(HostnameSequencer::load(&path).peek(), 2);
    }

    #[test]
    fn test_persist_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("counter");

        let mut sequencer = HostnameSequencer::load(&path);
        sequencer.next();
        sequencer.persist().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "1");
    }

    #[test]
    fn test_exhausted_counter_stops_advancing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counter");
        fs::write(&path, "18446744073709551615").unwrap();

        let mut sequencer = HostnameSequencer::load(&path);
        assert_eq!(sequencer.next(), u64::MAX);
        assert_eq!(sequencer.peek(), u64::MAX);
        assert_eq!(sequencer.next(), u64::MAX);
    }
}
