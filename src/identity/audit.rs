//! Append-only log of created assignments.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};

use super::{Assignment, StateError};
use crate::utils::persist::append_line;

/// One line per created assignment:
///
/// ```text
/// 2024-06-15T14:30:45.123Z instance-id=<id> hostname=<h> ip-address=<ip>
/// ```
///
/// Client identifiers are deliberately left out.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn record(&self, assignment: &Assignment) -> Result<(), StateError> {
        let line = format_line(Utc::now(), assignment);
        append_line(&self.path, &line).map_err(|e| StateError::Io(self.path.clone(), e))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn format_line(at: DateTime<Utc>, assignment: &Assignment) -> String {
    format!(
        "{} instance-id={} hostname={} ip-address={}",
        at.to_rfc3339_opts(SecondsFormat::Millis, true),
        assignment.instance_id,
        assignment.hostname,
        assignment.ip_address
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_format_line() {
        let at = Utc.with_ymd_and_hms(2024, 6, 15, 14, 30, 45).unwrap();
        let assignment = Assignment::new("abc", "server-04", "10.0.10.104");

        assert_eq!(
            format_line(at, &assignment),
            "2024-06-15T14:30:45.000Z instance-id=abc hostname=server-04 ip-address=10.0.10.104"
        );
    }

    #[test]
    fn test_record_appends() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::new(dir.path().join("generated-instances.log"));

        log.record(&Assignment::new("a", "server-00", "10.0.10.100"))
            .unwrap();
        log.record(&Assignment::new("b", "server-01", "10.0.10.101"))
            .unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("instance-id=a hostname=server-00 ip-address=10.0.10.100"));
        assert!(lines[1].ends_with("instance-id=b hostname=server-01 ip-address=10.0.10.101"));
    }

    #[test]
    fn test_record_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log-dir");
        fs::create_dir(&path).unwrap();

        let log = AuditLog::new(&path);
        assert!(log.record(&Assignment::new("a", "b", "c")).is_err());
    }
}
