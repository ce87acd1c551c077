//! `[state]` section configuration.
//!
//! Location of the persisted identity state.
//!
//! # Example
//!
//! ```toml
//! [state]
//! dir = "/var/lib/provision"                            # Default: the content dir
//! counter_file = ".meta-data-hostname-counter"
//! assignments_file = ".meta-data-instance-assignments.json"
//! audit_log = "generated-instances.log"
//! ```
//!
//! File names are relative to `dir`. The defaults match the layout of
//! existing deployments, where state lives next to the templates.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Persisted state locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Directory holding the state files. Unset means the content dir.
    pub dir: Option<PathBuf>,

    /// Hostname counter (single base-10 integer).
    pub counter_file: PathBuf,

    /// Client identifier -> assignment map (JSON object).
    pub assignments_file: PathBuf,

    /// Append-only log of created assignments.
    pub audit_log: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: None,
            counter_file: ".meta-data-hostname-counter".into(),
            assignments_file: ".meta-data-instance-assignments.json".into(),
            audit_log: "generated-instances.log".into(),
        }
    }
}

impl StateConfig {
    /// State directory; only meaningful after config finalization.
    pub fn dir(&self) -> &Path {
        self.dir.as_deref().unwrap_or(Path::new(""))
    }

    pub fn counter_path(&self) -> PathBuf {
        self.dir().join(&self.counter_file)
    }

    pub fn assignments_path(&self) -> PathBuf {
        self.dir().join(&self.assignments_file)
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.dir().join(&self.audit_log)
    }

    /// Fill in and absolutize `dir`, defaulting to `content_dir`.
    pub(crate) fn normalize(&mut self, root: &Path, content_dir: &Path) {
        self.dir = Some(match self.dir.take() {
            Some(dir) => crate::utils::path::expand_path(&dir, root),
            None => content_dir.to_path_buf(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_state_defaults() {
        let config = test_parse_config("");

        assert_eq!(config.state.dir, None);
        assert_eq!(
            config.state.counter_file,
            PathBuf::from(".meta-data-hostname-counter")
        );
        assert_eq!(
            config.state.assignments_file,
            PathBuf::from(".meta-data-instance-assignments.json")
        );
        assert_eq!(config.state.audit_log, PathBuf::from("generated-instances.log"));
    }

    #[test]
    fn test_state_defaults_to_content_dir() {
        let mut state = StateConfig::default();
        state.normalize(Path::new("/srv"), Path::new("/srv/content"));

        assert_eq!(
            state.counter_path(),
            PathBuf::from("/srv/content/.meta-data-hostname-counter")
        );
    }

    #[test]
    fn test_state_dir_relative_to_root() {
        let config = test_parse_config("[state]\ndir = \"state\"\naudit_log = \"audit.log\"");
        let mut state = config.state;
        state.normalize(Path::new("/srv"), Path::new("/srv/content"));

        assert_eq!(state.audit_log_path(), PathBuf::from("/srv/state/audit.log"));
        assert_eq!(
            state.assignments_path(),
            PathBuf::from("/srv/state/.meta-data-instance-assignments.json")
        );
    }
}
