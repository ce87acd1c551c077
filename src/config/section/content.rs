//! `[content]` and `[render]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [content]
//! dir = "content"           # meta-data, network-config, user-data, vendor-data
//!
//! [render]
//! domain_suffix = ".home.arpa"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Template and raw document directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Served as-is under `/cloud-init/v1/`, and the source of templates.
    pub dir: PathBuf,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            dir: "content".into(),
        }
    }
}

impl ContentConfig {
    pub(crate) fn normalize(&mut self, root: &Path) {
        self.dir = crate::utils::path::expand_path(&self.dir, root);
    }
}

/// Metadata rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Appended to the `hostname:` line of name-based requests.
    pub domain_suffix: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            domain_suffix: ".home.arpa".into(),
        }
    }
}

impl RenderConfig {
    /// `None` when configured empty.
    pub fn domain_suffix(&self) -> Option<&str> {
        Some(self.domain_suffix.as_str()).filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_content_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.content.dir, PathBuf::from("content"));
        assert_eq!(config.render.domain_suffix(), Some(".home.arpa"));
    }

    #[test]
    fn test_empty_domain_suffix_disables_it() {
        let config = test_parse_config("[render]\ndomain_suffix = \"\"");
        assert_eq!(config.render.domain_suffix(), None);
    }

    #[test]
    fn test_content_dir_override() {
        let config = test_parse_config("[content]\ndir = \"/srv/cloud-init\"");
        let mut content = config.content;
        content.normalize(Path::new("/elsewhere"));
        assert_eq!(content.dir, PathBuf::from("/srv/cloud-init"));
    }
}
