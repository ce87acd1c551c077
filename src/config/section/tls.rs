//! `[tls]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [tls]
//! certificate_path = "~/.config/provision/cert.pem"
//! private_key_path = "~/.config/provision/key.pem"
//! ```
//!
//! The `server_tls_certificate` / `server_tls_private_key` environment
//! variables carry PEM contents directly and win over these paths.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Certificate and key sources for HTTPS.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// PEM certificate chain file.
    pub certificate_path: Option<PathBuf>,

    /// PEM private key file.
    pub private_key_path: Option<PathBuf>,

    /// PEM certificate contents (from the environment).
    #[serde(skip)]
    pub certificate_pem: Option<String>,

    /// PEM private key contents (from the environment).
    #[serde(skip)]
    pub private_key_pem: Option<String>,
}

/// Loaded certificate and key, PEM encoded.
pub struct TlsMaterial {
    pub certificate: Vec<u8>,
    pub private_key: Vec<u8>,
}

impl TlsConfig {
    /// Resolve both halves of the TLS material.
    ///
    /// Inline PEM contents take precedence over paths. Fails if either half
    /// is missing or unreadable.
    pub fn load_material(&self) -> Result<TlsMaterial, ConfigError> {
        let certificate = Self::resolve(
            "certificate",
            self.certificate_pem.as_deref(),
            self.certificate_path.as_deref(),
        )?;
        let private_key = Self::resolve(
            "private key",
            self.private_key_pem.as_deref(),
            self.private_key_path.as_deref(),
        )?;
        Ok(TlsMaterial {
            certificate,
            private_key,
        })
    }

    fn resolve(
        what: &'static str,
        inline: Option<&str>,
        path: Option<&Path>,
    ) -> Result<Vec<u8>, ConfigError> {
        if let Some(pem) = inline.filter(|pem| !pem.trim().is_empty()) {
            return Ok(pem.as_bytes().to_vec());
        }
        match path {
            Some(path) => fs::read(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e)),
            None => Err(ConfigError::MissingTls(what)),
        }
    }

    /// Expand `~` and resolve relative paths against `root`.
    pub(crate) fn normalize(&mut self, root: &Path) {
        for path in [&mut self.certificate_path, &mut self.private_key_path] {
            if let Some(p) = path.take() {
                *path = Some(crate::utils::path::expand_path(&p, root));
            }
        }
    }
}
