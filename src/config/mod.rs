//! Service configuration management for `provision.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── serve      # [serve]
//! │   ├── tls        # [tls]
//! │   ├── content    # [content], [render]
//! │   └── state      # [state]
//! ├── types/         # Utility types
//! │   └── error      # ConfigError
//! └── mod.rs         # ServiceConfig (this file)
//! ```
//!
//! # Precedence
//!
//! command-line flag > environment variable > `provision.toml` > default.
//!
//! The environment variables keep the names existing deployments export:
//!
//! | Variable                 | Effect                                   |
//! |--------------------------|------------------------------------------|
//! | `port`                   | `[serve] port` (ignored if not a number) |
//! | `insecure`               | `[serve] insecure`                       |
//! | `server_tls_certificate` | PEM certificate contents                 |
//! | `server_tls_private_key` | PEM private key contents                 |

pub mod section;
pub mod types;

pub use section::{ContentConfig, RenderConfig, ServeConfig, StateConfig, TlsConfig, TlsMaterial};
pub use types::ConfigError;

use crate::{
    cli::{Cli, Commands, CommonArgs},
    log,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "provision.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing provision.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Absolute path to the config file, if one was read (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Directory relative paths resolve against (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// HTTP listener settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// TLS certificate and key
    #[serde(default)]
    pub tls: TlsConfig,

    /// Template directory
    #[serde(default)]
    pub content: ContentConfig,

    /// Persisted identity state
    #[serde(default)]
    pub state: StateConfig,

    /// Metadata rendering
    #[serde(default)]
    pub render: RenderConfig,
}

impl ServiceConfig {
    /// Load configuration for a CLI invocation.
    ///
    /// A missing default `provision.toml` means built-in defaults; a missing
    /// file named with `--config` is an error.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;
        let (path, explicit) = match &cli.config {
            Some(path) => (cwd.join(path), true),
            None => (cwd.join(DEFAULT_CONFIG_FILE), false),
        };

        let mut config = if path.is_file() {
            let mut config = Self::from_path(&path)?;
            config.config_path = Some(crate::utils::path::normalize_path(&path));
            config
        } else if explicit {
            return Err(ConfigError::Io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
            )
            .into());
        } else {
            crate::debug!("config"; "no {} found, using defaults", DEFAULT_CONFIG_FILE);
            Self::default()
        };

        let root = config
            .config_path
            .as_deref()
            .and_then(Path::parent)
            .map_or(cwd, Path::to_path_buf);

        config.apply_env(|key| std::env::var(key).ok());
        config.apply_command_options(&cli.command);
        config.finalize(&root);
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from file path, warning about unknown fields.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            log!("warn"; "unknown fields in {}, ignoring: {}", path.display(), ignored.join(", "));
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    // ========================================================================
    // environment and cli configuration updates
    // ========================================================================

    /// Apply the environment variables existing deployments rely on.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(port) = var("port") {
            match port.trim().parse::<u16>() {
                Ok(port) => self.serve.port = Some(port),
                Err(_) => {
                    log!("warn"; "port `{}` from environment is not a number, ignoring", port);
                }
            }
        }

        if let Some(insecure) = var("insecure") {
            self.serve.insecure = parse_truthy(&insecure);
        }

        if let Some(pem) = var("server_tls_certificate") {
            self.tls.certificate_pem = Some(pem);
        }
        if let Some(pem) = var("server_tls_private_key") {
            self.tls.private_key_pem = Some(pem);
        }
    }

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, command: &Commands) {
        match command {
            Commands::Serve {
                common,
                interface,
                port,
                insecure,
            } => {
                self.apply_common_args(common);
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                if port.is_some() {
                    self.serve.port = *port;
                }
                Self::update_option(&mut self.serve.insecure, insecure.as_ref());
            }
            Commands::Assignments { common } => self.apply_common_args(common),
        }
    }

    fn apply_common_args(&mut self, args: &CommonArgs) {
        crate::logger::set_verbose(args.verbose);

        Self::update_option(&mut self.content.dir, args.content.as_ref());
        if let Some(dir) = &args.state_dir {
            self.state.dir = Some(dir.clone());
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    /// Resolve every path against `root`.
    fn finalize(&mut self, root: &Path) {
        self.root = crate::utils::path::normalize_path(root);
        self.content.normalize(&self.root);
        self.state.normalize(&self.root, &self.content.dir);
        self.tls.normalize(&self.root);
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serve.workers == 0 {
            return Err(ConfigError::Validation(
                "[serve] workers must be at least 1".into(),
            ));
        }
        for (field, name) in [
            ("counter_file", &self.state.counter_file),
            ("assignments_file", &self.state.assignments_file),
            ("audit_log", &self.state.audit_log),
        ] {
            if name.as_os_str().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "[state] {field} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// Interpret a flag value from the environment.
///
/// Anything non-empty except `false`/`0`/`no`/`off` enables it.
fn parse_truthy(value: &str) -> bool {
    let value = value.trim().to_ascii_lowercase();
    !matches!(value.as_str(), "" | "false" | "0" | "no" | "off")
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> ServiceConfig {
    let (parsed, ignored) = ServiceConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
