//! `[serve]` section configuration.
//!
//! Contains HTTP listener settings.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "0.0.0.0"   # Network interface (0.0.0.0 = all interfaces)
//! port = 8443             # Default: 443, or 80 when insecure
//! insecure = false        # Plain HTTP instead of HTTPS (not recommended)
//! workers = 4             # Request handler threads
//! ```

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

/// Default port for HTTPS.
pub const DEFAULT_TLS_PORT: u16 = 443;

/// Default port for plain HTTP.
pub const DEFAULT_PLAIN_PORT: u16 = 80;

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    pub interface: IpAddr,

    /// Port number. Unset means 443, or 80 when `insecure`.
    pub port: Option<u16>,

    /// Serve plain HTTP. Without it TLS material is mandatory.
    pub insecure: bool,

    /// Size of the request handler thread pool.
    pub workers: usize,
}

impl ServeConfig {
    /// Port actually bound.
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(if self.insecure {
            DEFAULT_PLAIN_PORT
        } else {
            DEFAULT_TLS_PORT
        })
    }

    /// Scheme matching the `insecure` flag.
    pub const fn scheme(&self) -> &'static str {
        if self.insecure { "http" } else { "https" }
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: None,
            insecure: false,
            workers: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    use crate::config::test_parse_config;

    #[test]
    fn test_serve_config() {
        let config = test_parse_config(
            "[serve]\ninterface = \"127.0.0.1\"\nport = 8080\ninsecure = true\nworkers = 2",
        );

        assert_eq!(
            config.serve.interface,
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
        );
        assert_eq!(config.serve.effective_port(), 8080);
        assert!(config.serve.insecure);
        assert_eq!(config.serve.workers, 2);
    }

    #[test]
    fn test_serve_config_defaults() {
        let config = test_parse_config("");

        assert_eq!(config.serve.interface, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.serve.port, None);
        assert!(!config.serve.insecure);
        assert_eq!(config.serve.workers, 4);
    }

    #[test]
    fn test_default_port_follows_insecure() {
        let secure = test_parse_config("");
        assert_eq!(secure.serve.effective_port(), 443);
        assert_eq!(secure.serve.scheme(), "https");

        let insecure = test_parse_config("[serve]\ninsecure = true");
        assert_eq!(insecure.serve.effective_port(), 80);
        assert_eq!(insecure.serve.scheme(), "http");
    }

    #[test]
    fn test_serve_config_ipv6_interface() {
        let config = test_parse_config("[serve]\ninterface = \"::1\"");
        assert_eq!(
            config.serve.interface,
            IpAddr::V6(Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 1))
        );
    }
}
