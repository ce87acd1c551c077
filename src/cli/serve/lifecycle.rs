//! Server lifecycle management.

use crate::{config::TlsMaterial, core::register_server};
use anyhow::{Result, anyhow};
use std::{net::SocketAddr, sync::Arc};
use tiny_http::{Server, SslConfig};

/// Bind the listener, over TLS when `tls` is given.
///
/// Binds exactly once: a busy port is a startup error, since clients are
/// configured with a fixed metadata URL.
pub fn bind(addr: SocketAddr, tls: Option<TlsMaterial>) -> Result<Server> {
    let scheme = if tls.is_some() { "https" } else { "http" };
    let bound = match tls {
        Some(material) => Server::https(
            addr,
            SslConfig {
                certificate: material.certificate,
                private_key: material.private_key,
            },
        ),
        None => Server::http(addr),
    };
    bound.map_err(|e| anyhow!("Failed to bind {scheme}://{addr}: {e}"))
}

/// Register server for graceful shutdown.
///
/// When Ctrl+C is pressed, the handler set up in main() unblocks the
/// server and the request loop returns.
pub fn register_server_for_shutdown(server: Arc<Server>) {
    register_server(server);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr, TcpListener};

    #[test]
    fn test_bind_plain_on_ephemeral_port() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        assert!(bind(addr, None).is_ok());
    }

    #[test]
    fn test_bind_busy_port_fails() {
        let taken = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let addr = taken.local_addr().unwrap();

        let Err(err) = bind(addr, None) else {
            panic!("bound a port that is already taken");
        };
        assert!(err.to_string().contains("Failed to bind http://"));
    }
}
