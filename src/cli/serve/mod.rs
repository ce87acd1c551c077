//! cloud-init metadata server.
//!
//! Requests are parsed into a [`route::Route`], answered by the
//! [`ProvisionService`] and written back by [`response`].

mod dispatch;
mod lifecycle;
mod path;
mod response;
mod route;

pub use dispatch::ProvisionService;

use crate::{config::ServiceConfig, config::TlsMaterial, debug, log};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tiny_http::{Request, Server};

/// Per-process request counter, used to pair request and response log lines.
static REQUEST_ID: AtomicU64 = AtomicU64::new(0);

/// Bound server ready to accept requests
pub struct BoundServer {
    server: Arc<Server>,
    addr: SocketAddr,
    workers: usize,
}

/// Bind the server without starting the request loop.
///
/// `tls` must be present unless the config asks for plain HTTP.
pub fn bind_server(config: &ServiceConfig, tls: Option<TlsMaterial>) -> Result<BoundServer> {
    let addr = SocketAddr::new(config.serve.interface, config.serve.effective_port());
    let server = Arc::new(lifecycle::bind(addr, tls)?);
    lifecycle::register_server_for_shutdown(Arc::clone(&server));

    if config.serve.insecure {
        log!("warn"; "serving plain HTTP, instance identities travel unencrypted");
    }
    log!("serve"; "{}://{}", config.serve.scheme(), addr);
    debug!("serve"; "content in {}", config.content.dir.display());

    Ok(BoundServer {
        server,
        addr,
        workers: config.serve.workers,
    })
}

impl BoundServer {
    /// Get the bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start the request loop (blocking until shutdown).
    ///
    /// Returns once the server is unblocked and every request already
    /// handed to a worker has been answered.
    pub fn run(self, service: ProvisionService) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("provision-http-{i}"))
            .build()
            .context("failed to create request thread pool")?;
        let service = &service;

        // The accept loop stays on this thread so all workers serve requests.
        pool.in_place_scope(|scope| {
            for request in self.server.incoming_requests() {
                scope.spawn(move |_| {
                    if let Err(e) = handle_request(request, service) {
                        log!("serve"; "request error: {e:#}");
                    }
                });
            }
        });

        log!("serve"; "stopped, {} assignment(s) on record", service.resolver().len());
        Ok(())
    }
}

/// Handle a single HTTP request
fn handle_request(request: Request, service: &ProvisionService) -> Result<()> {
    if crate::core::is_shutdown() {
        return response::respond_unavailable(request);
    }

    let id = REQUEST_ID.fetch_add(1, Ordering::Relaxed);
    let remote = request.remote_addr().map(SocketAddr::ip);
    log!(
        "request";
        "#{id} {} {} from {}",
        request.method(),
        request.url(),
        remote.map_or_else(|| "unknown".to_owned(), |ip| ip.to_string())
    );

    if !response::is_supported_method(request.method()) {
        log!("request"; "#{id} -> 405");
        return response::respond_method_not_allowed(request);
    }

    let route = route::parse_route(request.url(), remote);
    debug!("request"; "#{id} {:?}", route);

    match service.respond(&route) {
        Ok(reply) => {
            log!("request"; "#{id} -> {} ({} bytes)", reply.status, reply.body.len());
            response::respond_reply(request, reply)
        }
        Err(e) => {
            log!("error"; "#{id} {e:#}");
            response::respond_internal_error(request)
        }
    }
}
