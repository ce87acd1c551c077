//! Route dispatch: static files, raw documents and rendered metadata.

use super::path::resolve_path;
use super::route::{DocumentRequest, Route};
use crate::config::ServiceConfig;
use crate::identity::{
    AssignmentResolver, AssignmentStore, AuditLog, HostnameSequencer, hostname_for_index,
};
use crate::render::render_metadata;
use crate::utils::mime::{self, types::PLAIN};
use anyhow::{Context, Result};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

/// A response ready to be written by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn ok(content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type,
            body: body.into(),
        }
    }

    pub fn plain(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: PLAIN,
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn not_found() -> Self {
        Self::plain(404, "404 Not Found")
    }
}

/// Everything a request needs, built once at startup and shared by the
/// request threads.
#[derive(Debug)]
pub struct ProvisionService {
    resolver: AssignmentResolver,
    content_dir: PathBuf,
    domain_suffix: Option<String>,
}

impl ProvisionService {
    pub fn new(
        resolver: AssignmentResolver,
        content_dir: impl Into<PathBuf>,
        domain_suffix: Option<String>,
    ) -> Self {
        Self {
            resolver,
            content_dir: content_dir.into(),
            domain_suffix,
        }
    }

    /// Load persisted state and assemble the service from config.
    pub fn from_config(config: &ServiceConfig) -> Self {
        let state = &config.state;
        let store = AssignmentStore::load(state.assignments_path());
        let sequencer = HostnameSequencer::load(state.counter_path());
        let audit = AuditLog::new(state.audit_log_path());

        if store.is_empty() {
            crate::log!("identity"; "no assignments yet, state in {}", state.dir().display());
        } else {
            crate::log!(
                "identity";
                "{} known assignment(s), next hostname {}",
                store.len(),
                hostname_for_index(sequencer.peek())
            );
        }
        crate::debug!("identity"; "counter {}, audit log {}", sequencer.path().display(), audit.path().display());

        let resolver = AssignmentResolver::new(store, sequencer, audit);

        Self::new(
            resolver,
            &config.content.dir,
            config.render.domain_suffix().map(str::to_owned),
        )
    }

    pub fn resolver(&self) -> &AssignmentResolver {
        &self.resolver
    }

    /// Produce the reply for a route.
    pub fn respond(&self, route: &Route) -> Result<Reply> {
        match route {
            Route::Static(relative) => self.respond_static(relative),
            Route::Document(request) => self.respond_document(request),
            Route::UnknownClient => Ok(Reply::plain(400, "400 Bad Request: unknown client address")),
            Route::NotFound => Ok(Reply::not_found()),
        }
    }

    fn respond_static(&self, relative: &str) -> Result<Reply> {
        let Some(path) = resolve_path(relative, &self.content_dir) else {
            return Ok(Reply::not_found());
        };
        let body = fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Reply::ok(mime::from_path(&path), body))
    }

    fn respond_document(&self, request: &DocumentRequest) -> Result<Reply> {
        let path = self.content_dir.join(request.document.file_name());
        let Some(template) = read_optional(&path)? else {
            crate::debug!("serve"; "no {} in {}", request.document.file_name(), self.content_dir.display());
            return Ok(Reply::not_found());
        };

        if !request.document.is_rendered() {
            return Ok(Reply::ok(PLAIN, template));
        }

        let assignment = self.resolver.get_or_create(&request.client_id);
        let suffix = if request.with_domain_suffix {
            self.domain_suffix.as_deref()
        } else {
            None
        };
        let document = render_metadata(
            &template,
            &assignment,
            request.display_hostname.as_deref(),
            suffix,
        );
        Ok(Reply::ok(PLAIN, document))
    }
}

/// Read a text file, `None` if it does not exist.
fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}
