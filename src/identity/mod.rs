//! Identity assignment and address allocation.
//!
//! Maps an opaque client identifier to a persisted, idempotent
//! `(instance_id, hostname, ip_address)` triple.
//!
//! # Module Structure
//!
//! ```text
//! identity/
//! ├── address    # Pure address allocation (sequential + legacy role pools)
//! ├── sequencer  # Persisted monotonic hostname counter
//! ├── store      # Persisted client identifier -> assignment map
//! ├── audit      # Append-only log of created assignments
//! └── resolver   # Get-or-create orchestration (the public entry point)
//! ```
//!
//! # Data Flow
//!
//! ```text
//! client id ─► Resolver ─► Store hit ──────────────────────────────► Assignment
//!                  │
//!                  └─► miss ─► Sequencer.next + persist
//!                            ─► hostname / address / uuid
//!                            ─► Store.put ─► audit line ─────────► Assignment
//! ```

pub mod address;
mod audit;
mod resolver;
mod sequencer;
mod store;

pub use audit::AuditLog;
pub use resolver::AssignmentResolver;
pub use sequencer::HostnameSequencer;
pub use store::AssignmentStore;

use std::path::PathBuf;

use thiserror::Error;

/// Prefix of every hostname handed out to a new assignment.
pub const HOSTNAME_PREFIX: &str = "server-";

/// A stable identity for one client identifier.
///
/// All three fields are assigned once and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub instance_id: String,
    pub hostname: String,
    pub ip_address: String,
}

impl Assignment {
    pub fn new(
        instance_id: impl Into<String>,
        hostname: impl Into<String>,
        ip_address: impl Into<String>,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            hostname: hostname.into(),
            ip_address: ip_address.into(),
        }
    }
}

/// Hostname for a sequencer index: `server-NN`, zero-padded to two digits.
pub fn hostname_for_index(index: u64) -> String {
    format!("{HOSTNAME_PREFIX}{index:02}")
}

/// Errors raised while reading or writing persisted identity state.
///
/// These never reach the request path: callers log them and carry on with
/// the in-memory state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("IO error on `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("malformed JSON in `{0}`")]
    Json(PathBuf, #[source] serde_json::Error),
}
