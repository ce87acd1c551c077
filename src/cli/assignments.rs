//! `assignments` command: dump the persisted identity map.

use crate::config::ServiceConfig;
use crate::identity::AssignmentStore;
use anyhow::{Context, Result};
use std::io::{Write, stdout};

/// Print the assignment map as pretty JSON.
///
/// Goes through the same tolerant load as the server, so legacy records
/// show (and are persisted with) their backfilled addresses.
pub fn print_assignments(config: &ServiceConfig) -> Result<()> {
    let store = AssignmentStore::load(config.state.assignments_path());
    let json = store
        .to_json()
        .context("Failed to serialize assignments")?;

    let mut out = stdout().lock();
    writeln!(out, "{json}")?;
    crate::debug!("identity"; "{} assignment(s) in {}", store.len(), store.path().display());
    Ok(())
}
