//! Get-or-create orchestration.

use parking_lot::Mutex;
use uuid::Uuid;

use super::address::sequential_address;
use super::{Assignment, AssignmentStore, AuditLog, HostnameSequencer, hostname_for_index};

/// State mutated by a creation: counter and map change together.
#[derive(Debug)]
struct Allocation {
    store: AssignmentStore,
    sequencer: HostnameSequencer,
}

/// The single entry point of the identity core.
///
/// Requests are handled on a thread pool, so the whole
/// `lookup → draw index → persist counter → build → store.put` sequence runs
/// under one lock. Without it two creations could draw the same counter
/// value.
#[derive(Debug)]
pub struct AssignmentResolver {
    allocation: Mutex<Allocation>,
    audit: AuditLog,
}

impl AssignmentResolver {
    pub fn new(store: AssignmentStore, sequencer: HostnameSequencer, audit: AuditLog) -> Self {
        Self {
            allocation: Mutex::new(Allocation { store, sequencer }),
            audit,
        }
    }

    /// Return the assignment for `client_id`, creating it on first sight.
    ///
    /// Never fails. Persistence problems are logged and the in-memory state
    /// keeps serving stable answers for the rest of the process.
    ///
    /// New assignments always get a `server-NN` hostname and a sequential
    /// address, whatever name the caller will display. Role-based addresses
    /// only ever come from backfilling legacy records.
    pub fn get_or_create(&self, client_id: &str) -> Assignment {
        let created = {
            let mut allocation = self.allocation.lock();
            if let Some(existing) = allocation.store.get(client_id) {
                return existing;
            }

            let index = allocation.sequencer.next();
            if let Err(e) = allocation.sequencer.persist() {
                crate::log!("error"; "failed to persist hostname counter: {:#}", anyhow::Error::from(e));
            }

            let assignment = Assignment::new(
                Uuid::new_v4().to_string(),
                hostname_for_index(index),
                sequential_address(index),
            );
            allocation.store.put(client_id, assignment.clone());
            assignment
        };

        crate::log!(
            "identity";
            "created {} ({}) instance-id={}",
            created.hostname, created.ip_address, created.instance_id
        );

        if let Err(e) = self.audit.record(&created) {
            crate::log!("warn"; "failed to write audit line: {:#}", anyhow::Error::from(e));
        }
        created
    }

    /// Persisted form of the current map (pretty JSON).
    #[cfg(test)]
    pub fn assignments_json(&self) -> serde_json::Result<String> {
        self.allocation.lock().store.to_json()
    }

    /// Number of known client identifiers.
    pub fn len(&self) -> usize {
        self.allocation.lock().store.len()
    }
}
