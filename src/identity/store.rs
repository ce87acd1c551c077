//! Persisted client identifier -> assignment map.
//!
//! On disk the map is a single JSON object, rewritten in full on every change:
//!
//! ```json
//! {
//!   "10.0.0.23": {
//!     "instanceId": "5f0c6f1e-...",
//!     "hostname": "server-00",
//!     "ipAddress": "10.0.10.100"
//!   }
//! }
//! ```
//!
//! `ipAddress` is optional for records written by older releases. Those are
//! upgraded (backfilled) from their hostname, see
//! [`derive_from_hostname`](super::address::derive_from_hostname).

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use super::address::derive_from_hostname;
use super::{Assignment, StateError};
use crate::utils::persist::write_atomic;

/// One persisted record, as written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
struct Record {
    instance_id: String,
    hostname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    ip_address: Option<String>,
}

impl Record {
    /// Parse a single map entry. Entries without string `instanceId` and
    /// `hostname` are rejected; a blank or non-string `ipAddress` counts as
    /// missing.
    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let instance_id = obj.get("instanceId")?.as_str()?.to_owned();
        let hostname = obj.get("hostname")?.as_str()?.to_owned();
        let ip_address = obj
            .get("ipAddress")
            .and_then(Value::as_str)
            .filter(|ip| !ip.is_empty())
            .map(str::to_owned);

        Some(Self {
            instance_id,
            hostname,
            ip_address,
        })
    }

    /// Fill in a missing address. Returns `true` if the record changed.
    fn backfill(&mut self) -> bool {
        if self.ip_address.is_some() {
            return false;
        }
        self.ip_address = Some(derive_from_hostname(&self.hostname));
        true
    }

    fn to_assignment(&self) -> Option<Assignment> {
        let ip_address = self.ip_address.clone()?;
        Some(Assignment::new(
            self.instance_id.clone(),
            self.hostname.clone(),
            ip_address,
        ))
    }
}

impl From<Assignment> for Record {
    fn from(assignment: Assignment) -> Self {
        Self {
            instance_id: assignment.instance_id,
            hostname: assignment.hostname,
            ip_address: Some(assignment.ip_address),
        }
    }
}

/// Owner of the assignment map and its file.
///
/// The store never invents identities: a lookup miss goes back to the
/// [`AssignmentResolver`](super::AssignmentResolver), which builds a new
/// assignment and hands it to [`put`](Self::put).
#[derive(Debug)]
pub struct AssignmentStore {
    path: PathBuf,
    records: BTreeMap<String, Record>,
    /// The file is behind the in-memory map since the last failed write.
    dirty: bool,
}

impl AssignmentStore {
    /// Load the map at `path`.
    ///
    /// Never fails: a missing file starts empty, an unparsable one is logged
    /// and also starts empty. Malformed entries are skipped. If any entry had
    /// to be backfilled the upgraded map is written back once.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut store = Self {
            path,
            records: BTreeMap::new(),
            dirty: false,
        };

        let Some(entries) = store.read_entries() else {
            return store;
        };

        let mut upgraded = false;
        for (client_id, value) in &entries {
            let Some(mut record) = Record::from_value(value) else {
                crate::log!("warn"; "skipping malformed assignment for `{}`", client_id);
                continue;
            };
            if record.backfill() {
                crate::debug!("identity"; "backfilled {} -> {:?}", record.hostname, record.ip_address);
                upgraded = true;
            }
            store.records.insert(client_id.clone(), record);
        }

        crate::debug!("identity"; "loaded {} assignment(s) from {}", store.records.len(), store.path.display());

        if upgraded {
            crate::log!("identity"; "upgrading {} with backfilled addresses", store.path.display());
            store.persist_or_log();
        }
        store
    }

    /// Read the raw JSON object, or `None` if there is nothing usable.
    fn read_entries(&self) -> Option<Map<String, Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                crate::log!("warn"; "cannot read assignments `{}`: {}, starting empty", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(entries)) => Some(entries),
            Ok(_) => {
                crate::log!("warn"; "assignments `{}` is not a JSON object, starting empty", self.path.display());
                None
            }
            Err(e) => {
                crate::log!("warn"; "assignments `{}` is not valid JSON ({}), starting empty", self.path.display(), e);
                None
            }
        }
    }

    /// Look up the assignment for `client_id`.
    ///
    /// A record still missing its address is backfilled and persisted here,
    /// lazily, the same way [`load`](Self::load) does it. A hit also retries
    /// the write if an earlier one failed.
    pub fn get(&mut self, client_id: &str) -> Option<Assignment> {
        let record = self.records.get_mut(client_id)?;
        let changed = record.backfill();
        let assignment = record.to_assignment();

        if changed || self.dirty {
            self.persist_or_log();
        }
        assignment
    }

    /// Insert (or overwrite) an assignment and persist the whole map.
    ///
    /// A failed write is logged, not returned: the in-memory map stays
    /// authoritative and the next lookup hit or insert retries the write.
    pub fn put(&mut self, client_id: impl Into<String>, assignment: Assignment) {
        self.records.insert(client_id.into(), assignment.into());
        self.persist_or_log();
    }

    /// Write the full map, replacing the file.
    pub fn persist(&self) -> Result<(), StateError> {
        let json = self.to_json().map_err(|e| StateError::Json(self.path.clone(), e))?;
        write_atomic(&self.path, json.as_bytes()).map_err(|e| StateError::Io(self.path.clone(), e))
    }

    fn persist_or_log(&mut self) {
        match self.persist() {
            Ok(()) => {
                if self.dirty {
                    crate::log!("identity"; "assignments written to {} after earlier failure", self.path.display());
                }
                self.dirty = false;
            }
            Err(e) => {
                crate::log!("error"; "failed to persist assignments: {:#}", anyhow::Error::from(e));
                self.dirty = true;
            }
        }
    }

    /// The map rendered exactly as it is persisted.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_path(dir: &TempDir) -> PathBuf {
        dir.path().join(".meta-data-instance-assignments.json")
    }

    /// Name `write_atomic` uses for its temp file in this process.
    fn temp_path(path: &Path) -> PathBuf {
        let name = path.file_name().unwrap().to_string_lossy();
        path.with_file_name(format!("{name}.tmp-{}", std::process::id()))
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = AssignmentStore::load(store_path(&dir));

        assert!(store.is_empty());
        assert!(!store_path(&dir).exists());
    }

    #[test]
    fn test_unparsable_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        fs::write(&path, "{ this is not json").unwrap();

        let store = AssignmentStore::load(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn test_non_object_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        fs::write(&path, "[1, 2, 3]").unwrap();

        assert!(AssignmentStore::load(&path).is_empty());
    }

    #[test]
    fn test_load_keeps_complete_records() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        let original = r#"{"vm-a":{"instanceId":"id-a","hostname":"server-00","ipAddress":"10.0.10.100"}}"#;
        fs::write(&path, original).unwrap();

        let mut store = AssignmentStore::load(&path);

        assert_eq!(
            store.get("vm-a"),
            Some(Assignment::new("id-a", "server-00", "10.0.10.100"))
        );
        // Nothing to backfill, so the file is left alone.
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_load_skips_malformed_entries() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        fs::write(
            &path,
            r#"{
                "good": {"instanceId": "id-1", "hostname": "server-01", "ipAddress": "10.0.10.101"},
                "no-hostname": {"instanceId": "id-2"},
                "numeric-id": {"instanceId": 5, "hostname": "server-02"},
                "not-an-object": "server-03"
            }"#,
        )
        .unwrap();

        let mut store = AssignmentStore::load(&path);

        assert_eq!(store.len(), 1);
        assert!(store.get("good").is_some());
    }

    #[test]
    fn test_backfill_on_load_worker() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        fs::write(
            &path,
            r#"{"g1:worker-12":{"instanceId":"id-w","hostname":"worker-12"}}"#,
        )
        .unwrap();

        let mut store = AssignmentStore::load(&path);

        assert_eq!(
            store.get("g1:worker-12").unwrap().ip_address,
            "10.0.10.212"
        );

        // The upgrade is written back immediately.
        let persisted = read_json(&path);
        assert_eq!(persisted["g1:worker-12"]["ipAddress"], "10.0.10.212");
        assert_eq!(persisted["g1:worker-12"]["instanceId"], "id-w");
    }

    #[test]
    fn test_backfill_treats_blank_address_as_missing() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        fs::write(
            &path,
            r#"{
                "a": {"instanceId": "id-a", "hostname": "control-03", "ipAddress": ""},
                "b": {"instanceId": "id-b", "hostname": "server-05", "ipAddress": null}
            }"#,
        )
        .unwrap();

        let mut store = AssignmentStore::load(&path);

        assert_eq!(store.get("a").unwrap().ip_address, "10.0.10.103");
        assert_eq!(store.get("b").unwrap().ip_address, "10.0.10.105");
    }

    #[test]
    fn test_backfill_clamps_oversized_roles() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        fs::write(
            &path,
            r#"{
                "x": {"instanceId": "id-x", "hostname": "control-150"},
                "y": {"instanceId": "id-y", "hostname": "control-151"}
            }"#,
        )
        .unwrap();

        let mut store = AssignmentStore::load(&path);

        assert_eq!(store.get("x").unwrap().ip_address, "10.0.10.199");
        assert_eq!(store.get("y").unwrap().ip_address, "10.0.10.199");
    }

    #[test]
    fn test_lazy_backfill_on_get_persists() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        let mut store = AssignmentStore::load(&path);
        store.records.insert(
            "legacy".into(),
            Record {
                instance_id: "id-l".into(),
                hostname: "worker-01".into(),
                ip_address: None,
            },
        );

        let assignment = store.get("legacy").unwrap();

        assert_eq!(assignment.ip_address, "10.0.10.201");
        assert_eq!(read_json(&path)["legacy"]["ipAddress"], "10.0.10.201");
    }

    #[test]
    fn test_get_miss_returns_none() {
        let dir = TempDir::new().unwrap();
        let mut store = AssignmentStore::load(store_path(&dir));
        assert_eq!(store.get("unknown"), None);
    }

    #[test]
    fn test_put_persists_before_returning() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        let mut store = AssignmentStore::load(&path);

        store.put("vm", Assignment::new("id", "server-00", "10.0.10.100"));

        let persisted = read_json(&path);
        assert_eq!(persisted["vm"]["instanceId"], "id");
        assert_eq!(persisted["vm"]["hostname"], "server-00");
        assert_eq!(persisted["vm"]["ipAddress"], "10.0.10.100");
    }

    #[test]
    fn test_put_survives_reload() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        {
            let mut store = AssignmentStore::load(&path);
            store.put("vm-1", Assignment::new("id-1", "server-00", "10.0.10.100"));
            store.put("vm-2", Assignment::new("id-2", "server-01", "10.0.10.101"));
        }

        let mut reloaded = AssignmentStore::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("vm-2").unwrap().hostname, "server-01");
    }

    #[test]
    fn test_put_failure_keeps_memory_authoritative() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes every write fail.
        let path = store_path(&dir);
        fs::create_dir_all(&path).unwrap();

        let mut store = AssignmentStore::load(&path);
        store.put("vm", Assignment::new("id", "server-00", "10.0.10.100"));

        assert_eq!(store.get("vm").unwrap().instance_id, "id");
        assert!(store.persist().is_err());
    }

    #[test]
    fn test_failed_write_retried_on_next_get() {
        let dir = TempDir::new().unwrap();
        // A regular file where the state directory should be.
        let blocker = dir.path().join("state");
        fs::write(&blocker, "").unwrap();
        let path = blocker.join("assignments.json");

        let mut store = AssignmentStore::load(&path);
        store.put("vm", Assignment::new("id", "server-00", "10.0.10.100"));
        assert!(!path.exists());

        fs::remove_file(&blocker).unwrap();
        assert_eq!(store.get("vm").unwrap().instance_id, "id");

        assert_eq!(read_json(&path)["vm"]["instanceId"], "id");
    }

    #[test]
    fn test_failed_backfill_upgrade_retried_on_next_get() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        fs::write(&path, r#"{"g1:worker-03":{"instanceId":"id-w","hostname":"worker-03"}}"#).unwrap();
        // The temp sibling cannot be created while a directory holds its name.
        let tmp = temp_path(&path);
        fs::create_dir_all(&tmp).unwrap();

        let mut store = AssignmentStore::load(&path);
        assert!(read_json(&path)["g1:worker-03"].get("ipAddress").is_none());

        fs::remove_dir(&tmp).unwrap();
        store.get("g1:worker-03").unwrap();

        assert_eq!(read_json(&path)["g1:worker-03"]["ipAddress"], "10.0.10.203");
    }
}
