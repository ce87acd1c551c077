//! Address allocation.
//!
//! Pure functions, shared by the creation path and the legacy backfill path.
//!
//! Two allocation schemes exist:
//!
//! - **Sequential** (`10.0.10.<100 + index>`): every newly created assignment.
//!   Not clamped: beyond ~155 hosts the last octet leaves the valid range and
//!   nothing rejects it. Known scaling limit of the pool.
//! - **Role pools**: only used to backfill legacy records persisted without an
//!   address, whose hostname starts with a role tag (`control`, `worker`).
//!   This is a compatibility shim for old data, never an allocation policy
//!   for new records.

use std::sync::LazyLock;

use regex::Regex;

/// Network prefix shared by every pool.
const NETWORK_PREFIX: &str = "10.0.10";

/// First host octet of the sequential pool.
const SEQUENTIAL_START: u64 = 100;

/// Trailing run of ASCII digits in a hostname.
static TRAILING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+$").expect("static regex"));

/// A role-tagged address pool used for legacy hostnames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolePool {
    /// Hostname prefix selecting this pool.
    pub tag: &'static str,
    /// Host octet for suffix number 0.
    pub start: u64,
    /// Highest host octet the pool hands out.
    pub ceiling: u64,
}

pub const CONTROL_POOL: RolePool = RolePool {
    tag: "control",
    start: 100,
    ceiling: 199,
};

pub const WORKER_POOL: RolePool = RolePool {
    tag: "worker",
    start: 200,
    ceiling: 254,
};

const ROLE_POOLS: [RolePool; 2] = [CONTROL_POOL, WORKER_POOL];

/// Address for a freshly created assignment: `10.0.10.<100 + index>`.
pub fn sequential_address(index: u64) -> String {
    format!("{NETWORK_PREFIX}.{}", SEQUENTIAL_START.saturating_add(index))
}

/// Address inside a role pool: `10.0.10.<min(start + suffix, ceiling)>`.
///
/// Every suffix past the ceiling lands on the ceiling address, so oversized
/// roles collide there. Existing deployments depend on this.
pub fn role_address(prefix_start: u64, ceiling: u64, suffix_number: u64) -> String {
    let octet = prefix_start.saturating_add(suffix_number).min(ceiling);
    format!("{NETWORK_PREFIX}.{octet}")
}

/// Derive an address from a stored hostname (legacy backfill).
///
/// - no trailing digits (or too many to fit a `u64`): `sequential_address(0)`
/// - `control*` / `worker*`: the matching role pool
/// - anything else: trailing digits used as a sequential index
pub fn derive_from_hostname(hostname: &str) -> String {
    let Some(number) = trailing_number(hostname) else {
        return sequential_address(0);
    };

    match ROLE_POOLS.iter().find(|pool| hostname.starts_with(pool.tag)) {
        Some(pool) => role_address(pool.start, pool.ceiling, number),
        None => sequential_address(number),
    }
}

fn trailing_number(hostname: &str) -> Option<u64> {
    TRAILING_DIGITS
        .find(hostname)
        .and_then(|m| m.as_str().parse().ok())
}
