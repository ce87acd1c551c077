//! Route to filesystem path resolution.

use std::path::{Path, PathBuf};

/// Resolve a relative static path to a file under `serve_root`.
///
/// Returns `None` for anything that is not a regular file inside the root,
/// including symlinks pointing outside of it.
pub fn resolve_path(relative: &str, serve_root: &Path) -> Option<PathBuf> {
    // Reject paths with suspicious patterns early
    if relative.contains("..") || Path::new(relative).is_absolute() {
        return None;
    }

    let local = serve_root.join(relative);

    // Canonicalize to resolve symlinks and verify path is under serve_root
    let canonical = local.canonicalize().ok()?;
    let root_canonical = serve_root.canonicalize().ok()?;

    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    canonical.is_file().then_some(canonical)
}
