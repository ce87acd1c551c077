//! MIME type detection for files under the content directory.
//!
//! cloud-init documents (`meta-data`, `user-data`, ...) have no extension
//! and are served as plain text; everything unknown is binary.

use std::path::Path;

/// Common MIME type constants.
pub mod types {
    // Text
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const YAML: &str = "text/yaml; charset=utf-8";
    pub const JSON: &str = "application/json";
    pub const SHELL: &str = "text/x-shellscript; charset=utf-8";
    pub const PEM: &str = "application/x-pem-file";

    // Images and archives
    pub const ISO: &str = "application/x-iso9660-image";
    pub const GZIP: &str = "application/gzip";
    pub const XZ: &str = "application/x-xz";
    pub const TAR: &str = "application/x-tar";

    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Guess MIME type from file extension.
///
/// Returns a full MIME type string suitable for HTTP Content-Type header.
pub fn from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    from_extension(ext.as_deref())
}

/// Guess MIME type from file extension string.
pub fn from_extension(ext: Option<&str>) -> &'static str {
    match ext {
        None | Some("txt" | "cfg" | "conf" | "log") => types::PLAIN,
        Some("yaml" | "yml") => types::YAML,
        Some("json") => types::JSON,
        Some("sh") => types::SHELL,
        Some("pem" | "crt") => types::PEM,
        Some("iso") => types::ISO,
        Some("gz" | "tgz") => types::GZIP,
        Some("xz") => types::XZ,
        Some("tar") => types::TAR,
        _ => types::OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_from_path() {
        assert_eq!(from_path(&PathBuf::from("meta-data")), types::PLAIN);
        assert_eq!(from_path(&PathBuf::from("network-config")), types::PLAIN);
        assert_eq!(from_path(&PathBuf::from("cloud.cfg")), types::PLAIN);
        assert_eq!(from_path(&PathBuf::from("user-data.yaml")), types::YAML);
        assert_eq!(from_path(&PathBuf::from("bootstrap.sh")), types::SHELL);
        assert_eq!(from_path(&PathBuf::from("images/seed.ISO")), types::ISO);
        assert_eq!(from_path(&PathBuf::from("disk.qcow2")), types::OCTET_STREAM);
    }
}
