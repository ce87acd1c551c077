//! Metadata document rendering.
//!
//! Templates are plain cloud-init documents (`meta-data`, `network-config`).
//! Rendering is a single pass over lines; only these shapes are touched:
//!
//! | Line                               | Rewritten to                          |
//! |------------------------------------|---------------------------------------|
//! | `instance-id: ...`                 | `instance-id: <instance id>`          |
//! | `local-hostname: ...`              | `local-hostname: <display hostname>`  |
//! | `hostname: ...`                    | `hostname: <display hostname><suffix>`|
//! | `addresses: [<ip>/<prefix>, ...]`  | every `<ip>` replaced, prefix kept    |
//!
//! Indentation and line endings are preserved. Every other line passes
//! through untouched, and a template missing one of the shapes simply
//! renders without that substitution.
//!
//! # Example
//!
//! ```ignore
//! let vars = MetadataVars::new(&assignment)
//!     .with_display_hostname(Some("control-00"))
//!     .with_domain_suffix(Some(".home.arpa"));
//! let document = vars.render(template);
//! ```

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::identity::Assignment;

/// `<dotted quad>/<prefix length>`; the prefix is captured to be kept.
static CIDR_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[0-9]{1,3}\.){3}[0-9]{1,3}(/[0-9]{1,3})").expect("static regex")
});

const INSTANCE_ID_KEY: &str = "instance-id:";
const LOCAL_HOSTNAME_KEY: &str = "local-hostname:";
const HOSTNAME_KEY: &str = "hostname:";
const ADDRESSES_KEY: &str = "addresses:";

/// Values substituted into a metadata template.
#[derive(Debug, Clone, Copy)]
pub struct MetadataVars<'a> {
    instance_id: &'a str,
    hostname: &'a str,
    ip_address: &'a str,
    display_hostname: Option<&'a str>,
    domain_suffix: Option<&'a str>,
}

impl<'a> MetadataVars<'a> {
    pub fn new(assignment: &'a Assignment) -> Self {
        Self {
            instance_id: &assignment.instance_id,
            hostname: &assignment.hostname,
            ip_address: &assignment.ip_address,
            display_hostname: None,
            domain_suffix: None,
        }
    }

    /// Show this name instead of the stored hostname (e.g. a VM name taken
    /// from the request path). The stored assignment is not affected.
    pub fn with_display_hostname(mut self, name: Option<&'a str>) -> Self {
        self.display_hostname = name;
        self
    }

    /// Suffix appended to the `hostname:` line only, e.g. `.home.arpa`.
    pub fn with_domain_suffix(mut self, suffix: Option<&'a str>) -> Self {
        self.domain_suffix = suffix;
        self
    }

    fn display_hostname(&self) -> &'a str {
        self.display_hostname.unwrap_or(self.hostname)
    }

    /// Render `template`, substituting the recognised lines.
    pub fn render(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len() + 64);
        for line in template.split_inclusive('\n') {
            let (body, ending) = split_line_ending(line);
            match self.rewrite(body) {
                Some(rewritten) => out.push_str(&rewritten),
                None => out.push_str(body),
            }
            out.push_str(ending);
        }
        out
    }

    /// New content for a recognised line, `None` to pass it through.
    fn rewrite(&self, line: &str) -> Option<String> {
        let content = line.trim_start();
        let indent = &line[..line.len() - content.len()];

        if content.starts_with(INSTANCE_ID_KEY) {
            return Some(format!("{indent}{INSTANCE_ID_KEY} {}", self.instance_id));
        }
        if content.starts_with(LOCAL_HOSTNAME_KEY) {
            return Some(format!(
                "{indent}{LOCAL_HOSTNAME_KEY} {}",
                self.display_hostname()
            ));
        }
        if content.starts_with(HOSTNAME_KEY) {
            return Some(format!(
                "{indent}{HOSTNAME_KEY} {}{}",
                self.display_hostname(),
                self.domain_suffix.unwrap_or_default()
            ));
        }
        self.rewrite_addresses(indent, content)
    }

    /// Replace the dotted quads of an `addresses: [ ... ]` line.
    fn rewrite_addresses(&self, indent: &str, content: &str) -> Option<String> {
        let tail = content.strip_prefix(ADDRESSES_KEY)?;
        if !tail.trim_start().starts_with('[') || !CIDR_ADDRESS.is_match(tail) {
            return None;
        }

        let replaced = CIDR_ADDRESS.replace_all(tail, |caps: &Captures| {
            format!("{}{}", self.ip_address, &caps[1])
        });
        Some(format!("{indent}{ADDRESSES_KEY}{replaced}"))
    }
}

/// Split a line from `split_inclusive('\n')` into body and terminator.
fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

/// Render a metadata document for `assignment`.
pub fn render_metadata(
    template: &str,
    assignment: &Assignment,
    display_hostname: Option<&str>,
    domain_suffix: Option<&str>,
) -> String {
    MetadataVars::new(assignment)
        .with_display_hostname(display_hostname)
        .with_domain_suffix(domain_suffix)
        .render(template)
}
