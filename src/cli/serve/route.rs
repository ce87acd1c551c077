//! URL routing.
//!
//! Every route boils down to a client identifier plus a document; the
//! identity core never sees the URL.
//!
//! | Path                                         | Client identifier       |
//! |----------------------------------------------|-------------------------|
//! | `/cloud-init/v1/<file>`                      | none, static file       |
//! | `/cloud-init/v2/<doc>`                       | remote IP               |
//! | `/cloud-init/v2/<generation>/<uuid>/<doc>`   | `<generation>:<uuid>`   |
//! | `/cloud-init/v3/<generation>/<name>/<doc>`   | `<generation>:<name>`   |
//!
//! Only v3 shows the VM name from the path (and the domain suffix) in the
//! rendered document. The stored hostname is never derived from it.

use std::net::IpAddr;

use percent_encoding::percent_decode_str;

/// Common prefix of every route.
const ROUTE_ROOT: &str = "cloud-init";

/// A cloud-init document served per client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Document {
    MetaData,
    NetworkConfig,
    UserData,
    VendorData,
}

impl Document {
    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "meta-data" => Some(Self::MetaData),
            "network-config" => Some(Self::NetworkConfig),
            "user-data" => Some(Self::UserData),
            "vendor-data" => Some(Self::VendorData),
            _ => None,
        }
    }

    /// Template (or raw document) file name in the content dir.
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::MetaData => "meta-data",
            Self::NetworkConfig => "network-config",
            Self::UserData => "user-data",
            Self::VendorData => "vendor-data",
        }
    }

    /// Rendered through the identity core, as opposed to served raw.
    pub const fn is_rendered(self) -> bool {
        matches!(self, Self::MetaData | Self::NetworkConfig)
    }
}

/// A per-client document request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRequest {
    pub document: Document,
    pub client_id: String,
    /// Name shown instead of the stored hostname.
    pub display_hostname: Option<String>,
    /// Whether the configured domain suffix applies.
    pub with_domain_suffix: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Static file, relative to the content dir.
    Static(String),
    Document(DocumentRequest),
    /// IP-keyed route without a known peer address.
    UnknownClient,
    NotFound,
}

/// Map a request URL (and peer address) to a route.
pub fn parse_route(url: &str, remote: Option<IpAddr>) -> Route {
    let Some(segments) = decode_segments(url) else {
        return Route::NotFound;
    };
    let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

    match segments.as_slice() {
        [ROUTE_ROOT, "v1", rest @ ..] if !rest.is_empty() => {
            if rest.iter().any(|s| s.starts_with('.')) {
                return Route::NotFound;
            }
            Route::Static(rest.join("/"))
        }
        [ROUTE_ROOT, "v2", doc] => match (Document::from_segment(doc), remote) {
            (Some(document), Some(ip)) => Route::Document(DocumentRequest {
                document,
                client_id: ip.to_canonical().to_string(),
                display_hostname: None,
                with_domain_suffix: false,
            }),
            (Some(_), None) => Route::UnknownClient,
            (None, _) => Route::NotFound,
        },
        [ROUTE_ROOT, "v2", generation, uuid, doc] => {
            document_route(doc, generation, uuid, None, false)
        }
        [ROUTE_ROOT, "v3", generation, name, doc] => {
            document_route(doc, generation, name, Some(name), true)
        }
        _ => Route::NotFound,
    }
}

fn document_route(
    doc: &str,
    generation: &str,
    key: &str,
    display_hostname: Option<&str>,
    with_domain_suffix: bool,
) -> Route {
    match Document::from_segment(doc) {
        Some(document) => Route::Document(DocumentRequest {
            document,
            client_id: format!("{generation}:{key}"),
            display_hostname: display_hostname.map(str::to_owned),
            with_domain_suffix,
        }),
        None => Route::NotFound,
    }
}

/// Split the path (query dropped) into percent-decoded segments.
///
/// `None` if any segment is unusable: empty, `.`/`..`, an encoded `/`,
/// control characters or invalid UTF-8.
fn decode_segments(url: &str) -> Option<Vec<String>> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let path = path.strip_prefix('/').unwrap_or(path);

    path.split('/')
        .map(|raw| {
            let segment = percent_decode_str(raw).decode_utf8().ok()?;
            let valid = !segment.is_empty()
                && segment != "."
                && segment != ".."
                && !segment.contains(['/', '\\'])
                && !segment.chars().any(char::is_control);
            valid.then(|| segment.into_owned())
        })
        .collect()
}
