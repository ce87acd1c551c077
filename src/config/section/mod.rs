//! Configuration section definitions.
//!
//! Each module corresponds to a section in `provision.toml`:
//!
//! | Module    | TOML Section            | Purpose                          |
//! |-----------|-------------------------|----------------------------------|
//! | `serve`   | `[serve]`               | Listener (interface, port, TLS)  |
//! | `tls`     | `[tls]`                 | Certificate and key files        |
//! | `content` | `[content]`, `[render]` | Templates, domain suffix         |
//! | `state`   | `[state]`               | Persisted identity state files   |

mod content;
mod serve;
mod state;
mod tls;

pub use content::{ContentConfig, RenderConfig};
pub use serve::ServeConfig;
pub use state::StateConfig;
pub use tls::{TlsConfig, TlsMaterial};
