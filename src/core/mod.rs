//! Process-level state shared by the CLI and the server.

mod state;

pub use state::{is_shutdown, register_server, setup_shutdown_handler};
