//! Filesystem helpers shared by config, state and the server.

pub mod mime;
pub mod path;
pub mod persist;
