//! Command-line interface module.

mod args;
pub mod assignments;
pub mod serve;

pub use args::{Cli, Commands, CommonArgs};
