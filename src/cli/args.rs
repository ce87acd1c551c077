//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// cloud-init metadata service with stable instance identities
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: provision.toml, optional)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve cloud-init documents over HTTP(S)
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        common: CommonArgs,

        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Serve plain HTTP instead of HTTPS (not recommended)
        #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        insecure: Option<bool>,
    },

    /// Print the persisted assignments as JSON
    #[command(visible_alias = "a")]
    Assignments {
        #[command(flatten)]
        common: CommonArgs,
    },
}

/// Arguments shared by every subcommand
#[derive(clap::Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Template directory (meta-data, network-config, user-data, vendor-data)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub content: Option<PathBuf>,

    /// Directory holding the persisted state (default: content directory)
    #[arg(short = 's', long = "state-dir", value_hint = clap::ValueHint::DirPath)]
    pub state_dir: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}
