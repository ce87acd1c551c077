//! provision - cloud-init metadata service handing out stable instance
//! identities to booting VMs.

mod cli;
mod config;
mod core;
mod identity;
mod logger;
mod render;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands, serve::ProvisionService};
use config::ServiceConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = ServiceConfig::load(&cli)?;

    match &cli.command {
        Commands::Serve { .. } => serve(&config),
        Commands::Assignments { .. } => cli::assignments::print_assignments(&config),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

/// Check TLS, load persisted state, then serve until Ctrl+C.
fn serve(config: &ServiceConfig) -> Result<()> {
    let tls = if config.serve.insecure {
        None
    } else {
        match config.tls.load_material() {
            Ok(material) => Some(material),
            Err(e) => {
                log!("error"; "{:#}", anyhow::Error::from(e));
                log!("error"; "set server_tls_certificate/server_tls_private_key, configure [tls], or pass --insecure");
                std::process::exit(1);
            }
        }
    };

    let service = ProvisionService::from_config(config);
    let server = cli::serve::bind_server(config, tls)?;
    debug!("serve"; "listening on {}", server.addr());
    server.run(service)
}
