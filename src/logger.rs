//! Logging utilities with colored output.
//!
//! This module provides:
//! - `log!` macro for timestamped terminal output with colored prefixes
//! - `debug!` macro, only printed with `--verbose`
//!
//! # Example
//!
//! ```ignore
//! log!("serve"; "https://{}", addr);
//! log!("warn"; "counter file is not a number, starting at 0");
//! debug!("identity"; "loaded {} assignments", count);
//! ```
//!
//! Messages logged under `error` go to stderr, everything else to stdout.

use chrono::{SecondsFormat, Utc};
use owo_colors::{OwoColorize, Stream};
use std::{
    io::{Write, stderr, stdout},
    sync::atomic::{AtomicBool, Ordering},
};

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when --verbose is enabled)
///
/// # Usage
/// ```ignore
/// debug!("module"; "debug info: {}", value);
/// ```
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a timestamp and colored module prefix
#[inline]
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let stream = stream_for(&module_lower);
    let prefix = colorize_prefix(module, &module_lower, stream);
    let timestamp = now()
        .if_supports_color(stream, |t| t.dimmed())
        .to_string();

    // Write failures are ignored: there is nowhere left to report them.
    if matches!(stream, Stream::Stderr) {
        let mut stderr = stderr().lock();
        writeln!(stderr, "{timestamp} {prefix} {message}").ok();
        stderr.flush().ok();
    } else {
        let mut stdout = stdout().lock();
        writeln!(stdout, "{timestamp} {prefix} {message}").ok();
        stdout.flush().ok();
    }
}

fn stream_for(module_lower: &str) -> Stream {
    if module_lower == "error" {
        Stream::Stderr
    } else {
        Stream::Stdout
    }
}

/// Apply color to a module prefix based on module type.
///
/// Colors are dropped when `stream` is not a terminal or `--color never`
/// is in effect.
#[inline]
fn colorize_prefix(module: &str, module_lower: &str, stream: Stream) -> String {
    let prefix = format!("[{module}]");
    let styled = prefix.if_supports_color(stream, |p| match module_lower {
        "serve" | "request" => p.bright_blue().bold().to_string(),
        "identity" => p.bright_green().bold().to_string(),
        "error" => p.bright_red().bold().to_string(),
        "warn" => p.yellow().bold().to_string(),
        _ => p.bright_yellow().bold().to_string(),
    });
    styled.to_string()
}

/// Current UTC time, ISO-8601 with milliseconds.
fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ============================================================================
// Tests
// ============================================================================
