//! Lifecycle banners on the supervisor's stdout.
//!
//! Banners are interleaved with the forwarded child output so whoever reads
//! the combined log can see when the wrapper connected, started the server
//! and declared it ready.

use std::fmt::Display;
use std::io::{self, Write};

use chrono::Utc;
use owo_colors::{OwoColorize, Stream};

/// Prefix marking lines written by the wrapper rather than the server.
pub const BANNER_PREFIX: &str = ">>>";

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Plain text of a banner line, without timestamp or color.
#[must_use]
pub fn banner_text(message: impl Display) -> String {
    format!("{BANNER_PREFIX} {message}")
}

/// Print a lifecycle banner.
pub fn banner(message: impl Display) {
    println!(
        "{} {}",
        timestamp().if_supports_color(Stream::Stdout, |t| t.dimmed()),
        banner_text(message).if_supports_color(Stream::Stdout, |t| t.cyan())
    );
    let _ = io::stdout().flush();
}

/// Print the readiness banner.
pub fn ready(trigger: &str) {
    println!(
        "{} {}",
        timestamp().if_supports_color(Stream::Stdout, |t| t.dimmed()),
        banner_text(format_args!("Moving to READY (trigger: {trigger})"))
            .if_supports_color(Stream::Stdout, |t| t.green())
    );
    let _ = io::stdout().flush();
}

/// Print the final banner on stderr before the supervisor exits.
pub fn fatal(cause: impl Display) {
    eprintln!(
        "{} {}",
        timestamp().if_supports_color(Stream::Stderr, |t| t.dimmed()),
        banner_text(cause).if_supports_color(Stream::Stderr, |t| t.red())
    );
    let _ = io::stderr().flush();
}
