#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Logging primitives for the Ditto CLI workspace.
//!
//! Layout:
//! - `init.rs`: subscriber installation and logging configuration
//! - `lib.rs`: span helpers shared by command dispatch

mod init;

pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};

use tracing::Span;

/// Span wrapping one CLI invocation.
///
/// Every event emitted while the span is entered carries the command label
/// and the correlation id sent to Ditto, so client and server logs line up.
#[must_use]
pub fn command_span(command: &str, correlation_id: &str) -> Span {
    tracing::info_span!("command", command = %command, correlation_id = %correlation_id)
}
