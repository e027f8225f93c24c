//! Logging and tracing utilities for providers.
//!
//! This module provides helpers for setting up structured logging using the
//! `tracing` ecosystem. All logs are written to **stderr** so they never mix
//! with protocol traffic a host transport may carry on stdout.
//!
//! # Quick Start
//!
//! ```ignore
//! use hemmer_provider_framework::{init_logging, Server};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Initialize logging (reads HEMMER_LOG env var)
//!     init_logging();
//!
//!     tracing::info!("Starting provider");
//!     let server = Server::new(Arc::new(MyProvider::new()));
//!     // hand the server to the host transport
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `HEMMER_LOG`: Controls log levels (e.g., `info`, `debug`, `hemmer_provider_framework=debug`)
//!
//! # Examples
//!
//! ```bash
//! # Show info logs (default)
//! HEMMER_LOG=info ./my-provider
//!
//! # Show debug logs for the framework
//! HEMMER_LOG=hemmer_provider_framework=debug ./my-provider
//!
//! # Show all debug logs
//! HEMMER_LOG=debug ./my-provider
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// The environment variable that controls log filtering.
pub const LOG_ENV_VAR: &str = "HEMMER_LOG";

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize the default logging subscriber.
///
/// This sets up a `tracing` subscriber that:
/// - Writes to **stderr** (stdout is left to the host transport)
/// - Respects the `HEMMER_LOG` environment variable for filtering
/// - Defaults to `info` level if `HEMMER_LOG` is not set
/// - Uses a compact, human-readable format
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
///
/// # Example
///
/// ```ignore
/// use hemmer_provider_framework::init_logging;
///
/// fn main() {
///     init_logging();
///     tracing::info!("Provider starting");
/// }
/// ```
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Initialize logging with a custom default level.
///
/// Like [`init_logging`], but allows specifying a default log level
/// that will be used if `HEMMER_LOG` is not set.
///
/// # Arguments
///
/// * `default_level` - The default log level (e.g., "debug", "info", "warn")
///
/// # Example
///
/// ```ignore
/// use hemmer_provider_framework::init_logging_with_default;
///
/// fn main() {
///     // Default to debug level if HEMMER_LOG is not set
///     init_logging_with_default("debug");
/// }
/// ```
pub fn init_logging_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();
}

/// Try to initialize logging, returning false if already initialized.
///
/// Unlike [`init_logging`], this function does not panic if a subscriber
/// has already been set. This is useful in test scenarios or when
/// the provider might be initialized multiple times.
///
/// # Returns
///
/// - `true` if the subscriber was successfully set
/// - `false` if a subscriber was already set
///
/// # Example
///
/// ```ignore
/// use hemmer_provider_framework::try_init_logging;
///
/// fn main() {
///     if !try_init_logging() {
///         eprintln!("Logging already initialized");
///     }
/// }
/// ```
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .is_ok()
}
