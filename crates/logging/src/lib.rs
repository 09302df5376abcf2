#![deny(unsafe_code)]

//! Verbosity handling for the resync workspace.
//!
//! The engine inherits rsync's counted `-v` verbosity model: each additional
//! level unlocks a chattier diagnostic tier. This crate maps that counter onto
//! [`tracing`] level filters so the rest of the workspace can use the standard
//! `tracing` macros without knowing about verbosity counts.
//!
//! The mapping mirrors how the C reference used its levels:
//!
//! | count | filter | typical content |
//! |---|---|---|
//! | 0 | `WARN`  | errors and skip warnings only |
//! | 1 | `INFO`  | per-file transfer reporting |
//! | 2 | `DEBUG` | driver state, uptodate reporting |
//! | 3+ | `TRACE` | per-chunk and per-token detail |
//!
//! `RESYNC_LOG` overrides the computed filter with a full
//! [`EnvFilter`](tracing_subscriber::EnvFilter) directive when set.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable consulted for an explicit filter directive.
pub const ENV_FILTER_VAR: &str = "RESYNC_LOG";

/// Counted verbosity as supplied by a caller (the number of `-v` flags).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct Verbosity(u8);

impl Verbosity {
    /// No verbose output beyond warnings and errors.
    pub const QUIET: Self = Self(0);

    /// Creates a verbosity from a raw `-v` count.
    #[must_use]
    pub const fn from_count(count: u8) -> Self {
        Self(count)
    }

    /// Returns the raw count.
    #[must_use]
    pub const fn count(self) -> u8 {
        self.0
    }

    /// Maps the count onto a `tracing` level filter.
    #[must_use]
    pub const fn level_filter(self) -> LevelFilter {
        match self.0 {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

impl From<u8> for Verbosity {
    fn from(count: u8) -> Self {
        Self::from_count(count)
    }
}

/// Installs the global subscriber for the given verbosity.
///
/// Diagnostics go to stderr, keeping stdout free for callers that drive the
/// engine from a terminal pipeline. Installing twice is tolerated so tests
/// and embedding applications can both call this unconditionally.
pub fn init(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_env(ENV_FILTER_VAR)
        .unwrap_or_else(|_| EnvFilter::default().add_directive(verbosity.level_filter().into()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
