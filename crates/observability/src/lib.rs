//! Process-wide logging setup shared by every binary in the workspace.

/// Tracing subscriber installation (JSON formatter, `RUST_LOG` filter).
pub mod tracing;

pub use self::tracing::{DEFAULT_FILTER, init_with_filter};

/// Initialize structured logging with the default `info` filter.
///
/// Safe to call multiple times; only the first call installs a subscriber.
pub fn init() {
    self::tracing::init_with_filter(DEFAULT_FILTER);
}
