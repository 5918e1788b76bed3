//! JSON log output for the service.
//!
//! One line per event with a UTC timestamp, level, message, fields and the
//! enclosing `#[instrument]` span fields. `RUST_LOG` wins over the fallback
//! filter passed in by the caller.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber. Returns `false` when one was already set.
pub fn init_with_filter(fallback: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        init_with_filter("debug");
        assert!(!init_with_filter("debug"));
    }
}
