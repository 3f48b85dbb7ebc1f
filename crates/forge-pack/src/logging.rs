//! Tracing setup for hosts that have not installed a subscriber.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `forge_pack=debug`
pub const LOG_ENV: &str = "FORGE_PACK_LOG";

/// Build the filter from `FORGE_PACK_LOG`, falling back to `info`
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a formatted subscriber.
///
/// Returns `false` when a global subscriber is already set; the existing one
/// is left alone.
pub fn init_logging() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        init_logging();
        assert!(!init_logging());
    }
}
