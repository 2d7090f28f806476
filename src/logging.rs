//! Logging setup.
//!
//! Logs go to stderr so stdout stays clean for command output. `RUST_LOG`
//! always wins; otherwise the verbosity count picks the level.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter directive for a `-v` count: 0 → warn, 1 → info, 2 → debug, 3+ → trace.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn,skincare_rag=info",
        1 => "info",
        2 => "info,skincare_rag=debug,skincare_rag_core=debug",
        _ => "trace",
    }
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_logging(verbosity: u8) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let console_layer = fmt::layer()
        .with_target(verbosity >= 2)
        .with_writer(std::io::stderr);

    let _ = Registry::default()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_parse() {
        for v in 0..5 {
            assert!(EnvFilter::try_new(default_directive(v)).is_ok());
        }
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(0);
        init_logging(2);
    }
}
