//! Tracing subscriber setup for the `wlr` binary.
//!
//! `RUST_LOG` wins; otherwise the configured level applies to every target.

use tracing_subscriber::EnvFilter;

/// Normalized filter level; unknown names fall back to "info".
pub fn level_name(configured: &str) -> &'static str {
    match configured.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(configured_level: &str) {
    let fallback = level_name(configured_level);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(level_name("DEBUG"), "debug");
        assert_eq!(level_name(" warn "), "warn");
        assert_eq!(level_name("verbose"), "info");
    }

    #[test]
    fn test_init_twice() {
        init("debug");
        init("info");
    }
}
