//! Logging initialization.
//!
//! Logs always go to stderr; stdout carries search results and other data.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Pick the default filter directive from the configured level.
///
/// `--verbose` forces at least `debug`. Unknown levels fall back to `info`.
fn level_directive(level: &str, verbose: bool) -> &'static str {
    match level.to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        _ if verbose => "debug",
        "error" => "error",
        "warn" | "warning" => "warn",
        _ => "info",
    }
}

/// Initialize the logging subsystem.
///
/// The RUST_LOG environment variable overrides `default_level`.
pub fn init(default_level: &str, json_format: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from `[logging]` config with CLI overrides.
pub fn init_from_config(
    config: &vista_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    let level = level_directive(&config.logging.level, verbose_override);
    let json_format = json_logs_override || config.logging.format == "json";
    init(level, json_format);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directive() {
        assert_eq!(level_directive("info", false), "info");
        assert_eq!(level_directive("WARN", false), "warn");
        assert_eq!(level_directive("warn", true), "debug");
        assert_eq!(level_directive("trace", true), "trace");
        assert_eq!(level_directive("bogus", false), "info");
    }
}
