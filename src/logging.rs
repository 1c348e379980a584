//! Diagnostic logging setup.
//!
//! Logs go to stderr so stdout stays free for command output. `RUST_LOG`
//! overrides the level given on the command line.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Dependencies that are chatty at debug level.
pub const NOISY_MODULES: &[&str] = &["lettre", "rustls"];

fn build_filter(log_level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let mut directives = String::from(log_level);
    for module in NOISY_MODULES {
        directives.push_str(&format!(",{module}=warn"));
    }
    EnvFilter::new(&directives)
}

/// Installs the global subscriber. `log_format` is `json` or anything else
/// for human-readable output. Calling it twice is harmless.
pub fn init_logging(log_level: &str, log_format: &str) {
    let subscriber = tracing_subscriber::registry().with(build_filter(log_level));

    if log_format == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_writer(std::io::stderr);
        let _ = subscriber.with(fmt_layer).try_init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);
        let _ = subscriber.with(fmt_layer).try_init();
    }

    tracing::debug!(log_level, log_format, "logging initialized");
}
