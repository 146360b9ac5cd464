//! Tracing subscriber setup for the command-line driver.

use tracing_subscriber::EnvFilter;

/// Logging configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub level: String,
}

impl LoggerConfig {
    /// Reads `LOG_LEVEL` (default `info`). A set `RUST_LOG` takes precedence at init.
    pub fn from_env() -> Self {
        let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        Self { level }
    }

    /// Installs a global `fmt` subscriber. A second call is a no-op.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
