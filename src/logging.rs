use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "BUGTRACK_LOG";

/// `BUGTRACK_LOG` wins over the configured filter.
pub fn resolve_filter(configured: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new(crate::config::DEFAULT_LOG_FILTER))
}

/// Installs the stderr fmt subscriber. A second call is a no-op.
pub fn init(configured: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(resolve_filter(configured))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
