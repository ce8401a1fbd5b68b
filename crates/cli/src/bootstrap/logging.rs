use fakedns_domain::FakeDnsConfig;
use tracing_subscriber::EnvFilter;

/// RUST_LOG wins over the configured level.
pub fn init_logging(config: &FakeDnsConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
