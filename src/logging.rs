use crate::config::AppConfig;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

/// Installs the global tracing subscriber and the log-record bridge.
pub fn init_subscriber(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // sea-orm logs through `log`; forward those records into tracing.
    let _ = tracing_log::LogTracer::init();

    let registry = Registry::default().with(filter);
    if config.log_format == "json" {
        tracing::subscriber::set_global_default(registry.with(fmt::layer().json()))
            .expect("Failed to set global default subscriber");
    } else {
        tracing::subscriber::set_global_default(registry.with(fmt::layer()))
            .expect("Failed to set global default subscriber");
    }
}
