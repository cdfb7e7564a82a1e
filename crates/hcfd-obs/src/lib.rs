use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "info,hcfd=debug";

/// Initialize logging.
/// - RUST_LOG respected; default to "info,hcfd=debug"
/// - `json` switches to one JSON object per line for log shippers
pub fn init(service_name: &str, json: bool) {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string());
    let registry = tracing_subscriber::registry().with(EnvFilter::new(env_filter));

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!(service = %service_name, "Logging initialized");
}
