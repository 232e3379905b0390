use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "spendwise_client=info";

/// Install a formatted subscriber filtered by `RUST_LOG`. Calling it again,
/// or after the host installed its own subscriber, does nothing.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
