use tracing_subscriber::EnvFilter;

/// Fmt-layer tracing with env-filter control. `RUST_LOG` wins when set;
/// otherwise the service logs at info.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("balance_service=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
