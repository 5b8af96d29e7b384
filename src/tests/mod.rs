
/// Install a test-friendly tracing subscriber.
///
/// Output shows up only for failing tests; `RUST_LOG` overrides the filter.
pub(crate) fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    // Try to initialize, ignore error if already initialized
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
}
