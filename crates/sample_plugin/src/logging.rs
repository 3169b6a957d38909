// crates/sample_plugin/src/logging.rs

use tracing_subscriber::EnvFilter;

/// Install the plug-in's `fmt` subscriber. `RUST_LOG` wins over `default_filter`.
///
/// Returns false when a subscriber already exists, which is normal when the host
/// loads several plug-ins into one process.
pub fn init_logging(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
