// SPDX-License-Identifier: MIT
//! Logging initialization for embedding hosts.

/// Initialize tracing with an env-filter directive (e.g. `"info"`,
/// `"hostbridge=debug"`). `RUST_LOG` overrides `default_level`.
///
/// Call once from the host's entry point; a second call is a no-op rather
/// than a panic so tests can initialize freely.
pub fn init_tracing(default_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .try_init();
}
