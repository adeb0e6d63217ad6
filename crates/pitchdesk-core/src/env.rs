// Environment mode detection and tracing setup.

use std::sync::OnceLock;

// Resolved once; the mode cannot change mid-process.
static MODE: OnceLock<EnvMode> = OnceLock::new();

/// Which runtime environment the process is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvMode {
    Production,
    Development,
    Test,
}

/// Resolve the environment from `PITCHDESK_ENV`, falling back to
/// `RUST_ENV`. Unknown or missing values mean development.
pub fn detect_env_mode() -> EnvMode {
    *MODE.get_or_init(|| {
        let raw = ["PITCHDESK_ENV", "RUST_ENV"]
            .iter()
            .find_map(|key| std::env::var(key).ok())
            .unwrap_or_default();

        match raw.to_lowercase().as_str() {
            "production" | "prod" => EnvMode::Production,
            "test" | "testing" => EnvMode::Test,
            _ => EnvMode::Development,
        }
    })
}

pub fn is_production() -> bool {
    matches!(detect_env_mode(), EnvMode::Production)
}

pub fn is_development() -> bool {
    matches!(detect_env_mode(), EnvMode::Development)
}

pub fn is_test() -> bool {
    matches!(detect_env_mode(), EnvMode::Test)
}

/// Install the global `tracing` subscriber. `RUST_LOG` wins when set;
/// otherwise production logs at info and everything else at debug.
pub fn init_logger() {
    use tracing_subscriber::EnvFilter;

    let default_directive = if is_production() {
        "pitchdesk=info"
    } else {
        "pitchdesk=debug"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_ids(false)
        .with_target(true)
        .init();
}
