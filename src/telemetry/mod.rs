use std::sync::OnceLock;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static TELEMETRY: OnceLock<()> = OnceLock::new();

/// Filter applied when `RUST_LOG` is unset: engine spans at debug, the rest
/// at info.
pub const DEFAULT_FILTER: &str = "info,station_governance=debug";

/// Installs the JSON tracing subscriber. Safe to call repeatedly; only the
/// first call takes effect, so embedding callers and the `policy_lint`
/// binary can both init unconditionally.
pub fn init() {
    init_with_filter(DEFAULT_FILTER);
}

/// Same, but with the embedding caller's own fallback filter.
pub fn init_with_filter(default_filter: &str) {
    TELEMETRY.get_or_init(|| {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    });
}
