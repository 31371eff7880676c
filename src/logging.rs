//! Tracing subscriber setup.

use std::sync::Once;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::SubscriberInitExt;

/// Output profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable, `denorm=debug` unless `RUST_LOG` says otherwise.
    Development,
    /// JSON lines, `denorm=info` unless `RUST_LOG` says otherwise.
    Production,
    /// Routed through the test harness's captured output.
    Test,
}

static INIT_ONCE: Once = Once::new();

/// Installs the global subscriber. Only the first call has any effect, and
/// an already installed subscriber is left in place.
///
/// ```
/// denorm::logging::init(denorm::logging::Profile::Development);
/// ```
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        let filter = |default: &str| {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
        };
        let _ = match profile {
            Profile::Development => tracing_subscriber::fmt()
                .with_env_filter(filter("denorm=debug"))
                .finish()
                .try_init(),
            Profile::Production => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter("denorm=info"))
                .finish()
                .try_init(),
            Profile::Test => tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(filter("denorm=debug"))
                .finish()
                .try_init(),
        };
    });
}
