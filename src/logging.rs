//! Tracing setup with a reloadable filter so the `ixlDebug` setting applies live.

use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

const DEFAULT_FILTER: &str = "info";
const DEBUG_FILTER: &str = "info,tabrelay=debug";

/// Receives changes of the persisted debug flag.
pub trait VerbositySwitch: Send + Sync {
    fn set_debug(&self, enabled: bool);
}

pub struct LogHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    /// `RUST_LOG` pins the filter; the debug setting is then ignored.
    pinned: bool,
}

/// Install the global subscriber. Logs go to stderr; stdout carries native-messaging frames.
pub fn init(verbose: bool) -> LogHandle {
    let (filter, pinned) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (filter_for(verbose), false),
    };
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    LogHandle { handle, pinned }
}

fn filter_for(debug: bool) -> EnvFilter {
    EnvFilter::new(if debug { DEBUG_FILTER } else { DEFAULT_FILTER })
}

impl VerbositySwitch for LogHandle {
    fn set_debug(&self, enabled: bool) {
        if self.pinned {
            return;
        }
        match self.handle.modify(|f| *f = filter_for(enabled)) {
            Ok(()) => tracing::info!("Debug logging {}", if enabled { "enabled" } else { "disabled" }),
            Err(e) => tracing::warn!("Failed to switch log level: {}", e),
        }
    }
}
