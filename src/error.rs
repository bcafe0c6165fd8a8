use thiserror::Error;

use crate::relay::host::TabId;
use crate::relay::provider::AiProvider;

/// Failures reported by the browser substrate for a single host command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("No tab with id {0}")]
    NoSuchTab(TabId),

    #[error("Could not establish connection: {0}")]
    Unreachable(String),

    #[error("Extension not connected")]
    Disconnected,

    #[error("Host command timed out: {0}")]
    Timeout(String),

    #[error("Host protocol error: {0}")]
    Protocol(String),
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Delivery to tab {tab_id} failed after {attempts} attempt(s): {source}")]
    Delivery {
        tab_id: TabId,
        attempts: u32,
        #[source]
        source: HostError,
    },

    #[error("No {provider} tab is open")]
    Resolution { provider: AiProvider },

    #[error("Could not focus tab {tab_id}: {source}")]
    Focus {
        tab_id: TabId,
        #[source]
        source: HostError,
    },

    #[error("Invalid answer payload: {0}")]
    Parse(String),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Bridge error: {0}")]
    BridgeError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;
