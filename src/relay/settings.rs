//! Settings persisted in browser storage and edited from the settings popup.

use serde_json::{json, Value};

use super::host::BrowserHost;
use super::provider::AiProvider;
use crate::error::HostError;

pub const AI_MODEL_KEY: &str = "aiModel";
pub const AUTO_ENABLED_KEY: &str = "ixlAutoEnabled";
pub const DEBUG_KEY: &str = "ixlDebug";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub ai_model: AiProvider,
    /// Gates automatic scraping on the question page. Read by the page, reported here.
    pub auto_enabled: bool,
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ai_model: AiProvider::ChatGpt,
            auto_enabled: true,
            debug: false,
        }
    }
}

impl Settings {
    /// Storage defaults object, in the shape `chrome.storage.sync.get` expects.
    pub fn defaults_value() -> Value {
        let d = Settings::default();
        json!({
            AI_MODEL_KEY: d.ai_model.as_str(),
            AUTO_ENABLED_KEY: d.auto_enabled,
            DEBUG_KEY: d.debug,
        })
    }

    /// Build settings from a storage read. Unknown or mistyped values fall back to defaults.
    pub fn from_value(items: &Value) -> Self {
        let defaults = Settings::default();
        let ai_model = match items.get(AI_MODEL_KEY).and_then(Value::as_str) {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!("{}; using {}", e, defaults.ai_model.as_str());
                defaults.ai_model
            }),
            None => defaults.ai_model,
        };

        Self {
            ai_model,
            auto_enabled: items
                .get(AUTO_ENABLED_KEY)
                .map(|v| v.as_bool() != Some(false))
                .unwrap_or(defaults.auto_enabled),
            debug: items
                .get(DEBUG_KEY)
                .and_then(Value::as_bool)
                .unwrap_or(defaults.debug),
        }
    }

    pub async fn load<H: BrowserHost + ?Sized>(host: &H) -> Result<Self, HostError> {
        let items = host.storage_get(&Self::defaults_value()).await?;
        Ok(Self::from_value(&items))
    }
}
