//! Seam between the relay and the browser that hosts the tabs.
//!
//! Everything the relay needs from the browser (tab lookup, focus changes,
//! cross-tab message delivery, settings storage, window creation) goes through
//! [`BrowserHost`]. The production implementation forwards each call over the
//! extension bridge; tests use a recording mock.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HostError;

pub type TabId = i64;
pub type WindowId = i64;

/// A tab as reported by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: TabId,
    pub window_id: WindowId,
    #[serde(default)]
    pub url: String,
}

impl TabInfo {
    pub fn tab_ref(&self) -> TabRef {
        TabRef {
            tab_id: self.id,
            window_id: self.window_id,
        }
    }
}

/// Registry handle on a tracked tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabRef {
    pub tab_id: TabId,
    pub window_id: WindowId,
}

/// Window the extension should open, relative to its own package root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub width: u32,
    pub height: u32,
}

impl WindowSpec {
    pub fn popup(path: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            path: path.into(),
            kind: "popup".to_string(),
            width,
            height,
        }
    }
}

#[async_trait]
pub trait BrowserHost: Send + Sync {
    /// Tabs whose URL matches a match pattern such as `https://chatgpt.com/*`.
    async fn query_tabs(&self, url_pattern: &str) -> Result<Vec<TabInfo>, HostError>;

    async fn get_tab(&self, tab_id: TabId) -> Result<TabInfo, HostError>;

    /// Mark a tab active within its window.
    async fn activate_tab(&self, tab_id: TabId) -> Result<(), HostError>;

    /// Bring a window to the foreground.
    async fn focus_window(&self, window_id: WindowId) -> Result<(), HostError>;

    /// Deliver a message to the content script of a tab and return its reply.
    async fn send_message(&self, tab_id: TabId, message: &Value) -> Result<Value, HostError>;

    /// Read persisted settings; missing keys take the values in `defaults`.
    async fn storage_get(&self, defaults: &Value) -> Result<Value, HostError>;

    async fn open_window(&self, spec: &WindowSpec) -> Result<(), HostError>;
}
