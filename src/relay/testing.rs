//! Recording in-memory [`BrowserHost`] for relay tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::Instant;

use super::host::{BrowserHost, TabId, TabInfo, WindowId, WindowSpec};
use crate::error::HostError;

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Query(String),
    GetTab(TabId),
    Activate(TabId),
    FocusWindow(WindowId),
    Send { tab_id: TabId, message: Value },
    StorageGet,
    OpenWindow(WindowSpec),
}

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub at: Instant,
    pub message: Value,
}

#[derive(Default)]
pub struct MockHost {
    tabs: Vec<TabInfo>,
    storage: serde_json::Map<String, Value>,
    always_fail: HashSet<TabId>,
    fail_first: Mutex<HashMap<TabId, u32>>,
    fail_queries: bool,
    calls: Mutex<Vec<(Instant, HostCall)>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tab(mut self, id: TabId, window_id: WindowId, url: &str) -> Self {
        self.tabs.push(TabInfo {
            id,
            window_id,
            url: url.to_string(),
        });
        self
    }

    pub fn with_setting(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.storage.insert(key.to_string(), value.into());
        self
    }

    /// Every message to `tab_id` fails as if no listener were attached.
    pub fn failing_always(mut self, tab_id: TabId) -> Self {
        self.always_fail.insert(tab_id);
        self
    }

    /// The first `count` messages to `tab_id` fail.
    pub fn failing_first(self, tab_id: TabId, count: u32) -> Self {
        self.fail_first.lock().unwrap().insert(tab_id, count);
        self
    }

    pub fn failing_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn sends_to(&self, tab_id: TabId) -> Vec<SentMessage> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(at, c)| match c {
                HostCall::Send { tab_id: t, message } if *t == tab_id => Some(SentMessage {
                    at: *at,
                    message: message.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    pub fn send_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, c)| matches!(c, HostCall::Send { .. }))
            .count()
    }

    pub fn activations_of(&self, tab_id: TabId) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, c)| *c == HostCall::Activate(tab_id))
            .map(|(at, _)| *at)
            .collect()
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().unwrap().push((Instant::now(), call));
    }

    fn find(&self, tab_id: TabId) -> Result<&TabInfo, HostError> {
        self.tabs
            .iter()
            .find(|t| t.id == tab_id)
            .ok_or(HostError::NoSuchTab(tab_id))
    }
}

#[async_trait]
impl BrowserHost for MockHost {
    async fn query_tabs(&self, url_pattern: &str) -> Result<Vec<TabInfo>, HostError> {
        self.record(HostCall::Query(url_pattern.to_string()));
        if self.fail_queries {
            return Err(HostError::Disconnected);
        }
        let prefix = url_pattern.trim_end_matches('*');
        Ok(self
            .tabs
            .iter()
            .filter(|t| t.url.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get_tab(&self, tab_id: TabId) -> Result<TabInfo, HostError> {
        self.record(HostCall::GetTab(tab_id));
        self.find(tab_id).cloned()
    }

    async fn activate_tab(&self, tab_id: TabId) -> Result<(), HostError> {
        self.record(HostCall::Activate(tab_id));
        self.find(tab_id).map(|_| ())
    }

    async fn focus_window(&self, window_id: WindowId) -> Result<(), HostError> {
        self.record(HostCall::FocusWindow(window_id));
        Ok(())
    }

    async fn send_message(&self, tab_id: TabId, message: &Value) -> Result<Value, HostError> {
        self.record(HostCall::Send {
            tab_id,
            message: message.clone(),
        });
        let attempt = self.sends_to(tab_id).len();
        self.find(tab_id)?;

        if self.always_fail.contains(&tab_id) {
            return Err(HostError::Unreachable(
                "Receiving end does not exist.".to_string(),
            ));
        }
        if let Some(left) = self.fail_first.lock().unwrap().get_mut(&tab_id) {
            if *left > 0 {
                *left -= 1;
                return Err(HostError::Unreachable(
                    "Receiving end does not exist.".to_string(),
                ));
            }
        }
        Ok(json!({ "received": true, "attempt": attempt }))
    }

    async fn storage_get(&self, defaults: &Value) -> Result<Value, HostError> {
        self.record(HostCall::StorageGet);
        let mut items = defaults.as_object().cloned().unwrap_or_default();
        for (k, v) in &self.storage {
            items.insert(k.clone(), v.clone());
        }
        Ok(Value::Object(items))
    }

    async fn open_window(&self, spec: &WindowSpec) -> Result<(), HostError> {
        self.record(HostCall::OpenWindow(spec.clone()));
        Ok(())
    }
}
