use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{oneshot, Mutex};

use super::server::BridgeState;
use crate::error::HostError;
use crate::relay::host::{BrowserHost, TabId, TabInfo, WindowId, WindowSpec};

/// [`BrowserHost`] backed by the connected extension.
///
/// Each call becomes one `{"id","method","params"}` frame; the reply is
/// matched back by id through the bridge's pending map.
pub struct BridgeHost {
    state: Arc<Mutex<BridgeState>>,
    timeout: Duration,
}

impl BridgeHost {
    pub(crate) fn new(state: Arc<Mutex<BridgeState>>, timeout_ms: u64) -> Self {
        Self {
            state,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, HostError> {
        let (tx, rx) = oneshot::channel();
        let subject = params.get("tabId").and_then(Value::as_i64);

        let id = {
            let mut s = self.state.lock().await;
            let ext_tx = s.extension_tx.clone().ok_or(HostError::Disconnected)?;
            let id = s.next_id;
            s.next_id += 1;

            let frame = json!({ "id": id, "method": method, "params": &params });
            if ext_tx.send(frame.to_string()).is_err() {
                return Err(HostError::Disconnected);
            }
            s.pending.insert(id, tx);
            id
        };

        tracing::debug!("-> {} #{}", method, id);

        let reply = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => return Err(HostError::Disconnected),
            Err(_) => {
                self.state.lock().await.pending.remove(&id);
                return Err(HostError::Timeout(method.to_string()));
            }
        };

        match reply.get("error") {
            Some(error) => Err(map_error(error, subject)),
            None => Ok(reply.get("result").cloned().unwrap_or(Value::Null)),
        }
    }
}

/// Translate an extension error object into a [`HostError`].
/// `subject` is the tab the command was about, if any.
fn map_error(error: &Value, subject: Option<TabId>) -> HostError {
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();

    match error.get("code").and_then(Value::as_str) {
        Some("no_such_tab") => match error.get("tabId").and_then(Value::as_i64).or(subject) {
            Some(tab_id) => HostError::NoSuchTab(tab_id),
            None => HostError::Protocol(message),
        },
        Some("unreachable") => HostError::Unreachable(message),
        Some("disconnected") => HostError::Disconnected,
        _ => HostError::Protocol(message),
    }
}

fn decode<T: serde::de::DeserializeOwned>(method: &str, value: Value) -> Result<T, HostError> {
    serde_json::from_value(value)
        .map_err(|e| HostError::Protocol(format!("bad {} result: {}", method, e)))
}

#[async_trait]
impl BrowserHost for BridgeHost {
    async fn query_tabs(&self, url_pattern: &str) -> Result<Vec<TabInfo>, HostError> {
        let result = self.call("tabs.query", json!({ "url": url_pattern })).await?;
        decode("tabs.query", result)
    }

    async fn get_tab(&self, tab_id: TabId) -> Result<TabInfo, HostError> {
        let result = self.call("tabs.get", json!({ "tabId": tab_id })).await?;
        decode("tabs.get", result)
    }

    async fn activate_tab(&self, tab_id: TabId) -> Result<(), HostError> {
        self.call("tabs.activate", json!({ "tabId": tab_id })).await?;
        Ok(())
    }

    async fn focus_window(&self, window_id: WindowId) -> Result<(), HostError> {
        self.call("windows.focus", json!({ "windowId": window_id })).await?;
        Ok(())
    }

    async fn send_message(&self, tab_id: TabId, message: &Value) -> Result<Value, HostError> {
        self.call(
            "tabs.sendMessage",
            json!({ "tabId": tab_id, "message": message }),
        )
        .await
    }

    async fn storage_get(&self, defaults: &Value) -> Result<Value, HostError> {
        self.call("storage.get", json!({ "defaults": defaults })).await
    }

    async fn open_window(&self, spec: &WindowSpec) -> Result<(), HostError> {
        self.call("windows.create", serde_json::to_value(spec).unwrap_or_default())
            .await?;
        Ok(())
    }
}
