//! Message Router: single entry point for everything the extension forwards.
//!
//! Every runtime message refreshes the Tab Registry from its sender, then is
//! dispatched by type to exactly one handler. The ack goes back immediately;
//! handlers finish on their own task.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::host::{BrowserHost, TabRef, WindowSpec};
use super::message::{Ack, HostEvent, InboundMessage, MessageSender, Origin, StorageChange};
use super::question::QuestionRelay;
use super::registry::{RegistryState, TabRegistry};
use super::response::ResponseRelay;
use super::settings::{Settings, AI_MODEL_KEY, AUTO_ENABLED_KEY, DEBUG_KEY};
use crate::config::Config;
use crate::logging::VerbositySwitch;

/// Result of routing one event.
pub struct Routed {
    /// Reply for the sender; `None` for events that expect none.
    pub ack: Option<Ack>,
    /// Handler still running, if one was started.
    pub task: Option<JoinHandle<()>>,
}

impl Routed {
    fn ack(ack: Ack) -> Self {
        Self {
            ack: Some(ack),
            task: None,
        }
    }

    fn none() -> Self {
        Self {
            ack: None,
            task: None,
        }
    }
}

pub struct MessageRouter {
    host: Arc<dyn BrowserHost>,
    registry: Arc<TabRegistry>,
    questions: Arc<QuestionRelay>,
    responses: Arc<ResponseRelay>,
    settings_window: WindowSpec,
    verbosity: Option<Arc<dyn VerbositySwitch>>,
}

impl MessageRouter {
    pub fn new(host: Arc<dyn BrowserHost>, config: &Config) -> Self {
        let registry = Arc::new(TabRegistry::new(config.sites.clone()));
        let questions = Arc::new(QuestionRelay::new(
            Arc::clone(&host),
            Arc::clone(&registry),
            &config.relay,
        ));
        let responses = Arc::new(ResponseRelay::new(
            Arc::clone(&host),
            Arc::clone(&registry),
            &config.relay,
        ));
        let settings_window = WindowSpec::popup(
            config.sites.settings_page.clone(),
            config.sites.settings_width,
            config.sites.settings_height,
        );

        Self {
            host,
            registry,
            questions,
            responses,
            settings_window,
            verbosity: None,
        }
    }

    pub fn with_verbosity(mut self, switch: Arc<dyn VerbositySwitch>) -> Self {
        self.verbosity = Some(switch);
        self
    }

    pub fn registry(&self) -> &Arc<TabRegistry> {
        &self.registry
    }

    /// Load stored settings and look for open tabs. Run when the extension connects.
    pub async fn initialize(&self) {
        match Settings::load(self.host.as_ref()).await {
            Ok(settings) => {
                self.apply_debug(settings.debug);
                info!(
                    provider = settings.ai_model.as_str(),
                    auto_enabled = settings.auto_enabled,
                    "Settings loaded"
                );
            }
            Err(e) => warn!("Could not read settings: {}", e),
        }
        if let Err(e) = self.registry.resolve_tabs(self.host.as_ref()).await {
            warn!("Initial tab lookup failed: {}", e);
        }
    }

    /// Registry snapshot plus lock state, for status queries.
    pub async fn status(&self) -> Value {
        let state: RegistryState = self.registry.snapshot().await;
        json!({
            "registry": state,
            "busy": self.questions.lock().is_held(),
        })
    }

    pub async fn handle_event(&self, event: HostEvent) -> Routed {
        match event {
            HostEvent::Message {
                sender,
                origin,
                message,
                ..
            } => self.route_message(&sender, origin, message).await,
            HostEvent::TabRemoved { tab_id } => {
                self.registry.forget(tab_id).await;
                Routed::none()
            }
            HostEvent::TabActivated { tab_id, window_id } => {
                self.registry.note_active(TabRef { tab_id, window_id }).await;
                Routed::none()
            }
            HostEvent::StorageChanged { changes } => {
                for (key, change) in &changes {
                    self.apply_storage_change(key, change);
                }
                Routed::none()
            }
        }
    }

    pub async fn route_message(
        &self,
        sender: &MessageSender,
        origin: Option<Origin>,
        message: Value,
    ) -> Routed {
        let message_type = message
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        if let Some(tab) = &sender.tab {
            self.registry.observe(tab, origin, &message_type).await;
        }
        let source = sender.tab.as_ref().map(|t| t.tab_ref());

        let parsed: InboundMessage = match serde_json::from_value(message) {
            Ok(m) => m,
            Err(e) => {
                warn!("Malformed {} message: {}", message_type, e);
                return Routed::ack(Ack::REJECTED);
            }
        };

        match parsed {
            InboundMessage::SendQuestion { question } => {
                let relay = Arc::clone(&self.questions);
                let task = tokio::spawn(async move {
                    let outcome = relay.handle(question, source).await;
                    debug!(?outcome, "Question cycle finished");
                });
                Routed {
                    ack: Some(Ack::ACCEPTED),
                    task: Some(task),
                }
            }
            InboundMessage::OpenSettings => {
                let host = Arc::clone(&self.host);
                let spec = self.settings_window.clone();
                let task = tokio::spawn(async move {
                    if let Err(e) = host.open_window(&spec).await {
                        warn!("Could not open settings window: {}", e);
                    }
                });
                Routed {
                    ack: Some(Ack::ACCEPTED),
                    task: Some(task),
                }
            }
            InboundMessage::Unknown => {
                debug!("Ignoring message of type {:?}", message_type);
                Routed::ack(Ack::REJECTED)
            }
            other => match other.ai_response() {
                Some((provider, response)) => {
                    let relay = Arc::clone(&self.responses);
                    let response = response.to_string();
                    let task = tokio::spawn(async move {
                        let outcome = relay.handle(provider, response).await;
                        debug!(?outcome, "Response relay finished");
                    });
                    Routed {
                        ack: Some(Ack::ACCEPTED),
                        task: Some(task),
                    }
                }
                None => Routed::ack(Ack::REJECTED),
            },
        }
    }

    fn apply_storage_change(&self, key: &str, change: &StorageChange) {
        let new_value = change.new_value.as_ref();
        match key {
            DEBUG_KEY => {
                let enabled = new_value.and_then(Value::as_bool).unwrap_or(false);
                info!("Debug changed -> {}", enabled);
                self.apply_debug(enabled);
            }
            AI_MODEL_KEY => {
                let shown = new_value.map(|v| v.to_string()).unwrap_or_default();
                info!("AI provider setting changed -> {}; applies on next tab lookup", shown);
            }
            AUTO_ENABLED_KEY => {
                let shown = new_value.map(|v| v.to_string()).unwrap_or_default();
                debug!("Automation setting changed -> {}", shown);
            }
            _ => {}
        }
    }

    fn apply_debug(&self, enabled: bool) {
        if let Some(switch) = &self.verbosity {
            switch.set_debug(enabled);
        }
    }
}
