//! Tab Registry: which tabs currently host the question site and the AI site.
//!
//! Identity is last-observed-wins. A newer sighting (tab query or inbound
//! message) replaces the tracked tab; closing the tab clears the slot.

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use super::host::{BrowserHost, TabId, TabInfo, TabRef};
use super::message::Origin;
use super::provider::AiProvider;
use super::settings::Settings;
use crate::config::SitesConfig;
use crate::error::HostError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryState {
    pub question_tab: Option<TabRef>,
    pub answer_tab: Option<TabRef>,
    pub ai_provider: AiProvider,
    pub last_focused_tab: Option<TabRef>,
}

impl RegistryState {
    /// Both tabs tracked and sharing a window.
    pub fn same_window(&self) -> bool {
        match (self.question_tab, self.answer_tab) {
            (Some(q), Some(a)) => q.window_id == a.window_id,
            _ => false,
        }
    }
}

pub struct TabRegistry {
    state: Mutex<RegistryState>,
    sites: SitesConfig,
}

impl TabRegistry {
    pub fn new(sites: SitesConfig) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            sites,
        }
    }

    pub async fn snapshot(&self) -> RegistryState {
        *self.state.lock().await
    }

    /// Query the browser for the question tab and the configured provider's tab.
    ///
    /// The first match of each replaces the tracked tab. A slot with no match
    /// keeps its previous value.
    pub async fn resolve_tabs<H: BrowserHost + ?Sized>(
        &self,
        host: &H,
    ) -> Result<RegistryState, HostError> {
        let question = host.query_tabs(&self.sites.question_url).await?;
        let settings = Settings::load(host).await?;
        let provider = settings.ai_model;
        let answer = host.query_tabs(provider.url_pattern()).await?;

        let mut state = self.state.lock().await;
        if let Some(tab) = question.first() {
            state.question_tab = Some(tab.tab_ref());
        }
        state.ai_provider = provider;
        if let Some(tab) = answer.first() {
            state.answer_tab = Some(tab.tab_ref());
        }
        debug!(
            question_tab = ?state.question_tab,
            answer_tab = ?state.answer_tab,
            provider = provider.as_str(),
            "Resolved tabs"
        );
        Ok(*state)
    }

    /// Query only for the question tab. Used when an answer arrives with no question tab tracked.
    pub async fn find_question_tab<H: BrowserHost + ?Sized>(
        &self,
        host: &H,
    ) -> Result<Option<TabRef>, HostError> {
        let found = host.query_tabs(&self.sites.question_url).await?;
        let Some(tab) = found.first() else {
            return Ok(None);
        };
        let mut state = self.state.lock().await;
        state.question_tab = Some(tab.tab_ref());
        Ok(state.question_tab)
    }

    /// Classify the sender of an inbound message and refresh the matching slot.
    ///
    /// An explicit origin tag wins; otherwise the sender URL is matched by substring,
    /// and a provider response from an unrecognised URL is attributed by its type.
    /// Returns the origin that was applied.
    pub async fn observe(
        &self,
        sender: &TabInfo,
        origin: Option<Origin>,
        message_type: &str,
    ) -> Option<Origin> {
        let origin = origin
            .or_else(|| Origin::classify(&sender.url, &self.sites.question_host))
            .or_else(|| AiProvider::from_response_type(message_type).map(Origin::Provider))?;

        let mut state = self.state.lock().await;
        match origin {
            Origin::QuestionSite => {
                state.question_tab = Some(sender.tab_ref());
                debug!(tab_id = sender.id, message_type, "Message from question tab");
            }
            Origin::Provider(provider) => {
                state.answer_tab = Some(sender.tab_ref());
                state.ai_provider = provider;
                debug!(
                    tab_id = sender.id,
                    message_type,
                    provider = provider.as_str(),
                    "Message from AI tab"
                );
            }
        }
        Some(origin)
    }

    /// Track the source tab of a question when no question tab is known yet.
    pub async fn adopt_question_tab(&self, tab: TabRef) {
        let mut state = self.state.lock().await;
        if state.question_tab.is_none() {
            state.question_tab = Some(tab);
        }
    }

    /// Clear whichever slot holds `tab_id`.
    pub async fn forget(&self, tab_id: TabId) {
        let mut state = self.state.lock().await;
        if state.question_tab.map(|t| t.tab_id) == Some(tab_id) {
            state.question_tab = None;
            debug!(tab_id, "Question tab closed");
        }
        if state.answer_tab.map(|t| t.tab_id) == Some(tab_id) {
            state.answer_tab = None;
            debug!(tab_id, "AI tab closed");
        }
        if state.last_focused_tab.map(|t| t.tab_id) == Some(tab_id) {
            state.last_focused_tab = None;
        }
    }

    pub async fn note_active(&self, tab: TabRef) {
        self.state.lock().await.last_focused_tab = Some(tab);
    }
}
