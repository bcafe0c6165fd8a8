//! Response Relay: AI answer back to the question tab.
//!
//! Runs without the cycle lock. Failures are logged only; the question page
//! owns user-facing reporting for answers it cannot apply.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::delivery::{send_with_retry, RetryPolicy};
use super::focus;
use super::host::BrowserHost;
use super::message::{AnswerPayload, OutboundMessage};
use super::provider::AiProvider;
use super::registry::TabRegistry;
use crate::config::RelayConfig;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// No question tab tracked or open; the answer is dropped.
    NoQuestionTab,
    Forwarded { focused: bool },
    Failed,
}

pub struct ResponseRelay {
    host: Arc<dyn BrowserHost>,
    registry: Arc<TabRegistry>,
    retry: RetryPolicy,
    settle_delay: Duration,
}

impl ResponseRelay {
    pub fn new(host: Arc<dyn BrowserHost>, registry: Arc<TabRegistry>, config: &RelayConfig) -> Self {
        Self {
            host,
            registry,
            retry: RetryPolicy::from(config),
            settle_delay: Duration::from_millis(config.settle_delay_ms),
        }
    }

    pub async fn handle(&self, provider: AiProvider, response: String) -> ResponseOutcome {
        match self.forward(provider, response).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Error processing {} response: {}", provider.as_str(), e);
                ResponseOutcome::Failed
            }
        }
    }

    async fn forward(&self, provider: AiProvider, response: String) -> Result<ResponseOutcome> {
        let host = self.host.as_ref();

        let tracked = self.registry.snapshot().await.question_tab;
        let question_tab = match tracked {
            Some(tab) => tab,
            None => match self.registry.find_question_tab(host).await? {
                Some(tab) => tab,
                None => {
                    debug!("No question tab open; dropping {} response", provider.as_str());
                    return Ok(ResponseOutcome::NoQuestionTab);
                }
            },
        };

        match AnswerPayload::parse(&response) {
            Ok(payload) => debug!(answer = ?payload.primary(), "Answer parsed"),
            Err(e) => debug!("Forwarding answer the page will likely reject: {}", e),
        }

        let same_window = focus::decide_same_window(&self.registry, host).await?;
        if same_window {
            focus::focus(host, question_tab.tab_id).await;
            tokio::time::sleep(self.settle_delay).await;
        }

        debug!(
            question_tab = question_tab.tab_id,
            response = %response,
            "Forwarding AI response back to question tab"
        );
        send_with_retry(
            host,
            question_tab.tab_id,
            &OutboundMessage::ProcessResponse { response },
            self.retry,
        )
        .await?;
        info!(question_tab = question_tab.tab_id, "Answer forwarded");

        Ok(ResponseOutcome::Forwarded {
            focused: same_window,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SitesConfig;
    use crate::relay::host::{TabInfo, TabRef};
    use crate::relay::testing::MockHost;
    use tokio::time::Instant;

    fn relay(host: &Arc<MockHost>) -> (ResponseRelay, Arc<TabRegistry>) {
        let registry = Arc::new(TabRegistry::new(SitesConfig::default()));
        let host: Arc<dyn BrowserHost> = host.clone();
        let relay = ResponseRelay::new(host, Arc::clone(&registry), &RelayConfig::default());
        (relay, registry)
    }

    #[tokio::test(start_paused = true)]
    async fn no_question_tab_anywhere_drops_silently() {
        let host = Arc::new(MockHost::new().with_tab(2, 1, "https://chatgpt.com/"));
        let (relay, _) = relay(&host);

        let outcome = relay
            .handle(AiProvider::ChatGpt, r#"{"answer":"4"}"#.to_string())
            .await;

        assert_eq!(outcome, ResponseOutcome::NoQuestionTab);
        assert_eq!(host.send_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn requeries_for_question_tab_when_untracked() {
        let host = Arc::new(
            MockHost::new()
                .with_tab(1, 1, "https://www.ixl.com/math")
                .with_tab(2, 2, "https://chatgpt.com/"),
        );
        let (relay, registry) = relay(&host);

        let outcome = relay
            .handle(AiProvider::ChatGpt, r#"{"answer":"4"}"#.to_string())
            .await;

        assert_eq!(outcome, ResponseOutcome::Forwarded { focused: false });
        assert_eq!(registry.snapshot().await.question_tab.map(|t| t.tab_id), Some(1));
        let sends = host.sends_to(1);
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].message["type"], "processChatGPTResponse");
        assert_eq!(sends[0].message["response"], r#"{"answer":"4"}"#);
    }

    #[tokio::test(start_paused = true)]
    async fn same_window_focuses_question_tab_first() {
        let host = Arc::new(
            MockHost::new()
                .with_tab(1, 1, "https://www.ixl.com/math")
                .with_tab(2, 1, "https://chatgpt.com/"),
        );
        let (relay, registry) = relay(&host);
        registry
            .observe(
                &TabInfo {
                    id: 1,
                    window_id: 1,
                    url: "https://www.ixl.com/math".to_string(),
                },
                None,
                "sendQuestionToChatGPT",
            )
            .await;
        let started = Instant::now();

        let outcome = relay
            .handle(AiProvider::ChatGpt, "not json at all".to_string())
            .await;

        assert_eq!(outcome, ResponseOutcome::Forwarded { focused: true });
        assert_eq!(host.activations_of(1), vec![started]);
        assert_eq!(host.sends_to(1)[0].at - started, Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_failure_is_swallowed() {
        let host = Arc::new(
            MockHost::new()
                .with_tab(1, 1, "https://www.ixl.com/math")
                .failing_always(1),
        );
        let (relay, registry) = relay(&host);
        registry
            .adopt_question_tab(TabRef {
                tab_id: 1,
                window_id: 1,
            })
            .await;

        let outcome = relay
            .handle(AiProvider::DeepSeek, r#"{"answer":["b"]}"#.to_string())
            .await;

        assert_eq!(outcome, ResponseOutcome::Failed);
        assert_eq!(host.sends_to(1).len(), 3);
    }
}
