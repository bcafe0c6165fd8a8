//! Question Relay: one question→AI cycle at a time.
//!
//! A cycle resolves both tabs, optionally focuses the AI tab, forwards the
//! question, and schedules a focus restoration. Questions arriving while a
//! cycle is in flight are dropped, not queued; the page re-polls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::delivery::{send_with_retry, RetryPolicy};
use super::focus;
use super::host::{BrowserHost, TabId, TabRef};
use super::message::{OutboundMessage, QuestionPayload};
use super::provider::AiProvider;
use super::registry::TabRegistry;
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};

/// Mutual exclusion for relay cycles. Acquisition never waits.
#[derive(Debug, Default)]
pub struct CycleLock {
    busy: AtomicBool,
}

impl CycleLock {
    pub fn try_acquire(&self) -> Option<CycleGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard { lock: self })
    }

    pub fn is_held(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the cycle lock on drop, whichever way the cycle exits.
#[derive(Debug)]
pub struct CycleGuard<'a> {
    lock: &'a CycleLock,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.lock.busy.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another cycle held the lock.
    Dropped,
    /// No AI tab was open; the question tab was told to open one.
    NoAnswerTab,
    Forwarded { focused: bool },
    Failed,
}

pub struct QuestionRelay {
    host: Arc<dyn BrowserHost>,
    registry: Arc<TabRegistry>,
    lock: CycleLock,
    retry: RetryPolicy,
    settle_delay: Duration,
    restore_delay: Duration,
    pending_restore: Mutex<Option<CancellationToken>>,
}

impl QuestionRelay {
    pub fn new(host: Arc<dyn BrowserHost>, registry: Arc<TabRegistry>, config: &RelayConfig) -> Self {
        Self {
            host,
            registry,
            lock: CycleLock::default(),
            retry: RetryPolicy::from(config),
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            restore_delay: Duration::from_millis(config.restore_delay_ms),
            pending_restore: Mutex::new(None),
        }
    }

    pub fn lock(&self) -> &CycleLock {
        &self.lock
    }

    /// Run one relay cycle for `question`, sent from `source` (the page's tab).
    ///
    /// Never fails: errors become an alert in the question tab.
    pub async fn handle(&self, question: QuestionPayload, source: Option<TabRef>) -> CycleOutcome {
        let Some(_guard) = self.lock.try_acquire() else {
            debug!("Relay cycle in flight; dropping question");
            return CycleOutcome::Dropped;
        };

        match self.run_cycle(question, source).await {
            Ok(outcome) => outcome,
            Err(RelayError::Resolution { provider }) => {
                debug!("No {} tab found when processing question", provider.as_str());
                let target = self.alert_target(source).await;
                self.alert(
                    target,
                    format!(
                        "Please open {} in another tab before using automation.",
                        provider
                    ),
                )
                .await;
                CycleOutcome::NoAnswerTab
            }
            Err(e) => {
                warn!("Question relay failed: {}", e);
                let provider = self.registry.snapshot().await.ai_provider;
                let target = self.alert_target(source).await;
                self.alert(target, communication_alert(provider)).await;
                CycleOutcome::Failed
            }
        }
    }

    async fn run_cycle(&self, question: QuestionPayload, source: Option<TabRef>) -> Result<CycleOutcome> {
        self.cancel_pending_restore().await;

        let host = self.host.as_ref();
        let state = self.registry.resolve_tabs(host).await?;
        if state.answer_tab.is_none() {
            return Err(RelayError::Resolution {
                provider: state.ai_provider,
            });
        }
        if let Some(source) = source {
            self.registry.adopt_question_tab(source).await;
        }
        // Snapshot before our own focus change overwrites it.
        let previous = state.last_focused_tab;

        let same_window = focus::decide_same_window(&self.registry, host).await?;
        let answer_tab = self
            .registry
            .snapshot()
            .await
            .answer_tab
            .or(state.answer_tab)
            .ok_or(RelayError::Resolution {
                provider: state.ai_provider,
            })?;

        if same_window {
            focus::focus(host, answer_tab.tab_id).await;
            tokio::time::sleep(self.settle_delay).await;
        }

        debug!(
            answer_tab = answer_tab.tab_id,
            question = %question.text,
            "Forwarding question to AI tab"
        );
        send_with_retry(
            host,
            answer_tab.tab_id,
            &OutboundMessage::ReceiveQuestion { question },
            self.retry,
        )
        .await?;
        info!(answer_tab = answer_tab.tab_id, "Question forwarded");

        if same_window {
            if let Some(previous) = previous.filter(|p| p.tab_id != answer_tab.tab_id) {
                self.schedule_restore(previous.tab_id).await;
            }
        }

        Ok(CycleOutcome::Forwarded {
            focused: same_window,
        })
    }

    async fn alert_target(&self, source: Option<TabRef>) -> Option<TabId> {
        self.registry
            .snapshot()
            .await
            .question_tab
            .or(source)
            .map(|t| t.tab_id)
    }

    async fn alert(&self, target: Option<TabId>, message: String) {
        let Some(tab_id) = target else {
            warn!("No question tab to alert: {}", message);
            return;
        };
        let alert = OutboundMessage::Alert { message };
        if let Err(e) = send_with_retry(self.host.as_ref(), tab_id, &alert, self.retry).await {
            warn!("Could not deliver alert: {}", e);
        }
    }

    /// Return focus to `tab_id` after the restore delay unless a new cycle starts first.
    async fn schedule_restore(&self, tab_id: TabId) {
        let token = CancellationToken::new();
        if let Some(old) = self.pending_restore.lock().await.replace(token.clone()) {
            old.cancel();
        }

        let host = Arc::clone(&self.host);
        let delay = self.restore_delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => debug!(tab_id, "Focus restoration cancelled"),
                _ = tokio::time::sleep(delay) => {
                    if !focus::focus(host.as_ref(), tab_id).await {
                        debug!(tab_id, "Focus restoration skipped");
                    }
                }
            }
        });
    }

    async fn cancel_pending_restore(&self) {
        if let Some(token) = self.pending_restore.lock().await.take() {
            token.cancel();
        }
    }
}

fn communication_alert(provider: AiProvider) -> String {
    format!(
        "Error communicating with {}. Please make sure it's open in another tab.",
        provider
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SitesConfig;
    use crate::relay::message::QuestionKind;
    use crate::relay::testing::{HostCall, MockHost};
    use tokio::time::Instant;

    fn question() -> QuestionPayload {
        QuestionPayload {
            text: "2+2=?".to_string(),
            options: vec!["3".to_string(), "4".to_string(), "5".to_string()],
            kind: QuestionKind::MultipleChoice,
        }
    }

    fn relay(host: &Arc<MockHost>) -> (QuestionRelay, Arc<TabRegistry>) {
        let registry = Arc::new(TabRegistry::new(SitesConfig::default()));
        let host: Arc<dyn BrowserHost> = host.clone();
        let relay = QuestionRelay::new(host, Arc::clone(&registry), &RelayConfig::default());
        (relay, registry)
    }

    fn source(tab_id: TabId, window_id: i64) -> Option<TabRef> {
        Some(TabRef { tab_id, window_id })
    }

    #[tokio::test(start_paused = true)]
    async fn no_ai_tab_alerts_once_and_releases_lock() {
        let host = Arc::new(MockHost::new().with_tab(1, 1, "https://www.ixl.com/math"));
        let (relay, _) = relay(&host);
        assert!(!relay.lock().is_held());

        let outcome = relay.handle(question(), source(1, 1)).await;

        assert_eq!(outcome, CycleOutcome::NoAnswerTab);
        assert!(!relay.lock().is_held());
        let sends = host.sends_to(1);
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].message["type"], "alertMessage");
        let text = sends[0].message["message"].as_str().unwrap();
        assert!(text.contains("ChatGPT"), "alert was: {}", text);
        assert_eq!(host.send_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn held_lock_drops_question_without_delivery() {
        let host = Arc::new(
            MockHost::new()
                .with_tab(1, 1, "https://www.ixl.com/math")
                .with_tab(2, 2, "https://chatgpt.com/"),
        );
        let (relay, _) = relay(&host);

        let guard = relay.lock().try_acquire().unwrap();
        let outcome = relay.handle(question(), source(1, 1)).await;
        assert_eq!(outcome, CycleOutcome::Dropped);
        assert_eq!(host.send_count(), 0);
        assert!(host.calls().is_empty());
        drop(guard);

        assert!(!relay.lock().is_held());
    }

    #[tokio::test(start_paused = true)]
    async fn question_during_retry_backoff_is_dropped() {
        let host = Arc::new(
            MockHost::new()
                .with_tab(1, 1, "https://www.ixl.com/math")
                .with_tab(2, 2, "https://chatgpt.com/")
                .failing_first(2, 1),
        );
        let (relay, _) = relay(&host);
        let relay = Arc::new(relay);

        let first = tokio::spawn({
            let relay = Arc::clone(&relay);
            async move { relay.handle(question(), source(1, 1)).await }
        });

        // Run the first cycle up to its failed attempt; it then sleeps before retrying.
        for _ in 0..100 {
            if host.send_count() == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(host.send_count(), 1);
        assert!(relay.lock().is_held());
        let calls_before = host.calls().len();

        let outcome = relay.handle(question(), source(1, 1)).await;

        assert_eq!(outcome, CycleOutcome::Dropped);
        assert_eq!(host.calls().len(), calls_before);

        assert_eq!(
            first.await.unwrap(),
            CycleOutcome::Forwarded { focused: false }
        );
        assert_eq!(host.sends_to(2).len(), 2);
        assert!(!relay.lock().is_held());
    }

    #[tokio::test(start_paused = true)]
    async fn different_windows_forward_without_focus() {
        let host = Arc::new(
            MockHost::new()
                .with_tab(1, 1, "https://www.ixl.com/math")
                .with_tab(2, 2, "https://chatgpt.com/"),
        );
        let (relay, _) = relay(&host);
        let started = Instant::now();

        let outcome = relay.handle(question(), source(1, 1)).await;

        assert_eq!(outcome, CycleOutcome::Forwarded { focused: false });
        assert_eq!(started.elapsed(), Duration::ZERO);
        let sends = host.sends_to(2);
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].message["type"], "receiveQuestion");
        assert_eq!(sends[0].message["question"]["question"], "2+2=?");
        assert!(host
            .calls()
            .iter()
            .all(|c| !matches!(c, HostCall::Activate(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn same_window_focuses_settles_forwards_then_restores() {
        let host = Arc::new(
            MockHost::new()
                .with_tab(1, 1, "https://www.ixl.com/math")
                .with_tab(2, 1, "https://chatgpt.com/"),
        );
        let (relay, registry) = relay(&host);
        registry
            .note_active(TabRef {
                tab_id: 1,
                window_id: 1,
            })
            .await;
        let started = Instant::now();

        let outcome = relay.handle(question(), source(1, 1)).await;
        assert_eq!(outcome, CycleOutcome::Forwarded { focused: true });

        let activate_ai = host.activations_of(2);
        assert_eq!(activate_ai.len(), 1);
        let sends = host.sends_to(2);
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].at - activate_ai[0], Duration::from_millis(300));
        assert!(host.activations_of(1).is_empty());

        tokio::time::sleep(Duration::from_millis(1500)).await;

        let restored = host.activations_of(1);
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0] - started, Duration::from_millis(1300));
        assert!(!relay.lock().is_held());
    }

    #[tokio::test(start_paused = true)]
    async fn new_cycle_cancels_pending_restoration() {
        let host = Arc::new(
            MockHost::new()
                .with_tab(1, 1, "https://www.ixl.com/math")
                .with_tab(2, 1, "https://chatgpt.com/"),
        );
        let (relay, registry) = relay(&host);
        registry
            .note_active(TabRef {
                tab_id: 1,
                window_id: 1,
            })
            .await;

        relay.handle(question(), source(1, 1)).await;
        // Second cycle starts before the first restoration fires; by then the AI tab
        // is the last focused one, so nothing new is scheduled.
        registry
            .note_active(TabRef {
                tab_id: 2,
                window_id: 1,
            })
            .await;
        relay.handle(question(), source(1, 1)).await;

        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert!(host.activations_of(1).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_failure_alerts_with_provider_and_releases_lock() {
        let host = Arc::new(
            MockHost::new()
                .with_tab(1, 1, "https://www.ixl.com/math")
                .with_tab(2, 2, "https://gemini.google.com/app")
                .with_setting("aiModel", "gemini")
                .failing_always(2),
        );
        let (relay, _) = relay(&host);

        let outcome = relay.handle(question(), source(1, 1)).await;

        assert_eq!(outcome, CycleOutcome::Failed);
        assert!(!relay.lock().is_held());
        assert_eq!(host.sends_to(2).len(), 3);
        let alerts = host.sends_to(1);
        assert_eq!(alerts.len(), 1);
        assert_eq!(
            alerts[0].message["message"],
            "Error communicating with Gemini. Please make sure it's open in another tab."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn host_query_failure_is_converted_to_alert() {
        let host = Arc::new(
            MockHost::new()
                .with_tab(1, 1, "https://www.ixl.com/math")
                .failing_queries(),
        );
        let (relay, _) = relay(&host);

        let outcome = relay.handle(question(), source(1, 1)).await;

        assert_eq!(outcome, CycleOutcome::Failed);
        assert!(!relay.lock().is_held());
        assert_eq!(host.sends_to(1).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn source_tab_is_adopted_when_no_question_tab_found() {
        let host = Arc::new(MockHost::new().with_tab(2, 2, "https://chatgpt.com/"));
        let (relay, registry) = relay(&host);

        relay.handle(question(), source(6, 3)).await;

        assert_eq!(
            registry.snapshot().await.question_tab,
            Some(TabRef {
                tab_id: 6,
                window_id: 3
            })
        );
    }
}
