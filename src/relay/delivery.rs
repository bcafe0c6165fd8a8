//! Delivery Layer: message send to a tab with bounded, fixed-delay retry.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use super::host::{BrowserHost, TabId};
use super::message::OutboundMessage;
use crate::config::RelayConfig;
use crate::error::{HostError, RelayError, Result};

/// Attempt budget for one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

impl From<&RelayConfig> for RetryPolicy {
    fn from(config: &RelayConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Send `message` to `tab_id`, retrying delivery failures after a fixed delay.
///
/// Resolves with the destination's reply. After `max_attempts` failures, returns
/// [`RelayError::Delivery`] carrying the last host error.
pub async fn send_with_retry<H: BrowserHost + ?Sized>(
    host: &H,
    tab_id: TabId,
    message: &OutboundMessage,
    policy: RetryPolicy,
) -> Result<Value> {
    let payload = message.to_value();
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = HostError::Protocol("no attempt made".to_string());

    for attempt in 1..=max_attempts {
        match host.send_message(tab_id, &payload).await {
            Ok(reply) => {
                debug!(
                    tab_id,
                    attempt,
                    message_type = message.type_tag(),
                    reply = %reply,
                    "sendMessage success"
                );
                return Ok(reply);
            }
            Err(e) => {
                warn!(
                    tab_id,
                    attempt,
                    max_attempts,
                    message_type = message.type_tag(),
                    "sendMessage failed: {}",
                    e
                );
                last_error = e;
            }
        }

        if attempt < max_attempts {
            tokio::time::sleep(policy.delay).await;
        }
    }

    Err(RelayError::Delivery {
        tab_id,
        attempts: max_attempts,
        source: last_error,
    })
}
