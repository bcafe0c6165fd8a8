//! Cross-context message types.
//!
//! Field names and `type` tags match what the content scripts put on the
//! wire, so these types deserialize the raw `chrome.runtime` messages directly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::host::{TabId, TabInfo, WindowId};
use super::provider::AiProvider;
use crate::error::RelayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionKind {
    #[serde(rename = "multiple_choice")]
    MultipleChoice,
    #[serde(rename = "text", alias = "free_text")]
    FreeText,
}

/// Question scraped from the question page. Immutable once sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPayload {
    #[serde(rename = "question")]
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
}

/// Messages the relay accepts from content scripts and the settings popup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    #[serde(rename = "sendQuestionToChatGPT")]
    SendQuestion { question: QuestionPayload },

    #[serde(rename = "chatGPTResponse")]
    ChatGptResponse { response: String },

    #[serde(rename = "geminiResponse")]
    GeminiResponse { response: String },

    #[serde(rename = "deepseekResponse")]
    DeepseekResponse { response: String },

    #[serde(rename = "openSettings")]
    OpenSettings,

    #[serde(other)]
    Unknown,
}

impl InboundMessage {
    /// Provider and raw answer for the AI-response kinds.
    pub fn ai_response(&self) -> Option<(AiProvider, &str)> {
        match self {
            InboundMessage::ChatGptResponse { response } => Some((AiProvider::ChatGpt, response)),
            InboundMessage::GeminiResponse { response } => Some((AiProvider::Gemini, response)),
            InboundMessage::DeepseekResponse { response } => {
                Some((AiProvider::DeepSeek, response))
            }
            _ => None,
        }
    }
}

/// Messages the relay sends into tabs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    #[serde(rename = "receiveQuestion")]
    ReceiveQuestion { question: QuestionPayload },

    #[serde(rename = "processChatGPTResponse")]
    ProcessResponse { response: String },

    #[serde(rename = "alertMessage")]
    Alert { message: String },
}

impl OutboundMessage {
    pub fn type_tag(&self) -> &'static str {
        match self {
            OutboundMessage::ReceiveQuestion { .. } => "receiveQuestion",
            OutboundMessage::ProcessResponse { .. } => "processChatGPTResponse",
            OutboundMessage::Alert { .. } => "alertMessage",
        }
    }

    pub fn to_value(&self) -> Value {
        // Every variant is a plain struct of strings; serialization cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Immediate reply to an inbound message. Only confirms acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub received: bool,
}

impl Ack {
    pub const ACCEPTED: Ack = Ack { received: true };
    pub const REJECTED: Ack = Ack { received: false };
}

/// The `answer` field of an AI reply, as the question page consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Single(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnswerPayload {
    pub answer: Answer,
}

impl AnswerPayload {
    pub fn parse(raw: &str) -> Result<Self, RelayError> {
        serde_json::from_str(raw).map_err(|e| RelayError::Parse(e.to_string()))
    }

    /// The answer the page tries to select: the first one when several are given.
    pub fn primary(&self) -> Option<&str> {
        match &self.answer {
            Answer::Single(s) => Some(s.as_str()),
            Answer::Many(v) => v.first().map(String::as_str),
        }
    }
}

/// Who sent a runtime message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Origin {
    QuestionSite,
    Provider(AiProvider),
}

impl Origin {
    /// Classify a sender URL by substring. Only used when the envelope carries no origin tag.
    pub fn classify(url: &str, question_host: &str) -> Option<Self> {
        if !question_host.is_empty() && url.contains(question_host) {
            return Some(Origin::QuestionSite);
        }
        AiProvider::from_url(url).map(Origin::Provider)
    }
}

impl TryFrom<String> for Origin {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.eq_ignore_ascii_case("question") {
            return Ok(Origin::QuestionSite);
        }
        value.parse().map(Origin::Provider)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageSender {
    #[serde(default)]
    pub tab: Option<TabInfo>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageChange {
    #[serde(default)]
    pub old_value: Option<Value>,
    #[serde(default)]
    pub new_value: Option<Value>,
}

/// Events the extension forwards from the browser.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event")]
pub enum HostEvent {
    #[serde(rename = "runtime.message")]
    Message {
        #[serde(default)]
        id: Option<u64>,
        #[serde(default)]
        sender: MessageSender,
        #[serde(default)]
        origin: Option<Origin>,
        message: Value,
    },

    #[serde(rename = "tabs.removed", rename_all = "camelCase")]
    TabRemoved { tab_id: TabId },

    #[serde(rename = "tabs.activated", rename_all = "camelCase")]
    TabActivated { tab_id: TabId, window_id: WindowId },

    #[serde(rename = "storage.changed")]
    StorageChanged { changes: HashMap<String, StorageChange> },
}
