use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// AI chat service that answers relayed questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    #[default]
    ChatGpt,
    Gemini,
    DeepSeek,
}

impl AiProvider {
    pub const ALL: [AiProvider; 3] = [AiProvider::ChatGpt, AiProvider::Gemini, AiProvider::DeepSeek];

    /// Value stored under the `aiModel` settings key.
    pub fn as_str(&self) -> &'static str {
        match self {
            AiProvider::ChatGpt => "chatgpt",
            AiProvider::Gemini => "gemini",
            AiProvider::DeepSeek => "deepseek",
        }
    }

    /// Name shown to the user in alerts.
    pub fn display_name(&self) -> &'static str {
        match self {
            AiProvider::ChatGpt => "ChatGPT",
            AiProvider::Gemini => "Gemini",
            AiProvider::DeepSeek => "DeepSeek",
        }
    }

    /// Match pattern handed to `tabs.query`.
    pub fn url_pattern(&self) -> &'static str {
        match self {
            AiProvider::ChatGpt => "https://chatgpt.com/*",
            AiProvider::Gemini => "https://gemini.google.com/*",
            AiProvider::DeepSeek => "https://chat.deepseek.com/*",
        }
    }

    /// Substring identifying a sender tab URL as belonging to this provider.
    pub fn host(&self) -> &'static str {
        match self {
            AiProvider::ChatGpt => "chatgpt.com",
            AiProvider::Gemini => "gemini.google.com",
            AiProvider::DeepSeek => "chat.deepseek.com",
        }
    }

    /// Message type the provider's page relay uses to deliver an answer.
    pub fn response_type(&self) -> &'static str {
        match self {
            AiProvider::ChatGpt => "chatGPTResponse",
            AiProvider::Gemini => "geminiResponse",
            AiProvider::DeepSeek => "deepseekResponse",
        }
    }

    /// Provider whose page relay sends messages of type `tag`.
    pub fn from_response_type(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.response_type() == tag)
    }

    /// Classify a tab URL by provider host substring.
    pub fn from_url(url: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| url.contains(p.host()))
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for AiProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chatgpt" => Ok(AiProvider::ChatGpt),
            "gemini" => Ok(AiProvider::Gemini),
            "deepseek" => Ok(AiProvider::DeepSeek),
            other => Err(format!("Unknown AI provider: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_provider_urls() {
        assert_eq!(
            AiProvider::from_url("https://chat.deepseek.com/a/chat/s/123"),
            Some(AiProvider::DeepSeek)
        );
        assert_eq!(
            AiProvider::from_url("https://gemini.google.com/app"),
            Some(AiProvider::Gemini)
        );
        assert_eq!(AiProvider::from_url("https://chatgpt.com/"), Some(AiProvider::ChatGpt));
        assert_eq!(AiProvider::from_url("https://www.ixl.com/math"), None);
    }

    #[test]
    fn response_types_map_back_to_provider() {
        for provider in AiProvider::ALL {
            assert_eq!(AiProvider::from_response_type(provider.response_type()), Some(provider));
        }
        assert_eq!(AiProvider::from_response_type("processChatGPTResponse"), None);
    }

    #[test]
    fn parses_settings_values() {
        assert_eq!("chatgpt".parse::<AiProvider>(), Ok(AiProvider::ChatGpt));
        assert_eq!(" DeepSeek ".parse::<AiProvider>(), Ok(AiProvider::DeepSeek));
        assert!("claude".parse::<AiProvider>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&AiProvider::Gemini).unwrap();
        assert_eq!(json, "\"gemini\"");
    }
}
