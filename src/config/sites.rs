use serde::{Deserialize, Serialize};

/// Where the question site lives and which extension page holds the settings UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitesConfig {
    /// Tab match pattern for the question site
    #[serde(default = "default_question_url")]
    pub question_url: String,

    /// URL substring identifying a message sender as the question tab
    #[serde(default = "default_question_host")]
    pub question_host: String,

    /// Extension page opened by `openSettings`
    #[serde(default = "default_settings_page")]
    pub settings_page: String,

    #[serde(default = "default_settings_width")]
    pub settings_width: u32,

    #[serde(default = "default_settings_height")]
    pub settings_height: u32,
}

fn default_question_url() -> String {
    "https://www.ixl.com/*".to_string()
}

fn default_question_host() -> String {
    "ixl.com".to_string()
}

fn default_settings_page() -> String {
    "popup/settings.html".to_string()
}

fn default_settings_width() -> u32 {
    500
}

fn default_settings_height() -> u32 {
    520
}

impl Default for SitesConfig {
    fn default() -> Self {
        Self {
            question_url: default_question_url(),
            question_host: default_question_host(),
            settings_page: default_settings_page(),
            settings_width: default_settings_width(),
            settings_height: default_settings_height(),
        }
    }
}
