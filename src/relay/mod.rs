//! Cross-tab relay between the question page and the AI chat page.

pub mod delivery;
pub mod focus;
pub mod host;
pub mod message;
pub mod provider;
pub mod question;
pub mod registry;
pub mod response;
pub mod router;
pub mod settings;

#[cfg(test)]
pub(crate) mod testing;

pub use host::{BrowserHost, TabId, TabInfo, TabRef, WindowId, WindowSpec};
pub use message::{Ack, HostEvent, InboundMessage, OutboundMessage, QuestionPayload};
pub use provider::AiProvider;
pub use router::MessageRouter;
