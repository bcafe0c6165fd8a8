//! Loopback WebSocket bridge between the relay and the browser extension.

pub mod host;
pub mod native_messaging;
pub mod server;

pub use host::BridgeHost;
pub use server::{is_bridge_running, send_command, serve, serve_on, PROTOCOL_VERSION};
