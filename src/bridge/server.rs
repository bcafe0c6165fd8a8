use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use rand::Rng;
use serde_json::Value;
use subtle::ConstantTimeEq;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;

use super::host::BridgeHost;
use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::logging::VerbositySwitch;
use crate::relay::message::HostEvent;
use crate::relay::MessageRouter;

/// Token prefix for all bridge session tokens.
const TOKEN_PREFIX: &str = "trl_";

/// Minimum protocol version we accept in hello handshake.
pub const PROTOCOL_VERSION: &str = "0.1.0";

type WsSink = futures::stream::SplitSink<WebSocketStream<TcpStream>, Message>;
type WsSource = futures::stream::SplitStream<WebSocketStream<TcpStream>>;

/// Generate a new session token: `trl_` + 32 random hex characters.
pub fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 16] = rng.gen();
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}{}", TOKEN_PREFIX, hex)
}

fn data_file(name: &str) -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir().ok_or_else(|| {
        RelayError::Other("Cannot determine local data directory".to_string())
    })?;
    Ok(data_dir.join("tabrelay").join(name))
}

/// Path to the bridge token file: `~/.local/share/tabrelay/bridge-token`
pub fn token_file_path() -> Result<PathBuf> {
    data_file("bridge-token")
}

/// Path to the bridge port file: `~/.local/share/tabrelay/bridge-port`
pub fn port_file_path() -> Result<PathBuf> {
    data_file("bridge-port")
}

/// Write the session token to disk with mode 0600.
/// Writes a temp file with restricted permissions, then renames it into place.
pub async fn write_token_file(token: &str) -> Result<()> {
    let path = token_file_path()?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    #[cfg(unix)]
    {
        let tmp_path = path.with_extension("tmp");
        let mut opts = tokio::fs::OpenOptions::new();
        opts.write(true).create(true).truncate(true).mode(0o600);
        let mut file = opts.open(&tmp_path).await?;
        tokio::io::AsyncWriteExt::write_all(&mut file, token.as_bytes()).await?;
        tokio::io::AsyncWriteExt::flush(&mut file).await?;
        drop(file);
        tokio::fs::rename(&tmp_path, &path).await?;
    }

    #[cfg(not(unix))]
    {
        tokio::fs::write(&path, token).await?;
    }

    Ok(())
}

/// Read the token from the token file. Returns None if file doesn't exist.
pub async fn read_token_file() -> Option<String> {
    let path = token_file_path().ok()?;
    tokio::fs::read_to_string(&path)
        .await
        .ok()
        .map(|s| s.trim().to_string())
}

pub async fn delete_token_file() {
    if let Ok(path) = token_file_path() {
        let _ = tokio::fs::remove_file(&path).await;
    }
}

/// Write the bridge port to disk so the native messaging host can report it.
pub async fn write_port_file(port: u16) -> Result<()> {
    let path = port_file_path()?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, port.to_string()).await?;
    Ok(())
}

/// Read the bridge port from file. Returns None if file doesn't exist or is invalid.
pub async fn read_port_file() -> Option<u16> {
    let path = port_file_path().ok()?;
    let content = tokio::fs::read_to_string(&path).await.ok()?;
    content.trim().parse().ok()
}

pub async fn delete_port_file() {
    if let Ok(path) = port_file_path() {
        let _ = tokio::fs::remove_file(&path).await;
    }
}

/// Shared state between the bridge server and [`BridgeHost`].
pub(crate) struct BridgeState {
    /// Session token that clients must present in the hello handshake
    token: String,
    /// Channel to the connected extension, if any
    pub(crate) extension_tx: Option<mpsc::UnboundedSender<String>>,
    /// Incremented per extension connection so a stale reader cannot clear a newer one
    connection_seq: u64,
    /// Closes the current extension connection when a newer one replaces it
    extension_shutdown: Option<CancellationToken>,
    /// Host commands waiting for an extension reply, keyed by request id
    pub(crate) pending: HashMap<u64, oneshot::Sender<Value>>,
    pub(crate) next_id: u64,
}

impl BridgeState {
    pub(crate) fn new(token: String) -> Self {
        Self {
            token,
            extension_tx: None,
            connection_seq: 0,
            extension_shutdown: None,
            pending: HashMap::new(),
            next_id: 1,
        }
    }

    fn fail_pending(&mut self, message: &str) {
        for (id, sender) in self.pending.drain() {
            let _ = sender.send(serde_json::json!({
                "id": id,
                "error": { "code": "disconnected", "message": message }
            }));
        }
    }
}

/// Everything a connection handler needs.
#[derive(Clone)]
struct Shared {
    state: Arc<Mutex<BridgeState>>,
    router: Arc<MessageRouter>,
}

/// Build the relay on top of a fresh bridge state.
fn build(token: String, config: &Config, verbosity: Option<Arc<dyn VerbositySwitch>>) -> Shared {
    let state = Arc::new(Mutex::new(BridgeState::new(token)));
    let host = Arc::new(BridgeHost::new(Arc::clone(&state), config.bridge.command_timeout_ms));
    let mut router = MessageRouter::new(host, config);
    if let Some(switch) = verbosity {
        router = router.with_verbosity(switch);
    }
    Shared {
        state,
        router: Arc::new(router),
    }
}

/// Start the bridge on `port` and run until SIGINT/SIGTERM.
/// Writes the port file on start and removes it on exit.
pub async fn serve(
    port: u16,
    token: String,
    config: Config,
    verbosity: Option<Arc<dyn VerbositySwitch>>,
) -> Result<()> {
    // Clean up any stale files from a previous ungraceful shutdown before starting
    delete_port_file().await;

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| RelayError::BridgeError(format!("Failed to bind to {}: {}", addr, e)))?;

    if let Err(e) = write_port_file(port).await {
        tracing::warn!(
            "Failed to write port file: {}. Native messaging pairing may not work.",
            e
        );
    }

    let shutdown = async {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                (Ok(mut sigint), Ok(mut sigterm)) => {
                    tokio::select! {
                        _ = sigint.recv() => tracing::info!("Received SIGINT"),
                        _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
                    }
                }
                _ => {
                    tokio::signal::ctrl_c().await.ok();
                }
            }
        }
        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await.ok();
        }
    };

    let result: Result<()> = tokio::select! {
        r = serve_on(listener, token, config, verbosity) => r,
        _ = shutdown => {
            tracing::info!("Shutting down bridge server...");
            Ok(())
        }
    };

    // Cleanup always runs, whether shutdown was graceful or the loop exited
    delete_port_file().await;
    delete_token_file().await;
    result
}

/// Accept loop on an already-bound listener. Used directly by tests.
pub async fn serve_on(
    listener: TcpListener,
    token: String,
    config: Config,
    verbosity: Option<Arc<dyn VerbositySwitch>>,
) -> Result<()> {
    let shared = build(token, &config, verbosity);

    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Bridge listening on ws://{}", addr);
    }

    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|e| RelayError::BridgeError(format!("Accept failed: {}", e)))?;

        tracing::debug!("New connection from {}", peer);

        // Only accept connections from loopback addresses.
        if !peer.ip().is_loopback() {
            tracing::warn!("Rejected non-loopback connection from {}", peer);
            drop(stream);
            continue;
        }

        tokio::spawn(handle_connection(stream, shared.clone()));
    }
}

/// Parse an origin string into (scheme, host, optional_port).
fn parse_origin(origin: &str) -> Option<(&str, &str, Option<&str>)> {
    let (scheme, rest) = origin.split_once("://")?;
    if rest.is_empty() {
        return None;
    }
    // Handle IPv6 bracket notation e.g. [::1]:8080
    if rest.starts_with('[') {
        let end_bracket = rest.find(']')?;
        let host = &rest[..end_bracket + 1];
        let after = &rest[end_bracket + 1..];
        if after.is_empty() || after == "/" {
            Some((scheme, host, None))
        } else if let Some(port_part) = after.strip_prefix(':') {
            Some((scheme, host, Some(port_part.trim_end_matches('/'))))
        } else {
            None
        }
    } else {
        let (host, port) = match rest.find(':') {
            Some(i) => (&rest[..i], Some(rest[i + 1..].trim_end_matches('/'))),
            None => (rest.trim_end_matches('/'), None),
        };
        if host.is_empty() {
            None
        } else {
            Some((scheme, host, port))
        }
    }
}

/// Accept no origin, loopback http, or any chrome-extension:// origin.
fn is_origin_allowed(origin: Option<&str>) -> bool {
    match origin {
        None => true,
        Some(o) => {
            let lower = o.to_lowercase();
            match parse_origin(&lower) {
                None => false,
                Some(("chrome-extension", _, _)) => true,
                Some(("http", host, _)) => matches!(host, "127.0.0.1" | "localhost" | "[::1]"),
                Some(_) => false,
            }
        }
    }
}

/// Why a hello frame was refused.
#[derive(Debug, PartialEq, Eq)]
enum HelloRejection {
    NotHello,
    VersionMismatch(String),
    InvalidToken,
}

/// Validate the hello handshake and return the client role.
fn check_hello<'a>(hello: &'a Value, expected_token: &str) -> std::result::Result<&'a str, HelloRejection> {
    if hello.get("type").and_then(Value::as_str) != Some("hello") {
        return Err(HelloRejection::NotHello);
    }

    let version = hello.get("version").and_then(Value::as_str).unwrap_or("0.0.0");
    let accepted = match (
        semver::Version::parse(version),
        semver::Version::parse(PROTOCOL_VERSION),
    ) {
        (Ok(v), Ok(min)) => v >= min,
        _ => false,
    };
    if !accepted {
        return Err(HelloRejection::VersionMismatch(version.to_string()));
    }

    // Constant-time comparison to avoid timing side-channels.
    let token = hello.get("token").and_then(Value::as_str).unwrap_or("");
    if token.as_bytes().ct_eq(expected_token.as_bytes()).unwrap_u8() != 1 {
        return Err(HelloRejection::InvalidToken);
    }

    Ok(hello.get("role").and_then(Value::as_str).unwrap_or(""))
}

async fn send_json(write: &mut WsSink, value: &Value) -> bool {
    write.send(Message::Text(value.to_string().into())).await.is_ok()
}

async fn next_json(read: &mut WsSource) -> Option<Value> {
    match tokio::time::timeout(std::time::Duration::from_secs(5), read.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => serde_json::from_str(text.as_str()).ok(),
        _ => None,
    }
}

/// Handle a single incoming WebSocket connection: origin check, hello, then role dispatch.
async fn handle_connection(stream: TcpStream, shared: Shared) {
    let ws = match tokio_tungstenite::accept_hdr_async(
        stream,
        |req: &tokio_tungstenite::tungstenite::http::Request<()>,
         resp: tokio_tungstenite::tungstenite::http::Response<()>|
         -> std::result::Result<
            tokio_tungstenite::tungstenite::http::Response<()>,
            tokio_tungstenite::tungstenite::http::Response<Option<String>>,
        > {
            let origin = req.headers().get("origin").and_then(|v| v.to_str().ok());

            if !is_origin_allowed(origin) {
                tracing::warn!("Rejected WebSocket connection with origin: {:?}", origin);
                let mut rejection =
                    tokio_tungstenite::tungstenite::http::Response::new(Some("Forbidden origin".to_string()));
                *rejection.status_mut() = StatusCode::FORBIDDEN;
                return Err(rejection);
            }

            Ok(resp)
        },
    )
    .await
    {
        Ok(ws) => ws,
        Err(e) => {
            tracing::error!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    let (mut write, mut read) = ws.split();

    let Some(hello) = next_json(&mut read).await else {
        tracing::warn!("Client disconnected or timed out before sending hello");
        return;
    };

    let checked = {
        let s = shared.state.lock().await;
        check_hello(&hello, &s.token).map(str::to_string)
    };

    let role = match checked {
        Ok(role) => role,
        Err(HelloRejection::NotHello) => {
            tracing::warn!("Expected hello message, got {}", hello);
            return;
        }
        Err(HelloRejection::VersionMismatch(version)) => {
            tracing::warn!("Rejected client with protocol version {}", version);
            let err_msg = serde_json::json!({
                "type": "hello_error",
                "error": "version_mismatch",
                "message": format!(
                    "Protocol version {} is not supported. Minimum required: {}",
                    version, PROTOCOL_VERSION
                ),
                "required_version": PROTOCOL_VERSION,
            });
            send_json(&mut write, &err_msg).await;
            return;
        }
        Err(HelloRejection::InvalidToken) => {
            tracing::warn!("Invalid token in hello");
            let err_msg = serde_json::json!({
                "type": "hello_error",
                "error": "invalid_token",
                "message": "Token mismatch. Reconnect via native messaging to obtain the current token.",
            });
            send_json(&mut write, &err_msg).await;
            return;
        }
    };

    let ack = serde_json::json!({ "type": "hello_ack", "version": PROTOCOL_VERSION });
    if !send_json(&mut write, &ack).await {
        tracing::warn!("Failed to send hello_ack to {} client", role);
        return;
    }

    match role.as_str() {
        "extension" => handle_extension_client(write, read, shared).await,
        "cli" => handle_cli_client(write, read, shared).await,
        other => tracing::warn!("Unknown client role: {}", other),
    }
}

/// Handle the extension connection.
///
/// Frames carrying an `event` go to the router; frames carrying an `id` answer
/// a pending host command.
async fn handle_extension_client(mut write: WsSink, mut read: WsSource, shared: Shared) {
    tracing::info!("Extension connected");

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let shutdown = CancellationToken::new();

    let seq = {
        let mut s = shared.state.lock().await;
        if s.extension_tx.is_some() {
            tracing::warn!("Replacing previous extension connection");
            s.fail_pending("Extension reconnected");
        }
        if let Some(previous) = s.extension_shutdown.replace(shutdown.clone()) {
            previous.cancel();
        }
        s.connection_seq += 1;
        s.extension_tx = Some(tx.clone());
        s.connection_seq
    };

    // Forward queued frames from the channel to the socket
    let mut write_handle = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if write.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
        let _ = write
            .send(Message::Close(Some(
                tokio_tungstenite::tungstenite::protocol::CloseFrame {
                    code: tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode::Normal,
                    reason: "Session ended".into(),
                },
            )))
            .await;
    });

    let router = Arc::clone(&shared.router);
    tokio::spawn(async move { router.initialize().await });

    loop {
        // A superseded connection stops feeding events into the shared registry.
        let frame = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                tracing::info!("Extension connection superseded; closing");
                break;
            }
            frame = read.next() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        match frame {
            Ok(Message::Text(text)) => {
                let value: Value = match serde_json::from_str(text.as_str()) {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::error!("Invalid JSON from extension: {}", e);
                        continue;
                    }
                };

                if value.get("event").is_some() {
                    dispatch_event(value, &shared.router, &tx).await;
                } else if let Some(id) = value.get("id").and_then(Value::as_u64) {
                    let sender = shared.state.lock().await.pending.remove(&id);
                    match sender {
                        Some(sender) => {
                            let _ = sender.send(value);
                        }
                        None => tracing::warn!("Response for unknown request id: {}", id),
                    }
                } else {
                    tracing::debug!("Ignoring extension frame: {}", value);
                }
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::error!("Extension WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    tracing::info!("Extension disconnected");

    {
        let mut s = shared.state.lock().await;
        if s.connection_seq == seq {
            s.fail_pending("Extension disconnected");
            s.extension_tx = None;
            s.extension_shutdown = None;
        }
    }

    // The writer sends a close frame once the last sender is gone
    drop(tx);
    if tokio::time::timeout(std::time::Duration::from_secs(1), &mut write_handle)
        .await
        .is_err()
    {
        write_handle.abort();
    }
}

/// Route one extension event and send the immediate ack if the event asked for one.
async fn dispatch_event(value: Value, router: &MessageRouter, tx: &mpsc::UnboundedSender<String>) {
    let ack_id = value.get("id").and_then(Value::as_u64);
    let event: HostEvent = match serde_json::from_value(value) {
        Ok(ev) => ev,
        Err(e) => {
            tracing::warn!("Unrecognised extension event: {}", e);
            return;
        }
    };

    let routed = router.handle_event(event).await;
    if let (Some(id), Some(ack)) = (ack_id, routed.ack) {
        let frame = serde_json::json!({ "type": "ack", "id": id, "result": ack });
        let _ = tx.send(frame.to_string());
    }
}

/// Handle a CLI connection: one request, one response.
async fn handle_cli_client(mut write: WsSink, mut read: WsSource, shared: Shared) {
    let Some(request) = next_json(&mut read).await else {
        tracing::warn!("CLI disconnected before sending command");
        return;
    };

    let id = request.get("id").cloned().unwrap_or(serde_json::json!(0));
    let method = request.get("method").and_then(Value::as_str).unwrap_or("");
    tracing::debug!("CLI command: {}", method);

    let response = match method {
        "relay.ping" => serde_json::json!({ "id": id, "result": "pong" }),
        "relay.status" => {
            let mut status = shared.router.status().await;
            status["extension_connected"] =
                Value::Bool(shared.state.lock().await.extension_tx.is_some());
            serde_json::json!({ "id": id, "result": status })
        }
        other => serde_json::json!({
            "id": id,
            "error": { "code": -32601, "message": format!("Method not allowed: {}", other) }
        }),
    };

    send_json(&mut write, &response).await;
}

/// Send one CLI request to a running bridge and return its result.
pub async fn send_command(port: u16, method: &str) -> Result<Value> {
    let token = read_token_file().await.ok_or_else(|| {
        RelayError::BridgeError(
            "No bridge token found. Is `tabrelay serve` running?".to_string(),
        )
    })?;
    send_command_with_token(port, method, &token).await
}

pub async fn send_command_with_token(port: u16, method: &str, token: &str) -> Result<Value> {
    use tokio_tungstenite::connect_async;

    let url = format!("ws://127.0.0.1:{}", port);
    let (mut ws, _) = connect_async(&url).await.map_err(|e| {
        RelayError::BridgeError(format!(
            "Cannot connect to bridge at {}. Is `tabrelay serve` running? ({})",
            url, e
        ))
    })?;

    let hello = serde_json::json!({
        "type": "hello",
        "role": "cli",
        "token": token,
        "version": PROTOCOL_VERSION,
    });
    ws.send(Message::Text(hello.to_string().into()))
        .await
        .map_err(|e| RelayError::BridgeError(format!("Send hello failed: {}", e)))?;

    match tokio::time::timeout(std::time::Duration::from_secs(5), ws.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => {
            let ack: Value = serde_json::from_str(text.as_str()).unwrap_or_default();
            if ack.get("type").and_then(Value::as_str) != Some("hello_ack") {
                let reason = ack
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("invalid token");
                return Err(RelayError::BridgeError(format!(
                    "Authentication failed: {}",
                    reason
                )));
            }
        }
        Ok(_) => {
            return Err(RelayError::BridgeError(
                "Authentication failed: connection closed".to_string(),
            ))
        }
        Err(_) => {
            return Err(RelayError::BridgeError(
                "Authentication timeout: server did not respond".to_string(),
            ))
        }
    }

    let msg = serde_json::json!({ "id": 1, "method": method });
    ws.send(Message::Text(msg.to_string().into()))
        .await
        .map_err(|e| RelayError::BridgeError(format!("Send failed: {}", e)))?;

    while let Some(frame) = ws.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let resp: Value = serde_json::from_str(text.as_str())?;
                if let Some(error) = resp.get("error") {
                    return Err(RelayError::BridgeError(
                        error
                            .get("message")
                            .and_then(Value::as_str)
                            .unwrap_or("Unknown bridge error")
                            .to_string(),
                    ));
                }
                return Ok(resp.get("result").cloned().unwrap_or(Value::Null));
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                return Err(RelayError::BridgeError(format!("WebSocket error: {}", e)));
            }
        }
    }

    Err(RelayError::BridgeError(
        "Connection closed without response".to_string(),
    ))
}

/// Check if something is listening on the bridge port.
/// Plain TCP connect, so no half-open WebSocket is left on the bridge.
pub async fn is_bridge_running(port: u16) -> bool {
    TcpStream::connect(format!("127.0.0.1:{}", port)).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_origin_allowed() {
        assert!(is_origin_allowed(None));
        assert!(is_origin_allowed(Some("http://127.0.0.1:8080")));
        assert!(is_origin_allowed(Some("http://localhost/")));
        assert!(is_origin_allowed(Some("http://[::1]:8080")));
        assert!(is_origin_allowed(Some("chrome-extension://abcdefghijklmnop")));
        assert!(is_origin_allowed(Some("Chrome-Extension://abc")));
    }

    #[test]
    fn test_origin_rejected() {
        assert!(!is_origin_allowed(Some("http://127.0.0.1.evil.com")));
        assert!(!is_origin_allowed(Some("https://localhost")));
        assert!(!is_origin_allowed(Some("https://www.ixl.com")));
        assert!(!is_origin_allowed(Some("not-a-url")));
        assert!(!is_origin_allowed(Some("http://")));
    }

    #[test]
    fn test_parse_origin() {
        assert_eq!(parse_origin("http://127.0.0.1:8080"), Some(("http", "127.0.0.1", Some("8080"))));
        assert_eq!(parse_origin("http://[::1]"), Some(("http", "[::1]", None)));
        assert_eq!(parse_origin("chrome-extension://abcdef"), Some(("chrome-extension", "abcdef", None)));
        assert_eq!(parse_origin("http://"), None);
    }

    #[test]
    fn test_token_format() {
        let token = generate_token();
        assert!(token.starts_with(TOKEN_PREFIX));
        assert_eq!(token.len(), 4 + 32);
        assert_ne!(token, generate_token());
    }

    #[test]
    fn hello_checks_type_version_and_token() {
        let good = json!({ "type": "hello", "role": "extension", "token": "trl_x", "version": "0.1.3" });
        assert_eq!(check_hello(&good, "trl_x"), Ok("extension"));

        let not_hello = json!({ "type": "extension" });
        assert_eq!(check_hello(&not_hello, "trl_x"), Err(HelloRejection::NotHello));

        let old = json!({ "type": "hello", "role": "cli", "token": "trl_x", "version": "0.0.9" });
        assert_eq!(
            check_hello(&old, "trl_x"),
            Err(HelloRejection::VersionMismatch("0.0.9".to_string()))
        );

        let wrong = json!({ "type": "hello", "role": "cli", "token": "trl_y", "version": "0.1.0" });
        assert_eq!(check_hello(&wrong, "trl_x"), Err(HelloRejection::InvalidToken));
    }
}
