//! Native Messaging host that hands the extension its bridge connection details.
//!
//! Frames are a 4-byte little-endian length followed by that many bytes of UTF-8 JSON.

use std::io::{self, Read, Write};
use std::path::PathBuf;

use serde_json::{json, Value};

use super::server;
use crate::config::DEFAULT_BRIDGE_PORT;
use crate::error::{RelayError, Result};

/// Native messaging host name registered with the browser.
pub const NATIVE_HOST_NAME: &str = "com.tabrelay.bridge";

/// Browsers cap host-bound messages at 1 MiB.
const MAX_MESSAGE_LEN: usize = 1_048_576;

fn read_message(mut input: impl Read) -> io::Result<Value> {
    let mut len_bytes = [0u8; 4];
    input.read_exact(&mut len_bytes)?;
    let len = u32::from_le_bytes(len_bytes) as usize;

    if len > MAX_MESSAGE_LEN {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "Message too large"));
    }

    let mut buf = vec![0u8; len];
    input.read_exact(&mut buf)?;

    serde_json::from_slice(&buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn write_message(mut output: impl Write, msg: &Value) -> io::Result<()> {
    let payload = serde_json::to_vec(msg)?;
    let len = payload.len() as u32;
    output.write_all(&len.to_le_bytes())?;
    output.write_all(&payload)?;
    output.flush()
}

/// Build the reply to one native message.
async fn respond(msg: &Value) -> Value {
    let msg_type = msg.get("type").and_then(Value::as_str).unwrap_or("");

    match msg_type {
        "get_bridge_info" => {
            let port = server::read_port_file().await.unwrap_or(DEFAULT_BRIDGE_PORT);
            if !server::is_bridge_running(port).await {
                return json!({
                    "type": "error",
                    "error": "bridge_not_running",
                    "message": "Bridge is not running. Start it with `tabrelay serve`.",
                    "port": port,
                });
            }
            match server::read_token_file().await {
                Some(token) => json!({
                    "type": "bridge_info",
                    "port": port,
                    "token": token,
                    "bridge_running": true,
                }),
                None => json!({
                    "type": "error",
                    "error": "token_missing",
                    "message": "Bridge is running but no session token was found.",
                    "port": port,
                }),
            }
        }
        _ => json!({
            "type": "error",
            "error": "unknown_type",
            "message": format!("Unknown message type: {}", msg_type),
        }),
    }
}

/// Run as a Native Messaging host: one request on stdin, one reply on stdout.
pub async fn run() -> Result<()> {
    let msg = read_message(io::stdin().lock())
        .map_err(|e| RelayError::Other(format!("Failed to read native message: {}", e)))?;

    let response = respond(&msg).await;

    write_message(io::stdout().lock(), &response)
        .map_err(|e| RelayError::Other(format!("Failed to write native message: {}", e)))
}

/// Extension IDs are 32 characters in the range a-p.
pub fn validate_extension_id(id: &str) -> Result<()> {
    if id.len() == 32 && id.chars().all(|c| ('a'..='p').contains(&c)) {
        Ok(())
    } else {
        Err(RelayError::Other(format!(
            "Invalid extension id '{}': expected 32 characters a-p",
            id
        )))
    }
}

/// Platform-specific path for the native messaging host manifest.
pub fn native_host_manifest_path() -> Result<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        let home = dirs::home_dir()
            .ok_or_else(|| RelayError::Other("Cannot determine home directory".to_string()))?;
        Ok(home
            .join("Library/Application Support/Google/Chrome/NativeMessagingHosts")
            .join(format!("{}.json", NATIVE_HOST_NAME)))
    }

    #[cfg(not(target_os = "macos"))]
    {
        let config = dirs::config_dir()
            .ok_or_else(|| RelayError::Other("Cannot determine config directory".to_string()))?;
        #[cfg(target_os = "windows")]
        let dir = config.join("tabrelay");
        #[cfg(not(target_os = "windows"))]
        let dir = config.join("google-chrome/NativeMessagingHosts");
        Ok(dir.join(format!("{}.json", NATIVE_HOST_NAME)))
    }
}

pub fn generate_manifest(binary_path: &str, extension_id: &str) -> Value {
    json!({
        "name": NATIVE_HOST_NAME,
        "description": "tabrelay bridge connection host",
        "path": binary_path,
        "type": "stdio",
        "allowed_origins": [format!("chrome-extension://{}/", extension_id)],
    })
}

/// Install the manifest for `extension_id` and return where it was written.
pub fn install_manifest(extension_id: &str) -> Result<PathBuf> {
    validate_extension_id(extension_id)?;
    let manifest_path = native_host_manifest_path()?;

    let binary_path = std::env::current_exe()
        .map_err(|e| RelayError::Other(format!("Cannot determine binary path: {}", e)))?
        .to_string_lossy()
        .to_string();

    // Prefer the PATH-resolved binary when one is installed
    let resolved_path = which::which("tabrelay")
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or(binary_path);

    if let Some(parent) = manifest_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            RelayError::Other(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let content = serde_json::to_string_pretty(&generate_manifest(&resolved_path, extension_id))?;
    std::fs::write(&manifest_path, content).map_err(|e| {
        RelayError::Other(format!(
            "Failed to write native messaging host manifest to {}: {}",
            manifest_path.display(),
            e
        ))
    })?;

    Ok(manifest_path)
}

/// Remove the manifest. Returns false if none was installed.
pub fn uninstall_manifest() -> Result<bool> {
    let manifest_path = native_host_manifest_path()?;
    if !manifest_path.exists() {
        return Ok(false);
    }
    std::fs::remove_file(&manifest_path).map_err(|e| {
        RelayError::Other(format!(
            "Failed to remove native messaging host manifest: {}",
            e
        ))
    })?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXT_ID: &str = "abcdefghijklmnopabcdefghijklmnop";

    #[test]
    fn test_generate_manifest_structure() {
        let manifest = generate_manifest("/usr/local/bin/tabrelay", EXT_ID);
        assert_eq!(manifest["name"], NATIVE_HOST_NAME);
        assert_eq!(manifest["type"], "stdio");
        assert_eq!(manifest["path"], "/usr/local/bin/tabrelay");
        assert_eq!(
            manifest["allowed_origins"][0],
            format!("chrome-extension://{}/", EXT_ID)
        );
    }

    #[test]
    fn test_extension_id_validation() {
        assert!(validate_extension_id(EXT_ID).is_ok());
        assert!(validate_extension_id("short").is_err());
        assert!(validate_extension_id("zbcdefghijklmnopabcdefghijklmnop").is_err());
        assert!(validate_extension_id("ABCDEFGHIJKLMNOPABCDEFGHIJKLMNOP").is_err());
    }

    #[test]
    fn test_native_host_name_format() {
        assert!(NATIVE_HOST_NAME.contains('.'));
        assert!(NATIVE_HOST_NAME
            .chars()
            .all(|c| c.is_ascii_lowercase() || c == '.' || c == '_'));
    }

    #[test]
    fn frames_are_length_prefixed() {
        let mut buf = Vec::new();
        write_message(&mut buf, &json!({ "type": "get_bridge_info" })).unwrap();
        assert_eq!(u32::from_le_bytes(buf[..4].try_into().unwrap()) as usize, buf.len() - 4);

        let msg = read_message(buf.as_slice()).unwrap();
        assert_eq!(msg["type"], "get_bridge_info");
    }

    #[test]
    fn oversized_frame_is_refused() {
        let buf = (MAX_MESSAGE_LEN as u32 + 1).to_le_bytes();
        let err = read_message(buf.as_slice()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn unknown_request_type_is_an_error_reply() {
        let reply = respond(&json!({ "type": "get_token" })).await;
        assert_eq!(reply["type"], "error");
        assert_eq!(reply["error"], "unknown_type");
    }
}
