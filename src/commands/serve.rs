use std::sync::Arc;

use colored::Colorize;

use tabrelay::bridge::{self, server};
use tabrelay::config::Config;
use tabrelay::error::{RelayError, Result};
use tabrelay::logging::VerbositySwitch;

use crate::cli::Cli;

pub async fn run(cli: &Cli, port: Option<u16>, verbosity: Arc<dyn VerbositySwitch>) -> Result<()> {
    let config = Config::load()?;
    let port = port.unwrap_or(config.bridge.port);

    if bridge::is_bridge_running(port).await {
        return Err(RelayError::BridgeError(format!(
            "Port {} is already in use. Is another `tabrelay serve` running?",
            port
        )));
    }

    let token = server::generate_token();
    server::write_token_file(&token).await.map_err(|e| {
        RelayError::BridgeError(format!(
            "Failed to write token file - check directory permissions: {}",
            e
        ))
    })?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "status": "listening",
                "url": format!("ws://127.0.0.1:{}", port),
                "token": token,
                "question_url": config.sites.question_url,
            })
        );
    } else {
        println!();
        println!("  {}", "tabrelay bridge".bold());
        println!("  {}", "─".repeat(40).dimmed());
        println!();
        println!("  {}  WebSocket server on ws://127.0.0.1:{}", "◆".cyan(), port);
        println!("  {}  Session token: {}", "◆".cyan(), token.yellow());
        println!("  {}  Question site: {}", "◆".cyan(), config.sites.question_url);
        println!();
        println!("  {}  Press Ctrl+C to stop", "ℹ".dimmed());
        println!();
    }

    bridge::serve(port, token, config, Some(verbosity)).await
}
