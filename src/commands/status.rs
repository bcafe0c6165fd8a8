use colored::Colorize;
use serde_json::Value;

use tabrelay::bridge;
use tabrelay::config::Config;
use tabrelay::error::Result;

use crate::cli::Cli;

pub async fn run(cli: &Cli, port: Option<u16>) -> Result<()> {
    let port = match port {
        Some(p) => p,
        None => Config::load()?.bridge.port,
    };

    if !bridge::is_bridge_running(port).await {
        if cli.json {
            println!(
                "{}",
                serde_json::json!({ "running": false, "port": port })
            );
        } else {
            println!("  {} Bridge is not running on port {}", "✗".red(), port);
            println!("  {}  Start it with `tabrelay serve`", "ℹ".dimmed());
        }
        return Ok(());
    }

    let status = bridge::send_command(port, "relay.status").await?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "running": true, "port": port, "relay": status })
        );
        return Ok(());
    }

    println!("  {} Bridge is running on port {}", "✓".green(), port);

    let connected = status["extension_connected"].as_bool().unwrap_or(false);
    if connected {
        println!("  {} Extension connected", "✓".green());
    } else {
        println!("  {} Extension not connected", "!".yellow());
    }

    let registry = &status["registry"];
    println!(
        "  {}  Provider:      {}",
        "◆".cyan(),
        registry["aiProvider"].as_str().unwrap_or("-")
    );
    println!("  {}  Question tab:  {}", "◆".cyan(), describe_tab(&registry["questionTab"]));
    println!("  {}  Answer tab:    {}", "◆".cyan(), describe_tab(&registry["answerTab"]));
    println!(
        "  {}  Last focused:  {}",
        "◆".cyan(),
        describe_tab(&registry["lastFocusedTab"])
    );
    if status["busy"].as_bool().unwrap_or(false) {
        println!("  {}  A question cycle is in progress", "ℹ".dimmed());
    }

    Ok(())
}

fn describe_tab(tab: &Value) -> String {
    match (tab["tabId"].as_i64(), tab["windowId"].as_i64()) {
        (Some(tab_id), Some(window_id)) => format!("tab {} (window {})", tab_id, window_id),
        _ => "(none)".dimmed().to_string(),
    }
}
