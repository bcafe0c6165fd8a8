use colored::Colorize;

use tabrelay::bridge::native_messaging;
use tabrelay::error::Result;

use crate::cli::{Cli, HostCommands};

pub async fn run(cli: &Cli, command: &HostCommands) -> Result<()> {
    match command {
        HostCommands::Install { extension_id } => install(cli, extension_id),
        HostCommands::Uninstall => uninstall(cli),
        HostCommands::Path => path(cli),
    }
}

fn install(cli: &Cli, extension_id: &str) -> Result<()> {
    let manifest_path = native_messaging::install_manifest(extension_id)?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "status": "installed",
                "host": native_messaging::NATIVE_HOST_NAME,
                "path": manifest_path.display().to_string(),
            })
        );
    } else {
        println!(
            "  {} Native messaging host installed: {}",
            "✓".green(),
            manifest_path.display().to_string().dimmed()
        );
        println!(
            "  {}  Reload the extension so it picks up the host",
            "ℹ".dimmed()
        );
    }

    Ok(())
}

fn uninstall(cli: &Cli) -> Result<()> {
    let removed = native_messaging::uninstall_manifest()?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "status": if removed { "removed" } else { "not_installed" } })
        );
    } else if removed {
        println!("  {} Native messaging host removed", "✓".green());
    } else {
        println!("  {} Native messaging host was not installed", "✓".green());
    }

    Ok(())
}

fn path(cli: &Cli) -> Result<()> {
    let path = native_messaging::native_host_manifest_path()?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "path": path.display().to_string(),
                "installed": path.exists(),
            })
        );
    } else {
        println!("{}", path.display());
    }

    Ok(())
}
