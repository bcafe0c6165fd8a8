use std::str::FromStr;

use colored::Colorize;
use dialoguer::Confirm;

use tabrelay::config::Config;
use tabrelay::error::{RelayError, Result};

use crate::cli::{Cli, ConfigCommands};

pub async fn run(cli: &Cli, command: &ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => show(cli).await,
        ConfigCommands::Set { key, value } => set(cli, key, value).await,
        ConfigCommands::Get { key } => get(cli, key).await,
        ConfigCommands::Path => path(cli).await,
        ConfigCommands::Reset => reset(cli).await,
    }
}

async fn show(cli: &Cli) -> Result<()> {
    let config = Config::load()?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| RelayError::ConfigError(e.to_string()))?;
        println!("{}", toml_str);
    }

    Ok(())
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        RelayError::ConfigError(format!("{} must be a non-negative integer, got '{}'", key, value))
    })
}

fn unknown_key(key: &str) -> RelayError {
    RelayError::ConfigError(format!("Unknown config key: {}", key))
}

/// Apply one `key = value` assignment.
fn assign(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "bridge.port" => config.bridge.port = parse(key, value)?,
        "bridge.command_timeout_ms" => config.bridge.command_timeout_ms = parse(key, value)?,
        "relay.max_attempts" => {
            let attempts: u32 = parse(key, value)?;
            if attempts == 0 {
                return Err(RelayError::ConfigError(
                    "relay.max_attempts must be at least 1".to_string(),
                ));
            }
            config.relay.max_attempts = attempts;
        }
        "relay.retry_delay_ms" => config.relay.retry_delay_ms = parse(key, value)?,
        "relay.settle_delay_ms" => config.relay.settle_delay_ms = parse(key, value)?,
        "relay.restore_delay_ms" => config.relay.restore_delay_ms = parse(key, value)?,
        "sites.question_url" => config.sites.question_url = value.to_string(),
        "sites.question_host" => config.sites.question_host = value.to_string(),
        "sites.settings_page" => config.sites.settings_page = value.to_string(),
        "sites.settings_width" => config.sites.settings_width = parse(key, value)?,
        "sites.settings_height" => config.sites.settings_height = parse(key, value)?,
        _ => return Err(unknown_key(key)),
    }
    Ok(())
}

fn lookup(config: &Config, key: &str) -> Result<String> {
    let value = match key {
        "bridge.port" => config.bridge.port.to_string(),
        "bridge.command_timeout_ms" => config.bridge.command_timeout_ms.to_string(),
        "relay.max_attempts" => config.relay.max_attempts.to_string(),
        "relay.retry_delay_ms" => config.relay.retry_delay_ms.to_string(),
        "relay.settle_delay_ms" => config.relay.settle_delay_ms.to_string(),
        "relay.restore_delay_ms" => config.relay.restore_delay_ms.to_string(),
        "sites.question_url" => config.sites.question_url.clone(),
        "sites.question_host" => config.sites.question_host.clone(),
        "sites.settings_page" => config.sites.settings_page.clone(),
        "sites.settings_width" => config.sites.settings_width.to_string(),
        "sites.settings_height" => config.sites.settings_height.to_string(),
        _ => return Err(unknown_key(key)),
    };
    Ok(value)
}

async fn set(_cli: &Cli, key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;
    assign(&mut config, key, value)?;
    config.save()?;
    println!("{} Set {} = {}", "✓".green(), key, value);

    Ok(())
}

async fn get(cli: &Cli, key: &str) -> Result<()> {
    let config = Config::load()?;
    let value = lookup(&config, key)?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "key": key,
                "value": value
            })
        );
    } else {
        println!("{}", value);
    }

    Ok(())
}

async fn reset(cli: &Cli) -> Result<()> {
    let path = Config::config_path();

    if !path.exists() {
        if cli.json {
            println!(
                "{}",
                serde_json::json!({ "status": "no_config", "path": path.display().to_string() })
            );
        } else {
            println!("{} No config file to remove.", "✓".green());
        }
        return Ok(());
    }

    if !cli.json {
        let confirm = Confirm::new()
            .with_prompt(format!("Delete {}?", path.display()))
            .default(false)
            .interact()
            .map_err(|e| RelayError::Other(format!("Prompt failed: {}", e)))?;

        if !confirm {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    std::fs::remove_file(&path)?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "status": "removed", "path": path.display().to_string() })
        );
    } else {
        println!(
            "{} Config removed: {}",
            "✓".green(),
            path.display().to_string().dimmed()
        );
    }

    Ok(())
}

async fn path(cli: &Cli) -> Result<()> {
    let path = Config::config_path();

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "path": path.display().to_string()
            })
        );
    } else {
        println!("{}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_and_lookup_agree() {
        let mut config = Config::default();
        assign(&mut config, "relay.restore_delay_ms", "1500").unwrap();
        assign(&mut config, "sites.question_host", "quiz.example").unwrap();

        assert_eq!(lookup(&config, "relay.restore_delay_ms").unwrap(), "1500");
        assert_eq!(lookup(&config, "sites.question_host").unwrap(), "quiz.example");
    }

    #[test]
    fn bad_values_are_rejected() {
        let mut config = Config::default();
        assert!(assign(&mut config, "bridge.port", "not-a-port").is_err());
        assert!(assign(&mut config, "relay.max_attempts", "0").is_err());
        assert!(assign(&mut config, "relay.colour", "blue").is_err());
        assert_eq!(config, Config::default());
    }
}
