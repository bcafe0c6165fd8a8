use std::sync::Arc;

use clap::{Parser, Subcommand};

use tabrelay::error::Result;
use tabrelay::logging::VerbositySwitch;

use crate::commands;

/// tabrelay - relay questions between a quiz tab and an AI chat tab
#[derive(Parser)]
#[command(name = "tabrelay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the extension bridge and the relay (blocks until Ctrl+C)
    Serve {
        /// WebSocket port on 127.0.0.1 (defaults to bridge.port from config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show whether the bridge is running and what the relay is tracking
    Status {
        /// Bridge port (defaults to bridge.port from config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Native messaging host registration
    Host {
        #[command(subcommand)]
        command: HostCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., relay.max_attempts)
        key: String,
        /// Value to set
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Show configuration file path
    Path,

    /// Delete the configuration file
    Reset,
}

#[derive(Subcommand)]
pub enum HostCommands {
    /// Register the native messaging host for an extension
    Install {
        /// ID of the extension allowed to talk to the host
        #[arg(long)]
        extension_id: String,
    },

    /// Remove the native messaging host manifest
    Uninstall,

    /// Show where the manifest is installed
    Path,
}

impl Cli {
    pub async fn run(&self, verbosity: Arc<dyn VerbositySwitch>) -> Result<()> {
        match &self.command {
            Commands::Serve { port } => commands::serve::run(self, *port, verbosity).await,
            Commands::Status { port } => commands::status::run(self, *port).await,
            Commands::Config { command } => commands::config::run(self, command).await,
            Commands::Host { command } => commands::host::run(self, command).await,
        }
    }
}
