mod cli;
mod commands;

use std::sync::Arc;

use clap::Parser;

use cli::Cli;
use tabrelay::bridge::native_messaging;
use tabrelay::error::Result;
use tabrelay::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // The browser launches native messaging hosts with the caller origin as an argument
    if std::env::args().skip(1).any(|a| a.starts_with("chrome-extension://")) {
        return native_messaging::run().await;
    }

    let cli = Cli::parse();
    let log = logging::init(cli.verbose);
    cli.run(Arc::new(log)).await
}
