//! Draft broadcast server binary
//!
//! Usage: cargo run -p draftwatch_web --bin draftwatch-server -- --port 8080

use clap::Parser;
use draftwatch_web::{init_logging, AppSettings, LogFormat, WebServer};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "draftwatch-server",
    about = "Broadcast a live card draft to read-only viewers"
)]
struct ServerCli {
    /// TOML settings file (also read from DRAFTWATCH_CONFIG)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long, short = 'p', env = "PORT")]
    port: Option<u16>,
    /// Card data JSON file
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// SQLite file for sessions; omit to keep them in memory
    #[arg(long)]
    database: Option<PathBuf>,
    #[arg(long)]
    asset_base_url: Option<String>,
    #[arg(long)]
    log_format: Option<LogFormat>,
}

impl ServerCli {
    fn apply(self, settings: &mut AppSettings) {
        if let Some(host) = self.host {
            settings.host = host;
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if self.catalog.is_some() {
            settings.catalog_path = self.catalog;
        }
        if self.database.is_some() {
            settings.database_path = self.database;
        }
        if let Some(url) = self.asset_base_url {
            settings.asset_base_url = url;
        }
        if let Some(format) = self.log_format {
            settings.log_format = format;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut cli = ServerCli::parse();
    let mut settings = AppSettings::load(cli.config.take().as_deref())?;
    cli.apply(&mut settings);
    settings.validate()?;

    init_logging(settings.log_format)?;

    tracing::info!(
        host = %settings.host,
        port = settings.port,
        database = ?settings.database_path,
        catalog = ?settings.catalog_path,
        "starting draft server"
    );

    let handle = WebServer::from_settings(&settings)?.start().await?;
    tracing::info!(address = %handle.address(), "server running; press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;

    tracing::info!("shutting down server");
    handle.shutdown().await?;
    tracing::info!("server stopped cleanly");

    Ok(())
}
