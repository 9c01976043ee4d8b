//! CLI entry and dispatch.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use folio_session::SessionClient;
use folio_session::config::Config;

use crate::logging;

mod commands;
mod navigator;

use navigator::StderrNavigator;

#[derive(Parser)]
#[command(name = "folio")]
#[command(version)]
#[command(about = "Folio reporting client session tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long, env = "FOLIO_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// End the current session
    Logout,
    /// Show the current session
    Status,
    /// Exchange the current token for a fresh one
    Refresh,
    /// Send an authenticated GET request
    Get {
        /// API path, relative to the configured base URL
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// Check whether a screen can be entered with the current session
    Route {
        /// Route name or path (login, forgot-password, dashboard, /reports, ...)
        #[arg(value_name = "ROUTE")]
        name: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Print the default config
    Generate,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init();

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Login { email, password } => {
            commands::auth::login(&session()?, &email, password).await
        }
        Commands::Logout => commands::auth::logout(&session()?).await,
        Commands::Refresh => commands::auth::refresh(&session()?).await,
        Commands::Status => {
            commands::status::show(&session()?);
            Ok(())
        }
        Commands::Get { path } => commands::request::get(&session()?, &path).await,
        Commands::Route { name } => {
            commands::route::enter(&session()?, &name);
            Ok(())
        }

        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Generate => commands::config::generate(),
        },
    }
}

/// Loads config and restores the stored session.
fn session() -> Result<SessionClient> {
    let config = Config::load().context("load config")?;
    let client = SessionClient::from_config(&config, Arc::new(StderrNavigator))?;
    client.effects().bootstrap();
    Ok(client)
}
