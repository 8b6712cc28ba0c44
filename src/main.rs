mod coerce;
mod config;
mod database;
mod entities;
mod error;
mod http_server;
mod logging;
mod services;
mod tape_status;
#[cfg(test)]
mod test_utils;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre::Context};

use crate::{
    config::Config, database::Database, http_server::app::HttpServerConfig,
    logging::setup_logging,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "TAPE_CATALOG_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log level (default: info)
    #[arg(long, default_value = "info", global = true, env = "LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn is_directory(s: &str) -> Result<PathBuf, String> {
    let p: PathBuf = s.into();
    if p.is_dir() {
        Ok(p)
    } else {
        Err(format!("`{}` is not an existing directory", s))
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the catalog API
    Serve {
        /// The port to run the server on (default: 5005)
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Database URL or SQLite file path
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,

        /// Directory with the browser front end
        #[arg(long, value_parser = is_directory, env = "TAPE_CATALOG_STATIC_DIR")]
        static_dir: Option<PathBuf>,
    },
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    setup_logging(args.log_level, args.log_file.clone())?;

    log::debug!("Tape catalog starting");
    log::debug!("Loading configuration");

    let config = {
        if let Some(config) = args.config {
            Config::from_file(&config)
        } else {
            Config::load()
        }
    }
    .with_context(|| "Failed to load tape-catalog config")?;

    match args.command {
        Commands::Config(config_commands) => match config_commands {
            ConfigCommands::CreateDefault => {
                log::debug!("Creating default config");
                let path = Config::create_default()?;
                log::info!("Default config available at {}", path.display());
            }
            ConfigCommands::Path => match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            },
        },
        Commands::Serve {
            port,
            database_url,
            static_dir,
        } => {
            let port = port.unwrap_or_else(|| config.port());
            let database_url = database_url
                .map(|setting| crate::config::database_url(&setting))
                .unwrap_or_else(|| config.database_url());
            let static_dir = static_dir.or_else(|| config.static_dir());

            let database = Database::open(&database_url).await?;

            log::info!("Starting HTTP server on port: {}", port);
            http_server::app::start(HttpServerConfig {
                port,
                database,
                static_dir,
            })
            .await?;
        }
    }

    Ok(())
}
