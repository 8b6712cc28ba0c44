use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use color_eyre::Result;
use color_eyre::eyre::Context;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. `log` records are bridged into it, and
/// `RUST_LOG` takes precedence over `level` when set.
pub fn setup_logging(level: log::LevelFilter, log_file: Option<PathBuf>) -> Result<()> {
    let filter_layer = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directives(level))
            .wrap_err("Failed to create tracing filter")?,
    };

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .wrap_err_with(|| format!("Failed to open log file: {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .wrap_err("Failed to install log subscriber")?;

    Ok(())
}

fn default_directives(level: log::LevelFilter) -> String {
    if level == log::LevelFilter::Off {
        return "off".to_string();
    }
    let level = level.to_string().to_lowercase();
    // sqlx statement logs are noisy below warn
    format!("{level},sqlx=warn")
}
