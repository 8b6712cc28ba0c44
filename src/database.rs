use color_eyre::{Result, eyre::Context};
use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database as SeaDatabase, DatabaseConnection};
use std::path::Path;
use std::time::Duration;

/// Handle to the catalog store, shared with request handlers through `AppState`.
pub struct Database {
    pub conn: DatabaseConnection,
}

impl Database {
    /// Connect to the store at `url` and bring its schema up to date
    pub async fn open(url: &str) -> Result<Self> {
        log::debug!("Opening database at: {}", url);

        // Create parent directories for SQLite files
        if let Some(path) = sqlite_file_path(url)
            && let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context(format!(
                "Failed to create database directory: {}",
                parent.display()
            ))?;
        }

        let mut opt = ConnectOptions::new(url.to_owned());
        opt.max_connections(16)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(8))
            .acquire_timeout(Duration::from_secs(8))
            .sqlx_logging(false);

        let conn = SeaDatabase::connect(opt)
            .await
            .context(format!("Failed to open database: {}", url))?;

        let database = Self::from_connection(conn).await?;
        log::info!("Database ready at: {}", url);
        Ok(database)
    }

    /// Wrap an existing connection, running pending migrations first
    pub async fn from_connection(conn: DatabaseConnection) -> Result<Self> {
        log::debug!("Running database migrations");
        migration::Migrator::up(&conn, None)
            .await
            .context("Failed to run database migrations")?;

        Ok(Database { conn })
    }
}

/// Extracts the file path from a `sqlite://path?query` URL, if it names a file.
fn sqlite_file_path(url: &str) -> Option<&Path> {
    let rest = url.strip_prefix("sqlite://")?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Some(Path::new(path))
}
