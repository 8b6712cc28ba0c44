use sea_orm::{DbErr, SqlErr};

/// Failures surfaced by catalog operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(#[source] DbErr),
    #[error("{0:#}")]
    Other(color_eyre::Report),
}

impl CatalogError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<DbErr> for CatalogError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                Self::Conflict(format!("Duplicate value violates a unique constraint: {detail}"))
            }
            _ => Self::Database(err),
        }
    }
}

impl From<color_eyre::Report> for CatalogError {
    fn from(report: color_eyre::Report) -> Self {
        Self::Other(report)
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
