use axum::{
    Json,
    body::Body,
    http::{Response, StatusCode},
    response::IntoResponse,
};

use crate::error::CatalogError;
use crate::http_server::response::Envelope;

// A catalog error on its way out of a handler.
// Produced via `?` on anything convertible into `CatalogError`.
pub struct ApiError(CatalogError);

pub type ApiResult<T> = Result<T, ApiError>;

impl std::fmt::Debug for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<E> From<E> for ApiError
where
    E: Into<CatalogError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
            CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
            CatalogError::Conflict(_) => StatusCode::CONFLICT,
            CatalogError::Database(_) | CatalogError::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// Tell axum how to convert `ApiError` into a response.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response<Body> {
        let status = self.status();

        // Store failures keep their details in the log only
        let message = if status.is_server_error() {
            log::error!("{:?}", color_eyre::Report::new(self.0));
            "Something went wrong".to_string()
        } else {
            log::debug!("Request rejected ({status}): {}", self.0);
            self.0.to_string()
        };

        (status, Json(Envelope::failure(message))).into_response()
    }
}
