use axum::{Json, extract::rejection::JsonRejection};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::CatalogError;
use crate::http_server::error::{ApiError, ApiResult};

pub mod exports;
pub mod lookups;
pub mod stats;
pub mod tapes;
pub mod tracks;

/// Decode a JSON body leniently: malformed bodies become 400s in the usual
/// envelope and a `null` body reads as `{}`.
pub(crate) fn parse_body<T: DeserializeOwned>(
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<T> {
    let Json(value) = body.map_err(|rejection| {
        CatalogError::validation(format!("Invalid JSON body: {}", rejection.body_text()))
    })?;
    let value = if value.is_null() {
        Value::Object(Default::default())
    } else {
        value
    };

    serde_json::from_value(value).map_err(|err| {
        ApiError::from(CatalogError::validation(format!("Invalid request body: {err}")))
    })
}
