use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde_json::Value;

use super::parse_body;
use crate::http_server::error::ApiResult;
use crate::http_server::response::{created, done, ok};
use crate::http_server::state::AppState;
use crate::services::lookup::{ArtistSearchQuery, LookupKind, LookupService, NamePayload};

/// Artists come back paged and searchable; labels and imprints as a full list.
pub async fn list(
    State(app_state): State<Arc<AppState>>,
    Extension(kind): Extension<LookupKind>,
    Query(query): Query<ArtistSearchQuery>,
) -> ApiResult<Response> {
    let service = LookupService::new(app_state.db.clone());
    let response = match kind {
        LookupKind::Artist => {
            let page = service.search_artists(&query).await?;
            ok(page.into_listing("artistas")?).into_response()
        }
        LookupKind::Label | LookupKind::Imprint => ok(service.list(kind).await?).into_response(),
    };
    Ok(response)
}

pub async fn create(
    State(app_state): State<Arc<AppState>>,
    Extension(kind): Extension<LookupKind>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let payload: NamePayload = parse_body(body)?;
    let record = LookupService::new(app_state.db.clone())
        .create(kind, &payload)
        .await?;
    Ok(created(record))
}

pub async fn rename(
    State(app_state): State<Arc<AppState>>,
    Extension(kind): Extension<LookupKind>,
    Path(id): Path<i32>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let payload: NamePayload = parse_body(body)?;
    let record = LookupService::new(app_state.db.clone())
        .rename(kind, id, &payload)
        .await?;
    Ok(ok(record))
}

pub async fn remove(
    State(app_state): State<Arc<AppState>>,
    Extension(kind): Extension<LookupKind>,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    LookupService::new(app_state.db.clone())
        .delete(kind, id)
        .await?;
    Ok(done())
}
