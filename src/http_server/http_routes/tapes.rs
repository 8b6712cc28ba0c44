use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::IntoResponse,
};
use serde_json::Value;

use super::parse_body;
use crate::http_server::error::ApiResult;
use crate::http_server::query_builder::{TapeSearchParams, TapeSearchQuery};
use crate::http_server::response::{created, done, ok};
use crate::http_server::state::AppState;
use crate::services::tape::{TapePayload, TapeService};

pub async fn search_tapes(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<TapeSearchQuery>,
) -> ApiResult<impl IntoResponse> {
    let params = TapeSearchParams::from(&query);
    let page = TapeService::new(app_state.db.clone())
        .search_tapes(&params)
        .await?;
    Ok(ok(page.into_listing("tapes")?))
}

pub async fn get_tape(
    State(app_state): State<Arc<AppState>>,
    Path(tape_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let tape = TapeService::new(app_state.db.clone())
        .get_tape(tape_id)
        .await?;
    Ok(ok(tape))
}

pub async fn create_tape(
    State(app_state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let payload: TapePayload = parse_body(body)?;
    let tape = TapeService::new(app_state.db.clone())
        .create_tape(&payload)
        .await?;
    Ok(created(tape))
}

pub async fn update_tape(
    State(app_state): State<Arc<AppState>>,
    Path(tape_id): Path<i32>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let payload: TapePayload = parse_body(body)?;
    log::debug!("Update of tape {tape_id} requested: {payload:?}");

    let update = TapeService::new(app_state.db.clone())
        .update_tape(tape_id, &payload)
        .await?;
    Ok(ok(update))
}

pub async fn delete_tape(
    State(app_state): State<Arc<AppState>>,
    Path(tape_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    TapeService::new(app_state.db.clone())
        .delete_tape(tape_id)
        .await?;
    Ok(done())
}
