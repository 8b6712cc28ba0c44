use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::IntoResponse,
};
use serde_json::Value;

use super::parse_body;
use crate::http_server::error::ApiResult;
use crate::http_server::query_builder::{TrackSearchParams, TrackSearchQuery};
use crate::http_server::response::{done, ok};
use crate::http_server::state::AppState;
use crate::services::track::{TrackInput, TrackService};

pub async fn search_tracks(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<TrackSearchQuery>,
) -> ApiResult<impl IntoResponse> {
    let params = TrackSearchParams::from(&query);
    let page = TrackService::new(app_state.db.clone())
        .search_tracks(&params)
        .await?;
    Ok(ok(page.into_listing("musicas")?))
}

pub async fn get_track(
    State(app_state): State<Arc<AppState>>,
    Path(track_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let track = TrackService::new(app_state.db.clone())
        .get_track(track_id)
        .await?;
    Ok(ok(track))
}

pub async fn update_track(
    State(app_state): State<Arc<AppState>>,
    Path(track_id): Path<i32>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let input: TrackInput = parse_body(body)?;
    let track = TrackService::new(app_state.db.clone())
        .update_track(track_id, &input)
        .await?;
    Ok(ok(track))
}

pub async fn delete_track(
    State(app_state): State<Arc<AppState>>,
    Path(track_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    TrackService::new(app_state.db.clone())
        .delete_track(track_id)
        .await?;
    Ok(done())
}
