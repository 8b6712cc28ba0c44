use std::sync::Arc;

use axum::{extract::State, response::IntoResponse};

use crate::http_server::error::ApiResult;
use crate::http_server::response::ok;
use crate::http_server::state::AppState;
use crate::services::stats::StatsService;

pub async fn dashboard_data(
    State(app_state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let dashboard = StatsService::new(app_state.db.clone()).dashboard().await?;
    Ok(ok(dashboard))
}

pub async fn top_artists(State(app_state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let top = StatsService::new(app_state.db.clone())
        .top_artists_by_tracks()
        .await?;
    Ok(ok(top))
}
