use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};

use crate::http_server::error::ApiResult;
use crate::http_server::state::AppState;
use crate::services::export::{
    ExportService, TAPE_EXPORT_FILENAME, TRACK_EXPORT_FILENAME, TapeExportQuery, TapeSelection,
};

fn csv_attachment(filename: &str, body: Vec<u8>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
}

pub async fn export_tapes(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<TapeExportQuery>,
) -> ApiResult<impl IntoResponse> {
    let selection = TapeSelection::from(&query);
    let body = ExportService::new(app_state.db.clone())
        .export_tapes(&selection)
        .await?;
    Ok(csv_attachment(TAPE_EXPORT_FILENAME, body))
}

pub async fn export_tracks(State(app_state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let body = ExportService::new(app_state.db.clone())
        .export_tracks()
        .await?;
    Ok(csv_attachment(TRACK_EXPORT_FILENAME, body))
}
