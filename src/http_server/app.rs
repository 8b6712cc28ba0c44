use std::{path::PathBuf, sync::Arc};

use axum::{
    Extension, Router,
    routing::{get, post, put},
};
use color_eyre::eyre::{Context, eyre};
#[cfg(debug_assertions)]
use tower_http::cors::CorsLayer;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    database::Database,
    http_server::{
        http_routes::{exports, lookups, stats, tapes, tracks},
        state::AppState,
    },
    services::lookup::LookupKind,
};

pub struct HttpServerConfig {
    pub port: u16,
    pub database: Database,
    /// Directory holding the browser front end, served for unmatched paths
    pub static_dir: Option<PathBuf>,
}

fn lookup_routes(
    router: Router<Arc<AppState>>,
    path: &str,
    kind: LookupKind,
) -> Router<Arc<AppState>> {
    router
        .route(
            path,
            get(lookups::list)
                .post(lookups::create)
                .layer(Extension(kind)),
        )
        .route(
            &format!("{path}/{{id}}"),
            put(lookups::rename)
                .delete(lookups::remove)
                .layer(Extension(kind)),
        )
}

pub fn build_router(app_state: Arc<AppState>, static_dir: Option<PathBuf>) -> Router {
    let router = Router::new()
        .route("/api/search_tapes", get(tapes::search_tapes))
        .route("/api/tapes", post(tapes::create_tape))
        .route(
            "/api/tapes/{id}",
            get(tapes::get_tape)
                .put(tapes::update_tape)
                .delete(tapes::delete_tape),
        )
        .route("/api/search_musicas", get(tracks::search_tracks))
        .route(
            "/api/musicas/{id}",
            get(tracks::get_track)
                .put(tracks::update_track)
                .delete(tracks::delete_track),
        )
        .route("/api/dashboard_data", get(stats::dashboard_data))
        .route("/api/stats/top_artistas_faixas", get(stats::top_artists))
        .route("/api/export/tapes", get(exports::export_tapes))
        .route("/api/export_musicas", get(exports::export_tracks));

    let router = lookup_routes(router, "/api/artistas", LookupKind::Artist);
    let router = lookup_routes(router, "/api/gravadoras", LookupKind::Label);
    let router = lookup_routes(router, "/api/etiquetas", LookupKind::Imprint);

    let router = match static_dir {
        Some(dir) => {
            log::info!("Serving front end from {}", dir.display());
            router.fallback_service(ServeDir::new(dir))
        }
        None => router,
    };

    let router = router
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // The front end is served from the same origin in release builds
    #[cfg(debug_assertions)]
    let router = router.layer(CorsLayer::permissive());

    router
}

pub async fn start(config: HttpServerConfig) -> color_eyre::Result<()> {
    let HttpServerConfig {
        port,
        database,
        static_dir,
    } = config;

    let app_state = Arc::new(AppState {
        db: Arc::new(database),
    });
    let app = build_router(app_state, static_dir);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .wrap_err_with(|| eyre!("Failed to bind to port {}", port))?;
    log::info!("Listening on 0.0.0.0:{port}");

    axum::serve(listener, app)
        .await
        .wrap_err("Failed to start HTTP server")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_db;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn test_app() -> Router {
        let db = test_db().await;
        build_router(Arc::new(AppState { db }), None)
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_named(app: &Router, path: &str, name: &str) -> i64 {
        let (status, body) = call(app, Method::POST, path, Some(json!({"nome": name}))).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_i64().unwrap()
    }

    async fn create_tape(app: &Router, numero_tape: &str) -> i64 {
        let artist = create_named(app, "/api/artistas", &format!("A-{numero_tape}")).await;
        let label = create_named(app, "/api/gravadoras", &format!("L-{numero_tape}")).await;
        let imprint = create_named(app, "/api/etiquetas", &format!("I-{numero_tape}")).await;

        let (status, body) = call(
            app,
            Method::POST,
            "/api/tapes",
            Some(json!({
                "titulo": format!("Fita {numero_tape}"),
                "numero_tape": numero_tape,
                "artista_id": artist,
                "gravadora_id": label,
                "etiqueta_id": imprint
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_stream_flag_round_trip() {
        let app = test_app().await;
        let tape_id = create_tape(&app, "T1").await;
        let uri = format!("/api/tapes/{tape_id}");

        let (status, body) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], json!(true));
        assert_eq!(body["data"]["status"], json!("not_stream"));
        assert_eq!(body["data"]["numero_tape"], json!("T1"));

        let (status, body) = call(&app, Method::PUT, &uri, Some(json!({"on_stream": "sim"}))).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["subiu_streaming"], json!(true));

        let (_, body) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(body["data"]["status"], json!("on_stream"));
    }

    #[tokio::test]
    async fn test_error_envelopes() {
        let app = test_app().await;
        let tape_id = create_tape(&app, "T1").await;

        let (status, body) = call(&app, Method::GET, "/api/tapes/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["ok"], json!(false));
        assert_eq!(body["error"], json!("Tape 999 not found"));

        let (status, body) = call(
            &app,
            Method::PUT,
            &format!("/api/tapes/{tape_id}"),
            Some(json!({"faixas": [{"numero": "abc", "musica": "X"}]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("Track number at position 1 must be an integer"));

        let (status, _) =
            call(&app, Method::POST, "/api/gravadoras", Some(json!({"nome": "L-T1"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = call(&app, Method::POST, "/api/etiquetas", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    }

    #[tokio::test]
    async fn test_listings() {
        let app = test_app().await;
        create_tape(&app, "T1").await;
        create_tape(&app, "T2").await;

        let (status, body) = call(&app, Method::GET, "/api/search_tapes?filtro=todos&limit=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_registros"], json!(2));
        assert_eq!(body["data"]["total_paginas"], json!(2));
        assert_eq!(body["data"]["pagina_atual"], json!(1));
        assert_eq!(body["data"]["tapes"][0]["artista"]["nome"], json!("A-T1"));
        assert_eq!(body["data"]["tapes"][0]["etiqueta"], json!("I-T1"));

        let (_, body) = call(&app, Method::GET, "/api/artistas?termo=t2", None).await;
        assert_eq!(body["data"]["artistas"], json!([{"id": 2, "nome": "A-T2"}]));

        let (_, body) = call(&app, Method::GET, "/api/gravadoras", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let (_, body) = call(&app, Method::GET, "/api/search_musicas?limit=0", None).await;
        assert_eq!(body["data"]["musicas"], json!([]));
        assert_eq!(body["data"]["total_paginas"], json!(1));
    }

    #[tokio::test]
    async fn test_huge_page_is_empty_not_an_error() {
        let app = test_app().await;
        create_tape(&app, "T1").await;

        for uri in [
            "/api/search_tapes?page=9223372036854775807",
            "/api/search_tapes?page=4611686018427387904&limit=3",
            "/api/artistas?page=9223372036854775807",
        ] {
            let (status, body) = call(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::OK, "{uri}: {body}");
            assert_eq!(body["ok"], json!(true));
            assert_eq!(body["data"]["total_registros"], json!(1), "{uri}");
            assert_eq!(body["data"]["total_paginas"], json!(1), "{uri}");
        }

        let (_, body) = call(&app, Method::GET, "/api/search_tapes?page=9223372036854775807", None).await;
        assert_eq!(body["data"]["tapes"], json!([]));
        assert_eq!(body["data"]["pagina_atual"].as_u64(), Some(i64::MAX as u64));

        let (_, body) = call(&app, Method::GET, "/api/artistas?page=9223372036854775807", None).await;
        assert_eq!(body["data"]["artistas"], json!([]));
    }

    #[tokio::test]
    async fn test_tracks_and_stats() {
        let app = test_app().await;
        let tape_id = create_tape(&app, "T1").await;

        let (status, _) = call(
            &app,
            Method::PUT,
            &format!("/api/tapes/{tape_id}"),
            Some(json!({"faixas": [
                {"numero": "1", "musica": "Abertura"},
                {"numero": "2", "musica": "Final"}
            ]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&app, Method::GET, "/api/search_musicas?termo=final", None).await;
        let track_id = body["data"]["musicas"][0]["id"].as_i64().unwrap();
        assert_eq!(body["data"]["musicas"][0]["numero_tape"], json!("T1"));

        let (status, body) = call(
            &app,
            Method::PUT,
            &format!("/api/musicas/{track_id}"),
            Some(json!({"isrc": "BRXYZ"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["isrc"], json!("BRXYZ"));

        let (_, body) = call(&app, Method::GET, "/api/stats/top_artistas_faixas", None).await;
        assert_eq!(body["data"], json!([{"nome": "A-T1", "qtd": 2}]));

        let (_, body) = call(&app, Method::GET, "/api/dashboard_data", None).await;
        assert_eq!(body["data"]["stats"]["total"], json!(1));
        assert_eq!(body["data"]["stats"]["nao_subiu"], json!(1));

        let (status, _) = call(&app, Method::DELETE, &format!("/api/musicas/{track_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, Method::GET, &format!("/api/musicas/{track_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_lookup_delete_policy() {
        let app = test_app().await;
        let tape_id = create_tape(&app, "T1").await;

        let (status, _) = call(&app, Method::DELETE, "/api/artistas/1", None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = call(&app, Method::DELETE, &format!("/api/tapes/{tape_id}"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, Method::DELETE, "/api/artistas/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok": true}));

        let (status, body) =
            call(&app, Method::PUT, "/api/artistas/1", Some(json!({"nome": "Outro"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
    }

    #[tokio::test]
    async fn test_csv_export_headers() {
        let app = test_app().await;
        create_tape(&app, "T1").await;

        let request = Request::builder()
            .uri("/api/export/tapes?export_all=True")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"tapes_export.csv\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert_eq!(text.lines().count(), 2);

        let request = Request::builder()
            .uri("/api/export_musicas")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/csv")
        );
    }

    #[tokio::test]
    async fn test_static_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>Catálogo</h1>").unwrap();
        let app = build_router(
            Arc::new(AppState { db: test_db().await }),
            Some(dir.path().to_path_buf()),
        );

        let request = Request::builder()
            .uri("/index.html")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], "<h1>Catálogo</h1>".as_bytes());
    }
}
