//! HTTP server for the margin report.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/health`         | Health check                         |
//! | POST   | `/api/upload`     | Upload an export, get the report     |
//! | GET    | `/api/logs`       | SSE stream for real-time logs        |

use axum::{
    extract::{Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, LOG_BROADCASTER};
use super::types::{error_response, UploadResponse};
use crate::config::Settings;
use crate::error::{ServerError, ServerResult};
use crate::transform::pipeline::run_bytes;

type ApiError = (StatusCode, Json<Value>);

/// Build the router. Settings are shared read-only between requests.
pub fn router(settings: Settings) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/upload", post(upload_export))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(Arc::new(settings))
}

/// Start the HTTP server
pub async fn start_server(port: u16, settings: Settings) -> ServerResult<()> {
    let app = router(settings);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    eprintln!("🚀 Marges server running on http://localhost:{}", port);
    eprintln!("   POST /api/upload - Upload export file");
    eprintln!("   GET  /api/logs   - SSE log stream");
    eprintln!("   GET  /health     - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "marges",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "POST /api/upload",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload endpoint: multipart field `file` holding the CSV export
async fn upload_export(
    State(settings): State<Arc<Settings>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(ServerError::BadRequest(format!("Multipart error: {}", e))))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| bad_request(ServerError::BadRequest(format!("Read error: {}", e))))?;
            file_data = Some(bytes.to_vec());
        }
    }

    let bytes = file_data.ok_or_else(|| bad_request(ServerError::BadRequest("No file provided".into())))?;

    eprintln!(
        "📄 NEW UPLOAD: {} ({} bytes)",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len()
    );

    let output = tokio::task::spawn_blocking(move || run_bytes(&bytes, &settings))
        .await
        .map_err(|e| {
            log_error(format!("Worker failed: {}", e));
            (StatusCode::INTERNAL_SERVER_ERROR, Json(error_response(&e.to_string())))
        })?
        .map_err(|e| {
            let err = ServerError::from(e);
            log_error(err.to_string());
            (StatusCode::UNPROCESSABLE_ENTITY, Json(error_response(&err.to_string())))
        })?;

    Ok(Json(UploadResponse::from(output)))
}

fn bad_request(err: ServerError) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(error_response(&err.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const BOUNDARY: &str = "marges-boundary";

    fn multipart_body(field: &str, content: &str) -> String {
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"export.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n{content}\r\n--{b}--\r\n",
            b = BOUNDARY,
        )
    }

    async fn upload(body: String) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();

        let response = router(Settings::default()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "marges");
    }

    #[test]
    fn test_router_builds() {
        let _ = router(Settings::default());
    }

    #[tokio::test]
    async fn test_upload_without_file_field() {
        let (status, body) = upload(multipart_body("attachment", "TYPE;Lot\nACHAT;L1\n")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert!(body["error"].as_str().unwrap().contains("No file provided"));
    }

    #[tokio::test]
    async fn test_upload_failing_export() {
        let (status, body) = upload(multipart_body("file", "TYPE;Lot\nACHAT;L1\n")).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["status"], "error");
        assert!(body["error"].as_str().unwrap().contains("Raison C/F"));
        assert_eq!(body["groups"], json!([]));
    }

    #[tokio::test]
    async fn test_upload_export() {
        let export = "\
TYPE;Raison C/F;Date;Lot;Désignation;Poids;UN;PU;Résultat
ACHAT;Dupont;20240312;L2403120001;Pommes;10;KG;1;5
VENTE;Dupont;20240312;L2403120001;Pommes;10;KG;1;2
";
        let (status, body) = upload(multipart_body("file", export)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
        assert_eq!(body["groups"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_bad_request_body() {
        let (status, Json(body)) = bad_request(ServerError::BadRequest("No file provided".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("No file provided"));
    }
}
