//! HTTP routing layer.
//!
//! | Route | Response |
//! |---|---|
//! | `GET /health` | `{"status":"OK"}` |
//! | `GET /{preset}/{path...}` | image bytes from [`TransformPipeline::handle`], or 404 |
//! | anything else | `404 - Not Found` |
//!
//! Every image response carries `Content-Type` (sniffed from the body),
//! `Cache-Control: public, max-age=86400` and `Content-Length`. Responses
//! read back from the store also carry an `ETag`.

use crate::config::ServerConfig;
use crate::pipeline::{ImageResponse, Outcome, TransformPipeline};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const CACHE_CONTROL: &str = "public, max-age=86400";
const NOT_FOUND_BODY: &str = "404 - Not Found";

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

/// Build the application router around a shared pipeline.
pub fn router(pipeline: Arc<TransformPipeline>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/{preset}/{*path}", get(resize))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}

async fn health() -> Json<Health> {
    Json(Health { status: "OK" })
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, NOT_FOUND_BODY)
}

async fn resize(
    State(pipeline): State<Arc<TransformPipeline>>,
    Path((preset, path)): Path<(String, String)>,
) -> Response {
    match pipeline.handle(&preset, &path).await {
        Outcome::NotFound => not_found().await.into_response(),
        Outcome::Image(image) => image_response(image),
    }
}

fn image_response(image: ImageResponse) -> Response {
    let mut headers = HeaderMap::new();
    match HeaderValue::from_str(&image.content_type) {
        Ok(value) => {
            headers.insert(header::CONTENT_TYPE, value);
        }
        Err(e) => warn!(content_type = %image.content_type, error = %e, "Unusable content type"),
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(image.body.len()));
    if let Some(etag) = image.etag.as_deref()
        && let Ok(value) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, value);
    }

    (StatusCode::OK, headers, image.body).into_response()
}

/// Bind `config.bind_addr()` and serve until SIGINT or SIGTERM.
pub async fn serve(
    pipeline: Arc<TransformPipeline>,
    config: &ServerConfig,
) -> Result<(), ServeError> {
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })?;

    serve_with_shutdown(listener, pipeline, config.graceful_timeout(), shutdown_signal()).await
}

/// Serve on `listener` until `shutdown` resolves.
///
/// After the shutdown future fires, in-flight requests get up to `grace`
/// to finish before the server task is aborted.
pub async fn serve_with_shutdown(
    listener: TcpListener,
    pipeline: Arc<TransformPipeline>,
    grace: Duration,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServeError> {
    info!(addr = %listener.local_addr()?, "Listening");

    let (signalled_tx, signalled_rx) = oneshot::channel();
    let app = router(Arc::clone(&pipeline));
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                let _ = signalled_tx.send(());
            })
            .await
    });

    tokio::select! {
        joined = &mut server => {
            joined??;
            info!(stats = %pipeline.stats(), "Server stopped");
            return Ok(());
        }
        Ok(()) = signalled_rx => {}
    }

    info!(timeout = ?grace, "Shutting down, waiting for in-flight requests");
    match tokio::time::timeout(grace, &mut server).await {
        Ok(joined) => joined??,
        Err(_) => {
            warn!("Graceful shutdown timed out, dropping remaining connections");
            server.abort();
        }
    }

    info!(stats = %pipeline.stats(), "Server stopped");
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
