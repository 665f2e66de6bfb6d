//! HTTP server for the Prometheus scrape endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::fetcher::Fetcher;
use crate::projector::Projector;

/// Content type of the OpenMetrics text exposition.
pub const OPENMETRICS_CONTENT_TYPE: &str =
    "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Header Prometheus sends with the scrape timeout of the target.
pub const SCRAPE_TIMEOUT_HEADER: &str = "x-prometheus-scrape-timeout-seconds";

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    fetcher: Arc<Fetcher>,
    projector: Projector,
    metrics_path: Arc<str>,
}

/// Create the HTTP router.
fn create_router(fetcher: Arc<Fetcher>, projector: Projector, metrics_path: &str) -> Router {
    let state = AppState {
        fetcher,
        projector,
        metrics_path: Arc::from(metrics_path),
    };

    Router::new()
        .route("/", get(index_handler))
        .route(metrics_path, get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the metrics endpoint: one fetch, one projection.
async fn metrics_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let deadline = scrape_deadline(&headers);

    let snapshot = match state.fetcher.fetch_within(deadline).await {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            error!(error = %e, url = %state.fetcher.url(), "Failed to get measures");
            None
        }
    };

    match state.projector.render(snapshot.as_ref()) {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// Landing page pointing at the metrics endpoint.
async fn index_handler(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        "<html>\n<head><title>AirGradient Exporter</title></head>\n<body>\n\
         <h1>AirGradient Exporter</h1>\n\
         <p><a href=\"{path}\">Metrics</a></p>\n\
         </body>\n</html>\n",
        path = state.metrics_path
    ))
}

/// Read the scraper's deadline, if it sent one.
fn scrape_deadline(headers: &HeaderMap) -> Option<Duration> {
    let seconds: f64 = headers
        .get(SCRAPE_TIMEOUT_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()?;

    if seconds.is_finite() && seconds > 0.0 {
        Some(Duration::from_secs_f64(seconds))
    } else {
        None
    }
}

/// HTTP server configuration.
pub struct HttpServer {
    fetcher: Arc<Fetcher>,
    projector: Projector,
    metrics_path: String,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(fetcher: Arc<Fetcher>, projector: Projector, metrics_path: String) -> Self {
        Self {
            fetcher,
            projector,
            metrics_path,
        }
    }

    /// Bind to `listen_addr` and serve until the shutdown signal is received.
    pub async fn run(
        self,
        listen_addr: SocketAddr,
        shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let listener = TcpListener::bind(listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", listen_addr, e))?;

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until the shutdown signal is received.
    pub async fn serve(
        self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let router = create_router(self.fetcher.clone(), self.projector, &self.metrics_path);
        let addr = listener.local_addr()?;

        info!(
            addr = %addr,
            path = %self.metrics_path,
            device = %self.fetcher.url(),
            label_policy = %self.projector.policy(),
            "HTTP server listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}
