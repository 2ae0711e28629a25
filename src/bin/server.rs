use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dogwise::{
    Config, Finder, ScheduleSource, SearchOutcome, ZipWatcher, ZippopotamGeocoder, default_roster,
    load_roster, source_for,
};

/// Application state shared across all requests
#[derive(Clone)]
struct AppState {
    finder: Finder,
    watcher: Arc<RwLock<ZipWatcher>>,
    schedule_source: Option<Arc<dyn ScheduleSource>>,
    top_n: usize,
    metrics: Arc<Metrics>,
}

/// Server metrics
struct Metrics {
    searches: AtomicU64,
    zips_detected: AtomicU64,
    start_time: Instant,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "server=info,dogwise=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let roster = match &config.roster {
        Some(path) => load_roster(path)?,
        None => default_roster(),
    };
    tracing::info!("Loaded roster of {} trainers", roster.len());

    let geocoder = ZippopotamGeocoder::new(config.geocoder_url.clone())
        .context("Failed to build geocoder client")?;
    let finder = Finder::new(roster, Arc::new(geocoder));

    let schedule_source: Option<Arc<dyn ScheduleSource>> = match &config.schedule {
        Some(location) => Some(Arc::from(
            source_for(location).context("Failed to build schedule source")?,
        )),
        None => {
            tracing::warn!("DOGWISE_SCHEDULE_URL not set; every trainer will show as Full");
            None
        }
    };

    // Initial schedule load runs in the background; searches before it lands see Full.
    if let Some(source) = schedule_source.clone() {
        let finder = finder.clone();
        tokio::spawn(async move {
            if let Err(e) = finder.refresh_schedule(source.as_ref()).await {
                tracing::error!("Initial schedule load failed: {}", e);
            }
        });
    }

    let app = build_app(AppState {
        finder,
        watcher: Arc::new(RwLock::new(ZipWatcher::new())),
        schedule_source,
        top_n: config.top_n,
        metrics: Arc::new(Metrics {
            searches: AtomicU64::new(0),
            zips_detected: AtomicU64::new(0),
            start_time: Instant::now(),
        }),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Build the Axum application with routes and middleware
fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Page side pushes text, popup side asks for the current ZIP
        .route("/api/page", post(observe_page))
        .route("/api/zip", get(current_zip))
        .route("/api/search", get(search))
        .route("/api/schedule/refresh", post(refresh_schedule))
        .route("/api/metrics", get(get_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Scan page text for a ZIP; `changed` is true only when it differs from the
/// last detected one.
async fn observe_page(
    State(state): State<AppState>,
    Json(request): Json<PageRequest>,
) -> Json<ZipResponse> {
    let mut watcher = state.watcher.write().await;
    let changed = watcher.observe(&request.text).is_some();
    if changed {
        state.metrics.zips_detected.fetch_add(1, Ordering::Relaxed);
        tracing::info!("Detected ZIP {:?}", watcher.current());
    }

    Json(ZipResponse {
        zip: watcher.current().map(str::to_string),
        changed,
    })
}

#[derive(Deserialize)]
struct PageRequest {
    text: String,
}

#[derive(Serialize)]
struct ZipResponse {
    zip: Option<String>,
    changed: bool,
}

async fn current_zip(State(state): State<AppState>) -> Json<ZipResponse> {
    let watcher = state.watcher.read().await;
    Json(ZipResponse {
        zip: watcher.current().map(str::to_string),
        changed: false,
    })
}

/// Rank trainers around a ZIP
async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<SearchOutcome> {
    state.metrics.searches.fetch_add(1, Ordering::Relaxed);

    let top_n = query.top.filter(|&n| n > 0).unwrap_or(state.top_n);
    Json(state.finder.rank(query.zip.trim(), top_n).await)
}

#[derive(Deserialize)]
struct SearchQuery {
    zip: String,
    #[serde(default)]
    top: Option<usize>,
}

/// Re-fetch the configured schedule and replace the current table
async fn refresh_schedule(State(state): State<AppState>) -> Result<Json<RefreshResponse>, ApiError> {
    let source = state
        .schedule_source
        .as_ref()
        .ok_or_else(|| ApiError::BadRequest("no schedule source configured".to_string()))?;

    let rows = state
        .finder
        .refresh_schedule(source.as_ref())
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    Ok(Json(RefreshResponse { rows }))
}

#[derive(Serialize)]
struct RefreshResponse {
    rows: usize,
}

async fn get_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        searches: state.metrics.searches.load(Ordering::Relaxed),
        zips_detected: state.metrics.zips_detected.load(Ordering::Relaxed),
        cached_locations: state.finder.resolver().cached_len().await,
        schedule_rows: state.finder.schedule_rows().await,
        uptime_seconds: state.metrics.start_time.elapsed().as_secs(),
    })
}

#[derive(Serialize)]
struct MetricsResponse {
    searches: u64,
    zips_detected: u64,
    cached_locations: usize,
    schedule_rows: usize,
    uptime_seconds: u64,
}

/// API error types
enum ApiError {
    BadRequest(String),
    Upstream(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(serde_json::json!({
            "success": false,
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}
