use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use mailsearch_core::{IndexableMail, SearchResult};
use mailsearch_indexer::{index_account, AccountKey, BootstrapReport, IndexerConfig, IndexerRegistry, PkRef, ProgressStatus, Response};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Deserialize)]
pub struct IndexBody {
    #[serde(default)]
    pub remove: Vec<PkRef>,
    #[serde(default)]
    pub add: Vec<IndexableMail>,
}

#[derive(Serialize)]
pub struct IndexResponse {
    pub removed: usize,
    pub added: usize,
    pub took_s: f64,
}

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<IndexerRegistry>,
    /// Last progress reported per login.
    pub progress: Arc<RwLock<HashMap<String, bool>>>,
    pub admin_token: Option<String>,
}

type ApiError = (StatusCode, String);

impl AppState {
    /// Must be called inside a tokio runtime: a task draining worker
    /// notifications is spawned here.
    pub fn spawn(config: IndexerConfig) -> Self {
        let (events, notifications) = mpsc::unbounded_channel();
        let admin_token = std::env::var("ADMIN_TOKEN").ok().filter(|token| !token.is_empty());
        let state = AppState {
            registry: Arc::new(IndexerRegistry::new(config, events)),
            progress: Arc::new(RwLock::new(HashMap::new())),
            admin_token,
        };
        tokio::spawn(track_notifications(notifications, state.progress.clone(), state.registry.clone()));
        state
    }
}

pub fn build_app(config: IndexerConfig) -> Result<Router> {
    Ok(router(AppState::spawn(config)))
}

pub fn router(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let origins: Vec<_> = std::env::var("CORS_ALLOW_ORIGIN")
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    let cors = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/accounts/:login", axum::routing::delete(logout_handler))
        .route("/accounts/:login/bootstrap", post(bootstrap_handler))
        .route("/accounts/:login/index", post(index_handler))
        .route("/accounts/:login/search", get(search_handler))
        .route("/accounts/:login/progress", get(progress_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn track_notifications(
    mut notifications: mpsc::UnboundedReceiver<Response>,
    progress: Arc<RwLock<HashMap<String, bool>>>,
    registry: Arc<IndexerRegistry>,
) {
    while let Some(notification) = notifications.recv().await {
        match notification {
            // late events of a logged out account must not resurrect its entry
            Response::ProgressState { key, status } if registry.get(&key).is_some() => {
                progress.write().insert(key.login, status.indexing);
            }
            Response::ErrorMessage { message } => tracing::error!(%message, "indexing worker reported an error"),
            other => tracing::debug!(?other, "ignored notification"),
        }
    }
}

/// Accounts without a session get an empty result; no index is created.
pub async fn search_handler(
    State(state): State<AppState>,
    Path(login): Path<String>,
    Query(params): Query<SearchParams>,
) -> Json<SearchResult> {
    match state.registry.get(&AccountKey::new(login)) {
        Some(queue) => Json(queue.search(params.q).wait().await),
        None => Json(SearchResult::default()),
    }
}

pub async fn index_handler(
    State(state): State<AppState>,
    Path(login): Path<String>,
    headers: HeaderMap,
    Json(body): Json<IndexBody>,
) -> Result<Json<IndexResponse>, ApiError> {
    authorize(&state, &headers)?;
    let start = std::time::Instant::now();
    let queue = state.registry.queue(&AccountKey::new(login)).map_err(internal)?;
    let removed = body.remove.len();
    let added = body.add.len();
    let ticket = queue
        .index(body.remove.into_iter().map(|r| r.pk).collect(), body.add)
        .map_err(|error| (StatusCode::CONFLICT, format!("{error:#}")))?;
    ticket.wait().await.map_err(internal)?;
    Ok(Json(IndexResponse { removed, added, took_s: start.elapsed().as_secs_f64() }))
}

pub async fn bootstrap_handler(
    State(state): State<AppState>,
    Path(login): Path<String>,
    headers: HeaderMap,
    Json(mails): Json<Vec<IndexableMail>>,
) -> Result<Json<BootstrapReport>, ApiError> {
    authorize(&state, &headers)?;
    let queue = state.registry.queue(&AccountKey::new(login)).map_err(internal)?;
    let buffer_size = state.registry.config().bootstrap_buffer_size;
    Ok(Json(index_account(&queue, mails, buffer_size).await))
}

pub async fn progress_handler(State(state): State<AppState>, Path(login): Path<String>) -> Json<ProgressStatus> {
    let indexing = state.progress.read().get(&login).copied().unwrap_or(false);
    Json(ProgressStatus { indexing })
}

pub async fn logout_handler(
    State(state): State<AppState>,
    Path(login): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    authorize(&state, &headers)?;
    let dropped = state.registry.logout(&AccountKey::new(login.as_str()));
    state.progress.write().remove(&login);
    if dropped {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, format!("no session for account {login}")))
    }
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(required) = &state.admin_token else {
        return Ok(());
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}

fn internal(error: anyhow::Error) -> ApiError {
    tracing::warn!(error = ?error, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{error:#}"))
}
