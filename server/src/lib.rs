use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use engine::{EngineConfig, EngineError, RecommendQuery, RecommendResponse, Registry, DEFAULT_TOP_N};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod lookup;

use lookup::TitleLookup;

/// Corpora to serve and how to fit them.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub corpora: Vec<(String, PathBuf)>,
    pub engine: EngineConfig,
    pub admin_token: Option<String>,
}

impl ServerConfig {
    /// anime/manga/manhwa CSV files under `data_dir`.
    pub fn media_defaults(data_dir: &std::path::Path) -> Vec<(String, PathBuf)> {
        ["anime", "manga", "manhwa"]
            .iter()
            .map(|k| (k.to_string(), data_dir.join(format!("{k}.csv"))))
            .collect()
    }

    fn load_registry(&self) -> (Registry, Vec<(String, EngineError)>) {
        let mut builder = Registry::builder(self.engine);
        let failures = builder.load_all(self.corpora.iter().map(|(k, p)| (k.as_str(), p.as_path())));
        let registry = builder.build();
        tracing::info!(loaded = registry.len(), failed = failures.len(), "registry built");
        (registry, failures)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RwLock<Arc<Registry>>>,
    pub config: Arc<ServerConfig>,
    pub lookup: Option<Arc<dyn TitleLookup>>,
    /// Held for the whole of a reload; a second reload is refused, not queued.
    pub reload_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    pub fn new(config: ServerConfig, lookup: Option<Arc<dyn TitleLookup>>) -> Self {
        let (registry, _failures) = config.load_registry();
        Self {
            registry: Arc::new(RwLock::new(Arc::new(registry))),
            config: Arc::new(config),
            lookup,
            reload_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    fn registry(&self) -> Arc<Registry> {
        self.registry.read().clone()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    UnknownCorpus(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    UpstreamLookup(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::UnknownCorpus(key) => ApiError::UnknownCorpus(format!("media type not loaded: {key}")),
            EngineError::InvalidTopN(_) | EngineError::AnchorOutOfRange { .. } => ApiError::InvalidInput(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::UnknownCorpus(_) => (StatusCode::NOT_FOUND, "unknown_corpus"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::UpstreamLookup(_) => (StatusCode::NOT_FOUND, "upstream_lookup_failed"),
            ApiError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "reload_in_progress"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        let body = Json(serde_json::json!({ "error": code, "detail": self.to_string() }));
        (status, body).into_response()
    }
}

#[derive(Deserialize)]
pub struct RecommendParams {
    #[serde(default = "default_media_type")]
    pub media_type: String,
    pub query: Option<String>,
    pub item_id: Option<i64>,
    #[serde(default = "default_topn")]
    pub topn: usize,
    #[serde(default = "default_smart_search")]
    pub use_smart_search: bool,
}
fn default_media_type() -> String { "anime".into() }
fn default_topn() -> usize { DEFAULT_TOP_N }
fn default_smart_search() -> bool { true }

#[derive(Serialize)]
pub struct CorpusInfo {
    pub media_type: String,
    pub items: usize,
    pub backend: &'static str,
}

pub fn build_app(config: ServerConfig, lookup: Option<Arc<dyn TitleLookup>>) -> Result<Router> {
    let app_state = AppState::new(config, lookup);

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({ "status": "ok" })) }))
        .route("/corpora", get(corpora_handler))
        .route("/recommend", get(recommend_handler))
        .route("/admin/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn corpora_handler(State(state): State<AppState>) -> Json<Vec<CorpusInfo>> {
    let registry = state.registry();
    Json(
        registry
            .engines()
            .map(|e| CorpusInfo { media_type: e.key().to_string(), items: e.corpus().len(), backend: e.backend().name() })
            .collect(),
    )
}

pub async fn recommend_handler(
    State(state): State<AppState>,
    Query(params): Query<RecommendParams>,
) -> Result<Json<RecommendResponse>, ApiError> {
    let media_type = params.media_type.to_lowercase();
    let engine = state.registry().get(&media_type)?;
    if params.topn == 0 {
        return Err(ApiError::InvalidInput("topn must be at least 1".into()));
    }

    let text = params.query.as_deref().map(str::trim).unwrap_or("");
    let query = match (params.item_id, text) {
        (Some(id), _) => RecommendQuery::ItemId(id),
        (None, "") => return Err(ApiError::InvalidInput("query or item_id is required".into())),
        (None, t) => RecommendQuery::Title(t.to_string()),
    };

    if let Some(resp) = engine.recommend(&query, params.topn)? {
        return Ok(Json(resp));
    }

    let RecommendQuery::Title(title) = query else {
        return Err(ApiError::NotFound("No item with that item_id in this dataset.".into()));
    };
    if !params.use_smart_search {
        return Err(ApiError::NotFound(
            "Title not found in local dataset. Enable smart search for web lookup.".into(),
        ));
    }
    let Some(lookup) = state.lookup.as_ref() else {
        return Err(ApiError::NotFound("Title not found in local dataset.".into()));
    };

    match lookup.lookup(&title, &media_type).await {
        Ok(Some(hit)) => {
            tracing::debug!(query = %title, upstream_title = %hit.title, "ranking upstream content");
            let resp = engine.recommend_from_text(&hit.content, &format!("{title} (Web Search)"), params.topn)?;
            Ok(Json(resp))
        }
        Ok(None) => Err(ApiError::NotFound("Not found via web search.".into())),
        Err(e) => {
            tracing::warn!(query = %title, lookup = lookup.name(), error = %e, "upstream lookup failed");
            Err(ApiError::UpstreamLookup(format!("Web lookup failed: {e}")))
        }
    }
}

/// Rebuild every corpus from the configured sources and swap the registry wholesale.
pub async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let _reloading = state
        .reload_lock
        .try_lock()
        .map_err(|_| ApiError::Conflict("a reload is already in progress".into()))?;
    let config = state.config.clone();
    let (registry, failures) = tokio::task::spawn_blocking(move || config.load_registry())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let loaded: Vec<String> = registry.keys().map(str::to_string).collect();
    *state.registry.write() = Arc::new(registry);
    let failed: Vec<serde_json::Value> = failures
        .into_iter()
        .map(|(key, e)| serde_json::json!({ "media_type": key, "error": e.to_string() }))
        .collect();
    Ok(Json(serde_json::json!({ "loaded": loaded, "failed": failed })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.config.admin_token {
        Some(t) => t,
        None => return Err(ApiError::Unauthorized("ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid admin token".into()))
    }
}
