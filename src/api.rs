use std::sync::Arc;

use axum::{
    extract::{FromRequest, Path, State},
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use crate::analysis::AnalysisReport;
use crate::draw::{DrawBoard, DrawCommand};
use crate::error::ServiceError;
use crate::ingest::types::Article;
use crate::ingest::FetchReport;
use crate::tracker::FeedTracker;

type ApiResult<T> = Result<Json<T>, ServiceError>;

/// `Json` extractor whose rejections use the `ServiceError` body.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ServiceError))]
struct ApiJson<T>(T);

#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<FeedTracker>,
    pub drawings: Arc<DrawBoard>,
}

impl AppState {
    pub fn new(tracker: Arc<FeedTracker>) -> Self {
        Self {
            tracker,
            drawings: Arc::new(DrawBoard::new()),
        }
    }
}

/// Router with permissive CORS (tests, local dev).
pub fn router(state: AppState) -> Router {
    create_router(state, &[])
}

pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/register/{entity_id}", post(register))
        .route("/sources/{entity_id}", get(list_sources).post(add_source))
        .route("/fetch/{entity_id}", post(fetch))
        .route("/news/{entity_id}", get(news))
        .route("/analyze/{entity_id}", post(analyze))
        .route("/draw/{room_id}", get(list_drawings).post(draw))
        .route("/filter/{room_id}", post(filter))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

/// Empty list means any origin; unparsable origins are dropped with a warning.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::very_permissive();
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.trim().parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

#[derive(Serialize)]
struct RegisterResp {
    entity_id: String,
    created: bool,
}

async fn register(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
) -> Json<RegisterResp> {
    let created = state.tracker.register(&entity_id);
    if created {
        info!(entity = %entity_id, "entity registered");
    }
    Json(RegisterResp { entity_id, created })
}

#[derive(Deserialize)]
struct AddSourceReq {
    url: String,
}

#[derive(Serialize)]
struct SourcesResp {
    sources: Vec<String>,
}

async fn list_sources(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
) -> ApiResult<SourcesResp> {
    let sources = state.tracker.list_sources(&entity_id)?;
    Ok(Json(SourcesResp { sources }))
}

async fn add_source(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
    ApiJson(body): ApiJson<AddSourceReq>,
) -> ApiResult<SourcesResp> {
    let sources = state.tracker.add_source(&entity_id, &body.url)?;
    Ok(Json(SourcesResp { sources }))
}

async fn fetch(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
) -> ApiResult<FetchReport> {
    Ok(Json(state.tracker.fetch(&entity_id).await?))
}

#[derive(Serialize)]
struct NewsResp {
    articles: Vec<Article>,
}

async fn news(State(state): State<AppState>, Path(entity_id): Path<String>) -> ApiResult<NewsResp> {
    let articles = state.tracker.articles(&entity_id).await?;
    Ok(Json(NewsResp { articles }))
}

async fn analyze(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
) -> ApiResult<AnalysisReport> {
    Ok(Json(state.tracker.analyze(&entity_id).await?))
}

#[derive(Serialize)]
struct StatusResp {
    status: &'static str,
}

async fn draw(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    ApiJson(cmd): ApiJson<DrawCommand>,
) -> Json<StatusResp> {
    state.drawings.push(&room_id, cmd);
    Json(StatusResp { status: "ok" })
}

#[derive(Serialize)]
struct DrawingsResp {
    commands: Vec<DrawCommand>,
}

async fn list_drawings(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> ApiResult<DrawingsResp> {
    let commands = state.drawings.commands(&room_id)?;
    Ok(Json(DrawingsResp { commands }))
}

#[derive(Deserialize)]
struct FilterReq {
    image_data: Vec<serde_json::Value>,
    #[allow(dead_code)]
    #[serde(default)]
    filter_name: Option<String>,
}

#[derive(Serialize)]
struct FilterResp {
    image_data: Vec<serde_json::Value>,
}

// No filters are applied yet; the payload comes back as sent.
async fn filter(
    Path(_room_id): Path<String>,
    ApiJson(body): ApiJson<FilterReq>,
) -> Json<FilterResp> {
    Json(FilterResp {
        image_data: body.image_data,
    })
}
