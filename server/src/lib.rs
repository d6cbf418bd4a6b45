use anyhow::Result;
use axum::{extract::{Path, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use matchcore::model::parse_interests;
use matchcore::{Corpus, JobPosting, MatchConfig, Pipeline, StudentBatch};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_TOP_N: usize = 100;

#[derive(Deserialize)]
pub struct MatchRequest {
    /// One profile or an array; each record is parsed on its own
    pub students: serde_json::Value,
    /// `+`-separated, replaces each student's job_preferences.interests
    pub interests: Option<String>,
    pub top_n: Option<usize>,
    #[serde(default)]
    pub scores: bool,
}

#[derive(Serialize)]
pub struct MatchResponse {
    pub took_s: f64,
    pub total_jobs: usize,
    pub matches: serde_json::Value,
    pub rejected: Vec<RejectedEntry>,
}

#[derive(Serialize)]
pub struct RejectedEntry {
    pub position: usize,
    pub error: String,
}

#[derive(Serialize)]
pub struct ReloadResponse {
    pub num_docs: usize,
    pub skipped: usize,
}

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RwLock<Arc<Pipeline>>>,
    pub job_sources: Arc<Vec<PathBuf>>,
    pub config: MatchConfig,
    pub admin_token: Option<String>,
}

impl AppState {
    /// Load the job sources and build the first index.
    pub fn new(job_sources: Vec<PathBuf>, config: MatchConfig, admin_token: Option<String>) -> Result<Self> {
        let corpus = Corpus::load(job_sources.as_slice())?;
        let pipeline = Pipeline::build(config.clone(), corpus)?;
        Ok(Self {
            pipeline: Arc::new(RwLock::new(Arc::new(pipeline))),
            job_sources: Arc::new(job_sources),
            config,
            admin_token,
        })
    }

    fn current(&self) -> Arc<Pipeline> {
        self.pipeline.read().clone()
    }
}

pub fn build_app(job_sources: Vec<PathBuf>, config: MatchConfig) -> Result<Router> {
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    let state = AppState::new(job_sources, config, admin_token)?;

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

    Ok(router(state).layer(cors).layer(TraceLayer::new_for_http()))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/jobs/:doc_id", get(job_handler))
        .route("/match", post(match_handler))
        .route("/admin/reload", post(reload_handler))
        .with_state(state)
}

pub async fn match_handler(State(state): State<AppState>, Json(req): Json<MatchRequest>) -> Result<Json<MatchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let mut batch = StudentBatch::from_value(req.students);
    if let Some(raw) = req.interests.as_deref() {
        batch.set_interests(&parse_interests(raw));
    }

    let pipeline = state.current();
    let top_n = req.top_n.map(|n| n.min(MAX_TOP_N));
    let report = pipeline.match_batch(&batch, top_n);
    let matches = report.result.handoff(req.scores).map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let rejected = report
        .rejected
        .iter()
        .map(|r| RejectedEntry { position: r.position, error: r.error.to_string() })
        .collect();

    let elapsed = start.elapsed();
    tracing::info!(students = batch.len(), took_s = elapsed.as_secs_f64(), "match request");
    Ok(Json(MatchResponse { took_s: elapsed.as_secs_f64(), total_jobs: pipeline.corpus().len(), matches, rejected }))
}

pub async fn job_handler(State(state): State<AppState>, Path(doc_id): Path<u32>) -> Result<Json<JobPosting>, (StatusCode, String)> {
    let pipeline = state.current();
    match pipeline.corpus().get(doc_id) {
        Some(job) => Ok(Json(job.clone())),
        None => Err((StatusCode::NOT_FOUND, format!("job {doc_id} not found"))),
    }
}

/// Reload every job source and swap in a freshly built index.
async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<ReloadResponse>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let corpus = Corpus::load(state.job_sources.as_slice()).map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let skipped = corpus.issues().len();
    let pipeline = Pipeline::build(state.config.clone(), corpus).map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let num_docs = pipeline.corpus().len();
    *state.pipeline.write() = Arc::new(pipeline);
    tracing::info!(num_docs, skipped, "corpus reloaded");
    Ok(Json(ReloadResponse { num_docs, skipped }))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
