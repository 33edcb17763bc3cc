use std::sync::Arc;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::aggregate::{render_summary, BatchStatistics};
use crate::batch::{classify_batch_parallel, BatchSource};
use crate::classifier::{anon_hash, ClassificationResult, Classifier, ClassifierHandle};
use crate::config::ServiceConfig;
use crate::error::BatchSourceError;
use crate::lexicon::LexiconConfig;
use crate::metrics::{self, Metrics};
use crate::policy::{Emotion, Label};

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub classifier: ClassifierHandle,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(classifier: ClassifierHandle, config: ServiceConfig) -> Self {
        Self {
            classifier,
            config: Arc::new(config),
        }
    }

    /// Load the lexicon named by `config` (built-in when the file is absent).
    pub fn from_config(config: ServiceConfig) -> anyhow::Result<Self> {
        let lexicon = LexiconConfig::load_or_builtin(&config.lexicon_path)?;
        let classifier = Classifier::from_config(&lexicon).with_context(|| {
            format!("invalid lexicon at {}", config.lexicon_path.display())
        })?;
        Ok(Self::new(
            ClassifierHandle::new(Arc::new(classifier)),
            config,
        ))
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state
        .config
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let router = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/test", get(service_info))
        .route("/analyze", post(analyze))
        .route("/analyze_batch", post(analyze_batch))
        .route("/admin/reload-lexicon", post(admin_reload_lexicon))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::very_permissive())
        .with_state(state);

    match Metrics::init() {
        Some(m) => router.merge(m.router()),
        None => router,
    }
}

/* ----------------------------
Errors
---------------------------- */

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Review is empty")]
    EmptyReview,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Source(#[from] BatchSourceError),

    #[error("Server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::EmptyReview | ApiError::BadRequest(_) | ApiError::Source(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({ "success": false, "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/* ----------------------------
Payloads
---------------------------- */

#[derive(Deserialize)]
struct AnalyzeReq {
    #[serde(default)]
    review: String,
}

#[derive(Debug, Serialize)]
struct ResultOut {
    original_text: String,
    sentiment: Label,
    sentiment_ru: &'static str,
    confidence: f32,
    emotion: Emotion,
}

impl From<ClassificationResult> for ResultOut {
    fn from(r: ClassificationResult) -> Self {
        Self {
            sentiment_ru: r.label.label_ru(),
            sentiment: r.label,
            original_text: r.original_text,
            confidence: r.confidence,
            emotion: r.emotion,
        }
    }
}

#[derive(Serialize)]
struct AnalyzeResp {
    success: bool,
    #[serde(flatten)]
    result: ResultOut,
}

#[derive(Serialize)]
struct BatchResp {
    success: bool,
    results: Vec<ResultOut>,
    statistics: BatchStatistics,
    text_stats: String,
    processed_count: usize,
}

/* ----------------------------
Handlers
---------------------------- */

async fn service_info() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Сервер работает с системой анализа отзывов!",
        "status": "OK",
        "analyzer_type": "Rule-Based",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeReq>, JsonRejection>,
) -> Result<Json<AnalyzeResp>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let review = body.review.trim();
    if review.is_empty() {
        return Err(ApiError::EmptyReview);
    }

    let result = state.classifier.snapshot().classify(review);
    metrics::record_classification(result.label);
    info!(
        id = %anon_hash(review),
        label = result.label.as_str(),
        confidence = result.confidence,
        "review analyzed"
    );

    Ok(Json(AnalyzeResp {
        success: true,
        result: result.into(),
    }))
}

async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(Option<String>, Bytes), BatchSourceError> {
    let mut multipart = multipart.map_err(|_| BatchSourceError::NoFile)?;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| BatchSourceError::Malformed(e.to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().map(str::to_owned);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| BatchSourceError::Malformed(e.to_string()))?;
            return Ok((filename, bytes));
        }
    }
    Err(BatchSourceError::NoFile)
}

async fn analyze_batch(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<BatchResp>, ApiError> {
    let source = match read_upload(multipart).await.and_then(|(name, bytes)| {
        BatchSource::from_upload(name.as_deref(), &bytes, state.config.max_upload_bytes)
    }) {
        Ok(s) => s,
        Err(e) => {
            metrics::record_batch_rejected();
            warn!(error = %e, "batch rejected");
            return Err(e.into());
        }
    };
    info!(items = source.len(), "batch received");

    let classifier = state.classifier.snapshot();
    let workers = state.config.batch_workers;
    let report = tokio::task::spawn_blocking(move || {
        classify_batch_parallel(classifier.as_ref(), &source, workers)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    metrics::record_batch(&report.statistics);
    let text_stats = render_summary(&report.statistics);

    Ok(Json(BatchResp {
        success: true,
        processed_count: report.results.len(),
        results: report.results.into_iter().map(ResultOut::from).collect(),
        statistics: report.statistics,
        text_stats,
    }))
}

async fn admin_reload_lexicon(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match state.classifier.reload_from(&state.config.lexicon_path) {
        Ok(()) => {
            metrics::record_reload(true);
            Ok(Json(json!({ "success": true, "message": "reloaded" })))
        }
        Err(e) => {
            metrics::record_reload(false);
            warn!(error = %e, "lexicon reload failed, keeping previous lexicon");
            Err(ApiError::Internal(e.to_string()))
        }
    }
}
