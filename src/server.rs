//! HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Liveness banner |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/recommendations` | Generate a recommendation from a questionnaire |
//! | `POST` | `/rebuild-index` | Force a rebuild of the index from the documents |
//!
//! # Error Contract
//!
//! Error responses share one shape:
//!
//! ```json
//! { "error": { "code": "rebuild_failed", "message": "no documents to index" } }
//! ```
//!
//! `POST /recommendations` does not use it for generation failures: the
//! pipeline degrades instead, and the reply carries `success: true` with a
//! `message` explaining the degraded content.

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use skincare_rag_core::models::{Recommendation, UserProfile};

use crate::config::Config;
use crate::pipeline::{IndexOutcome, Pipeline};

/// Medical disclaimer attached to every recommendation reply.
pub const DISCLAIMER: &str = "These recommendations are for informational purposes only and are based on \
general dermatological literature. They do not constitute medical advice. \
For persistent skin issues or severe conditions, please consult a qualified dermatologist.";

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

/// Build the router. CORS is applied by [`run_server`].
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/recommendations", post(handle_recommendations))
        .route("/rebuild-index", post(handle_rebuild_index))
        .with_state(state)
}

/// Build the CORS layer from `server.cors_origins`. A `"*"` entry allows
/// any origin; entries that are not valid header values are skipped.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }
    let values: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(values))
}

/// Starts the HTTP server.
///
/// Loads the persisted index (or builds it) before binding to
/// `[server].bind`. A failed initial load is logged and the server starts
/// anyway; recommendation requests degrade until `POST /rebuild-index`
/// succeeds.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pipeline = Arc::new(Pipeline::from_config(config).await?);

    match pipeline.rebuild_index(false).await {
        Ok(outcome) => tracing::info!(?outcome, "index initialised"),
        Err(e) => tracing::error!(
            error = %e,
            "index initialisation failed, serving without an index"
        ),
    }

    let app = router(AppState { pipeline }).layer(cors_layer(&config.server.cors_origins));

    let bind_addr = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    println!("Skincare RAG API listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"rebuild_failed"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn internal(code: &str, message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: code.to_string(),
        message: message.into(),
    }
}

// ============ GET / and GET /health ============

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

async fn handle_root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Skincare RAG API is running".to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    /// Always `"healthy"` when the server is running.
    status: String,
    message: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "API is operational".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /recommendations ============

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub questionnaire: UserProfile,
    /// Cap on the number of entries in each routine category.
    #[serde(default)]
    pub max_recommendations: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommendations: Recommendation,
    pub user_profile_summary: String,
    pub disclaimer: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

async fn handle_recommendations(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> Json<RecommendationResponse> {
    tracing::info!(
        skin_type = %request.questionnaire.skin_type,
        concerns = request.questionnaire.concerns.len(),
        "processing recommendation request"
    );

    let mut recommendations = state.pipeline.generate(&request.questionnaire).await;
    if let Some(max) = request.max_recommendations {
        recommendations.truncate_categories(max);
    }

    let message = recommendations.is_degraded().then(|| {
        "Recommendations could not be generated; the response holds placeholder content"
            .to_string()
    });

    Json(RecommendationResponse {
        user_profile_summary: request.questionnaire.summary(),
        recommendations,
        disclaimer: DISCLAIMER.to_string(),
        success: true,
        message,
    })
}

// ============ POST /rebuild-index ============

async fn handle_rebuild_index(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    tracing::info!("rebuilding index on request");
    let outcome = state.pipeline.rebuild_index(true).await.map_err(|e| {
        tracing::error!(error = %e, "index rebuild failed");
        internal("rebuild_failed", format!("Failed to rebuild index: {}", e))
    })?;

    let message = match outcome {
        IndexOutcome::Built { documents, chunks } => format!(
            "Index rebuilt successfully from {} documents ({} chunks)",
            documents, chunks
        ),
        IndexOutcome::Loaded { chunks } => {
            format!("Index loaded successfully ({} chunks)", chunks)
        }
    };
    Ok(Json(MessageResponse { message }))
}
