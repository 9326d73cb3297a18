//! # REST API
//!
//! Builds the axum router that exposes the node's HTTP interface. All
//! endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                      | Description                          |
//! |--------|---------------------------|--------------------------------------|
//! | GET    | `/health`                 | Liveness probe                       |
//! | GET    | `/status`                 | Relation, key and store summary      |
//! | POST   | `/store/sum`              | Store a balance for an identity      |
//! | POST   | `/get/proof/neededAmount` | Prove balance >= threshold           |
//! | POST   | `/validate`               | Verify a proof for a threshold       |
//!
//! ## Error mapping
//!
//! | Error                                   | Status |
//! |-----------------------------------------|--------|
//! | `NotFound`                              | 404    |
//! | `ConstraintUnsatisfied`                 | 422    |
//! | `InvalidWitness`, `MalformedProof`      | 400    |
//! | `KeyMismatch`                           | 409    |
//! | `ProverFault`, `SetupFault`, `KeyStore` | 500    |
//!
//! A body that does not deserialize is answered with 400 and kind
//! `invalid_request`, never with the 422 reserved for an insufficient balance.
//!
//! A proof that fails verification is not an error: `/validate` answers 200
//! with `{"verdict": "invalid"}`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use zkbalance_protocol::service::ProofService;
use zkbalance_protocol::zkp::{RelationShape, ThresholdProof, Verdict};
use zkbalance_protocol::{ProtocolError, ProtocolResult};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone, everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Store, prove and verify operations.
    pub service: Arc<ProofService>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/store/sum", post(store_handler))
        .route("/get/proof/neededAmount", post(prove_handler))
        .route("/validate", post(validate_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `POST /store/sum`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoreBalanceRequest {
    pub id: String,
    pub amount: i64,
}

/// Body of `POST /get/proof/neededAmount`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProofRequest {
    pub id: String,
    #[serde(rename = "neededAmount")]
    pub needed_amount: i64,
}

/// Successful proof response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProofResponse {
    /// Hex-encoded proof, ready to be posted to `/validate`.
    pub proof: ThresholdProof,
    pub threshold: i64,
    pub key_id: String,
}

/// Body of `POST /validate`. The threshold may be sent as `neededAmount`
/// or `threshold`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateRequest {
    #[serde(rename = "neededAmount", alias = "threshold")]
    pub needed_amount: i64,
    /// Hex-encoded proof.
    pub proof: String,
}

/// Verification outcome.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub verdict: Verdict,
    pub threshold: i64,
}

/// Response body for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub relation_hash: String,
    /// `None` until the first request (or startup warm-up) runs key setup.
    pub key_id: Option<String>,
    pub shape: RelationShape,
    pub stored_identities: usize,
    pub timestamp: String,
}

/// Generic error body returned by endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Stable machine-readable code, e.g. `not_found`.
    pub kind: String,
}

// ---------------------------------------------------------------------------
// Error Mapping
// ---------------------------------------------------------------------------

/// A failed request: status code plus JSON body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn internal(message: String) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorResponse {
                error: message,
                kind: "internal".into(),
            },
        }
    }
}

fn status_for(err: &ProtocolError) -> StatusCode {
    match err {
        ProtocolError::NotFound(_) => StatusCode::NOT_FOUND,
        ProtocolError::ConstraintUnsatisfied { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ProtocolError::InvalidWitness(_) | ProtocolError::MalformedProof(_) => {
            StatusCode::BAD_REQUEST
        }
        ProtocolError::KeyMismatch { .. } => StatusCode::CONFLICT,
        ProtocolError::ProverFault(_)
        | ProtocolError::SetupFault(_)
        | ProtocolError::KeyStore(_)
        | ProtocolError::InvalidTransition { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ProtocolError> for ApiError {
    fn from(err: ProtocolError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            tracing::error!(kind = err.kind(), "request failed: {}", err);
        }
        Self {
            status,
            body: ErrorResponse {
                error: err.to_string(),
                kind: err.kind().to_string(),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                error: rejection.body_text(),
                kind: "invalid_request".into(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Runs CPU-bound protocol work on the blocking pool.
///
/// The outer error covers a panicked worker; the inner result is the
/// protocol outcome, left for the caller to inspect.
async fn run_blocking<T, F>(f: F) -> Result<ProtocolResult<T>, ApiError>
where
    F: FnOnce() -> ProtocolResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(format!("worker task failed: {}", e)))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — relation fingerprint, key id, and store size.
///
/// Never triggers key setup; `key_id` is reported only once keys exist.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let keys = state.service.key_manager();
    let resp = StatusResponse {
        version: state.version.clone(),
        relation_hash: state.service.relation_hash().to_hex(),
        key_id: keys.cached().map(|k| k.id().to_hex()),
        shape: *keys.relation().shape(),
        stored_identities: state.service.store().len(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    Json(resp)
}

/// `POST /store/sum` — create or overwrite a balance.
async fn store_handler(
    State(state): State<AppState>,
    payload: Result<Json<StoreBalanceRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(req) = payload?;
    state.service.store_balance(&req.id, req.amount);
    state.metrics.balances_stored_total.inc();
    state
        .metrics
        .stored_identities
        .set(state.service.store().len() as i64);
    Ok(Json(serde_json::json!({ "status": "stored" })))
}

/// `POST /get/proof/neededAmount` — prove the stored balance meets the
/// requested threshold.
async fn prove_handler(
    State(state): State<AppState>,
    payload: Result<Json<ProofRequest>, JsonRejection>,
) -> Result<Json<ProofResponse>, ApiError> {
    let Json(req) = payload?;
    let service = Arc::clone(&state.service);
    let threshold = req.needed_amount;
    let identity = req.id;

    let timer = state.metrics.prove_latency_seconds.start_timer();
    let result = run_blocking(move || service.request_proof(&identity, threshold)).await?;
    timer.observe_duration();

    match result {
        Ok(proof) => {
            state.metrics.proofs_issued_total.inc();
            let key_id = proof.key_id().to_hex();
            Ok(Json(ProofResponse {
                proof,
                threshold,
                key_id,
            }))
        }
        Err(e) => {
            if matches!(e, ProtocolError::ConstraintUnsatisfied { .. }) {
                state.metrics.proofs_rejected_total.inc();
            }
            Err(e.into())
        }
    }
}

/// `POST /validate` — verify a proof for a public threshold.
async fn validate_handler(
    State(state): State<AppState>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let Json(req) = payload?;
    let proof = ThresholdProof::from_hex(&req.proof)?;
    let service = Arc::clone(&state.service);
    let threshold = req.needed_amount;

    let timer = state.metrics.verify_latency_seconds.start_timer();
    let result = run_blocking(move || service.verify_proof(threshold, &proof)).await?;
    timer.observe_duration();

    match result {
        Ok(verdict) => {
            match verdict {
                Verdict::Valid => state.metrics.verifications_valid_total.inc(),
                Verdict::Invalid => state.metrics.verifications_invalid_total.inc(),
            }
            Ok(Json(ValidateResponse { verdict, threshold }))
        }
        Err(e) => {
            if matches!(e, ProtocolError::KeyMismatch { .. }) {
                state.metrics.key_mismatches_total.inc();
            }
            Err(e.into())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
