// mailmask-server/src/api.rs
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use mailmask_core::{
    ForwardError, ForwardResult, ForwardingEngine, InboundMessage, MaskingService, ServiceError,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MaskingService>,
    pub engine: Arc<ForwardingEngine>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/generate", post(generate))
        .route("/api/inbound", post(inbound))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}

/// Client-facing error: a non-2xx status with an `{"error": ...}` body.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidInput(message) => ApiError::invalid_input(message),
            // Already logged at error level where it happened; the caller
            // gets a generic message with no internals.
            ServiceError::GenerationExhausted { .. } => {
                ApiError::internal("failed to generate a masked address, try again")
            }
            ServiceError::Store(err) => {
                tracing::error!(error = %err, "store failure during generate");
                ApiError::internal("internal error")
            }
        }
    }
}

/// `Json` wrapper that keeps rejections on the error contract: malformed
/// bodies come back as 400 with `{"error": ...}` instead of axum's
/// plain-text default.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(reject(rejection)),
        }
    }
}

fn reject(rejection: JsonRejection) -> ApiError {
    ApiError {
        status: StatusCode::BAD_REQUEST,
        message: rejection.body_text(),
    }
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    #[serde(rename = "realEmail")]
    real_email: String,
    plan: String,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    #[serde(rename = "maskedEmail")]
    masked_email: String,
}

async fn generate(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let masked_email = state.service.create_masked(&req.real_email, &req.plan).await?;
    Ok(Json(GenerateResponse { masked_email }))
}

#[derive(Debug, Deserialize)]
struct InboundRequest {
    #[serde(rename = "maskedAddress")]
    masked_address: String,
    from: String,
    #[serde(default)]
    subject: Option<String>,
    body: String,
}

/// Disposition only. The real address never appears here: the caller is
/// the mail edge, which is exactly the party that must not learn it.
#[derive(Debug, Serialize)]
struct InboundResponse {
    result: &'static str,
}

async fn inbound(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<InboundRequest>,
) -> Result<Json<InboundResponse>, ApiError> {
    let message = InboundMessage {
        from: req.from,
        subject: req.subject,
        body: req.body,
    };

    match state.engine.handle_inbound(&req.masked_address, &message).await {
        Ok(ForwardResult::Relayed { .. }) => Ok(Json(InboundResponse { result: "relayed" })),
        Ok(ForwardResult::DroppedExpired) => Ok(Json(InboundResponse {
            result: "droppedExpired",
        })),
        Ok(ForwardResult::DroppedUnknown) => Ok(Json(InboundResponse {
            result: "droppedUnknown",
        })),
        Err(ForwardError::Relay(err)) => {
            tracing::warn!(error = %err, "relay handoff failed");
            Err(ApiError {
                status: StatusCode::BAD_GATEWAY,
                message: "relay handoff failed".to_string(),
            })
        }
        Err(ForwardError::Store(err)) => {
            tracing::error!(error = %err, "store failure during inbound handling");
            Err(ApiError::internal("internal error"))
        }
    }
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
