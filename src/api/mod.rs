mod connections;
mod posts;
mod users;
mod webhooks;

use crate::config::RippleConfig;
use crate::database::Database;
use crate::error::DomainError;
use crate::events::EventBus;
use crate::media::MediaService;
use anyhow::Result;
use axum::extract::{DefaultBodyLimit, FromRequestParts};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub media: MediaService,
    pub events: EventBus,
}

pub(crate) type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    RateLimited(String),
    Internal(anyhow::Error),
}

impl ApiError {
    fn into_response_parts(self) -> (StatusCode, ErrorResponse) {
        let body = |message: String| ErrorResponse {
            success: false,
            message,
        };
        match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                body("missing caller identity".into()),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, body(msg)),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, body(msg)),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, body(msg)),
            ApiError::RateLimited(msg) => (StatusCode::TOO_MANY_REQUESTS, body(msg)),
            ApiError::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    body("internal server error".into()),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.into_response_parts();
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound(msg) => ApiError::NotFound(msg),
            DomainError::AlreadyFollowing
            | DomainError::AlreadyConnected
            | DomainError::RequestPending => ApiError::Conflict(err.to_string()),
            DomainError::RateLimited => ApiError::RateLimited(err.to_string()),
            DomainError::InvalidInput(msg) => ApiError::BadRequest(msg),
            DomainError::Upstream(inner) => ApiError::Internal(inner),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub(crate) fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Caller identity injected by the upstream auth layer. The backend trusts
/// the header; validating the session is out of scope here.
pub(crate) struct CallerId(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| CallerId(value.to_string()))
            .ok_or(ApiError::Unauthorized)
    }
}

async fn health_handler() -> Json<MessageResponse> {
    Json(MessageResponse::ok("ok"))
}

pub fn build_router(state: AppState) -> Router {
    // Image uploads cap the body at 25MB.
    Router::new()
        .route("/health", get(health_handler))
        .route("/users/me", get(users::get_me).post(users::update_me))
        .route("/users/discover", post(users::discover))
        .route("/users/follow", post(users::follow))
        .route("/users/unfollow", post(users::unfollow))
        .route("/connections", get(connections::list_connections))
        .route("/connections/request", post(connections::send_request))
        .route("/connections/accept", post(connections::accept_request))
        .route("/posts", post(posts::create_post))
        .route("/posts/:id/like", post(posts::like_post))
        .route("/feed", get(posts::get_feed))
        .route("/webhooks/identity", post(webhooks::identity_webhook))
        .layer(DefaultBodyLimit::max(25 * 1024 * 1024))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Tries to bind to the given port, or finds the next available port
async fn find_available_port(start_port: u16) -> Result<(TcpListener, u16)> {
    const MAX_PORT_ATTEMPTS: u16 = 100;

    for offset in 0..MAX_PORT_ATTEMPTS {
        let port = start_port + offset;
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok((listener, port)),
            Err(e) => {
                if offset == 0 {
                    tracing::debug!(port, error = %e, "Port in use, trying next port");
                }
                continue;
            }
        }
    }

    anyhow::bail!(
        "Could not find available port in range {}-{}",
        start_port,
        start_port + MAX_PORT_ATTEMPTS - 1
    )
}

pub async fn serve_http(
    config: RippleConfig,
    database: Database,
    media: MediaService,
    events: EventBus,
) -> Result<()> {
    let state = AppState {
        database,
        media,
        events,
    };
    let router = build_router(state);

    let (listener, actual_port) = find_available_port(config.api_port).await?;
    let addr = SocketAddr::from(([0, 0, 0, 0], actual_port));

    if actual_port != config.api_port {
        tracing::warn!(
            requested_port = config.api_port,
            actual_port = actual_port,
            "Configured port was in use, bound to next available port"
        );
    }

    tracing::info!(?addr, "HTTP server listening");
    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}
