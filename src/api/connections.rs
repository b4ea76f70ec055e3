use super::{ApiResult, AppState, CallerId, MessageResponse};
use crate::social::{ConnectionsView, SocialGraphService};
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct ConnectionTargetRequest {
    id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ConnectionsResponse {
    success: bool,
    #[serde(flatten)]
    view: ConnectionsView,
}

pub(crate) async fn send_request(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Json(request): Json<ConnectionTargetRequest>,
) -> ApiResult<MessageResponse> {
    let service = SocialGraphService::new(state.database.clone(), state.events.clone());
    service.send_connection_request(&caller_id, &request.id)?;
    Ok(Json(MessageResponse::ok(
        "Connection request sent successfully",
    )))
}

pub(crate) async fn accept_request(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Json(request): Json<ConnectionTargetRequest>,
) -> ApiResult<MessageResponse> {
    let service = SocialGraphService::new(state.database.clone(), state.events.clone());
    service.accept_connection_request(&caller_id, &request.id)?;
    Ok(Json(MessageResponse::ok(
        "Connection accepted successfully",
    )))
}

pub(crate) async fn list_connections(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
) -> ApiResult<ConnectionsResponse> {
    let service = SocialGraphService::new(state.database.clone(), state.events.clone());
    let view = service.get_user_connections(&caller_id)?;
    Ok(Json(ConnectionsResponse {
        success: true,
        view,
    }))
}
