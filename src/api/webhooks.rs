use super::{ApiResult, AppState, MessageResponse};
use crate::identity_sync::{
    IdentityEvent, IdentitySyncService, EVENT_USER_CREATED, EVENT_USER_DELETED, EVENT_USER_UPDATED,
};
use axum::extract::State;
use axum::Json;

/// Entry point for identity-provider lifecycle events. Signature validation
/// happens upstream; anything but the three known event types is acknowledged
/// and ignored.
pub(crate) async fn identity_webhook(
    State(state): State<AppState>,
    Json(event): Json<IdentityEvent>,
) -> ApiResult<MessageResponse> {
    let service = IdentitySyncService::new(state.database.clone());
    match event.kind.as_str() {
        EVENT_USER_CREATED => {
            service.on_created(&event.data)?;
            Ok(Json(MessageResponse::ok("user created")))
        }
        EVENT_USER_UPDATED => {
            service.on_updated(&event.data)?;
            Ok(Json(MessageResponse::ok("user updated")))
        }
        EVENT_USER_DELETED => {
            service.on_deleted(&event.data.id)?;
            Ok(Json(MessageResponse::ok("user deleted")))
        }
        other => {
            tracing::debug!(event_type = %other, "ignoring unhandled identity event");
            Ok(Json(MessageResponse::ok("event ignored")))
        }
    }
}
