use super::{ApiError, ApiResult, AppState, CallerId, MessageResponse};
use crate::social::SocialGraphService;
use crate::users::{ImageUpload, UpdateProfileInput, UserService, UserView};
use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct DiscoverRequest {
    #[serde(default)]
    input: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TargetUserRequest {
    id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    success: bool,
    user: UserView,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UsersResponse {
    success: bool,
    users: Vec<UserView>,
}

pub(crate) async fn get_me(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
) -> ApiResult<UserResponse> {
    let service = UserService::new(state.database.clone(), state.media.clone());
    let user = service.get_user(&caller_id)?;
    Ok(Json(UserResponse {
        success: true,
        user,
        message: None,
    }))
}

pub(crate) async fn update_me(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    mut multipart: Multipart,
) -> ApiResult<UserResponse> {
    let mut input = UpdateProfileInput::default();
    let mut profile_image = None;
    let mut cover_image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(err.to_string()))?
    {
        let Some(name) = field.name().map(|s| s.to_string()) else {
            continue;
        };
        match name.as_str() {
            "username" => input.username = Some(read_text(field).await?),
            "bio" => input.bio = Some(read_text(field).await?),
            "location" => input.location = Some(read_text(field).await?),
            "full_name" => input.full_name = Some(read_text(field).await?),
            "profile" => profile_image = Some(read_image(field).await?),
            "cover" => cover_image = Some(read_image(field).await?),
            _ => {}
        }
    }

    let service = UserService::new(state.database.clone(), state.media.clone());
    let user = service
        .update_profile(&caller_id, input, profile_image, cover_image)
        .await?;
    Ok(Json(UserResponse {
        success: true,
        user,
        message: Some("Profile updated successfully".into()),
    }))
}

pub(crate) async fn discover(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Json(request): Json<DiscoverRequest>,
) -> ApiResult<UsersResponse> {
    let service = SocialGraphService::new(state.database.clone(), state.events.clone());
    let users = service.discover_users(&caller_id, request.input.as_deref().unwrap_or(""))?;
    Ok(Json(UsersResponse {
        success: true,
        users,
    }))
}

pub(crate) async fn follow(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Json(request): Json<TargetUserRequest>,
) -> ApiResult<MessageResponse> {
    let service = SocialGraphService::new(state.database.clone(), state.events.clone());
    service.follow_user(&caller_id, &request.id)?;
    Ok(Json(MessageResponse::ok("Now you are following this user")))
}

pub(crate) async fn unfollow(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Json(request): Json<TargetUserRequest>,
) -> ApiResult<MessageResponse> {
    let service = SocialGraphService::new(state.database.clone(), state.events.clone());
    service.unfollow_user(&caller_id, &request.id)?;
    Ok(Json(MessageResponse::ok("No longer following this user")))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|err| ApiError::BadRequest(err.to_string()))
}

async fn read_image(field: axum::extract::multipart::Field<'_>) -> Result<ImageUpload, ApiError> {
    let file_name = field
        .file_name()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "upload".to_string());
    let data = field
        .bytes()
        .await
        .map_err(|err| ApiError::BadRequest(err.to_string()))?
        .to_vec();
    if data.is_empty() {
        return Err(ApiError::BadRequest("uploaded file is empty".into()));
    }
    Ok(ImageUpload { data, file_name })
}
