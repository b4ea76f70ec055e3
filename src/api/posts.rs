use super::{ApiError, ApiResult, AppState, CallerId, MessageResponse};
use crate::posts::{AddPostInput, FeedPostView, LikeOutcome, PostService, PostView};
use crate::users::ImageUpload;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct PostResponse {
    success: bool,
    message: String,
    post: PostView,
}

#[derive(Debug, Serialize)]
pub(crate) struct FeedResponse {
    success: bool,
    posts: Vec<FeedPostView>,
}

pub(crate) async fn create_post(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    mut multipart: Multipart,
) -> ApiResult<PostResponse> {
    let mut content = String::new();
    let mut post_type = String::from("text");
    let mut images = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(err.to_string()))?
    {
        let Some(name) = field.name().map(|s| s.to_string()) else {
            continue;
        };
        match name.as_str() {
            "content" => {
                content = field
                    .text()
                    .await
                    .map_err(|err| ApiError::BadRequest(err.to_string()))?;
            }
            "post_type" => {
                post_type = field
                    .text()
                    .await
                    .map_err(|err| ApiError::BadRequest(err.to_string()))?;
            }
            "images" => {
                let file_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "image".to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|err| ApiError::BadRequest(err.to_string()))?
                    .to_vec();
                if !data.is_empty() {
                    images.push(ImageUpload { data, file_name });
                }
            }
            _ => {}
        }
    }

    let service = PostService::new(state.database.clone(), state.media.clone());
    let post = service
        .add_post(
            &caller_id,
            AddPostInput { content, post_type },
            images,
        )
        .await?;
    Ok(Json(PostResponse {
        success: true,
        message: "Post created successfully".into(),
        post,
    }))
}

pub(crate) async fn get_feed(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
) -> ApiResult<FeedResponse> {
    let service = PostService::new(state.database.clone(), state.media.clone());
    let posts = service.feed_for(&caller_id)?;
    Ok(Json(FeedResponse {
        success: true,
        posts,
    }))
}

pub(crate) async fn like_post(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Path(post_id): Path<String>,
) -> ApiResult<MessageResponse> {
    let service = PostService::new(state.database.clone(), state.media.clone());
    let message = match service.toggle_like(&caller_id, &post_id)? {
        LikeOutcome::Liked => "Post liked",
        LikeOutcome::Unliked => "Post unliked",
    };
    Ok(Json(MessageResponse::ok(message)))
}
