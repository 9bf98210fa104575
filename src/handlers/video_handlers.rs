//! HTTP handlers for video metadata and the two upload endpoints.
//! Upload bodies are streamed straight from the multipart field into the
//! ingest services; nothing is buffered in full.

use crate::{
    errors::{AppError, ServiceError},
    models::video::{CreateVideoParams, Video},
    services::video_service::owned_video,
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use futures::StreamExt;
use std::io;
use uuid::Uuid;

const THUMBNAIL_FIELD: &str = "thumbnail";
const VIDEO_FIELD: &str = "video";

fn parse_video_id(raw: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw).map_err(|_| ServiceError::Validation(format!("invalid video id `{raw}`")))
}

fn form_error(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::bad_request(format!("Unable to parse form data: {}", err.body_text()))
}

/// `POST /api/videos` - create a metadata row owned by the caller.
pub async fn create_video(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(params): Json<CreateVideoParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = state.auth.validate_bearer_token(&headers)?;
    let video = state.store.create(params, user_id).await?;
    tracing::info!(video_id = %video.id, %user_id, "video created");
    Ok((StatusCode::CREATED, Json(video)))
}

/// `GET /api/videos` - the caller's videos with signed playback URLs.
pub async fn list_videos(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Video>>, AppError> {
    let user_id = state.auth.validate_bearer_token(&headers)?;
    let videos = state.store.list_by_owner(user_id).await?;
    Ok(Json(state.resolver.resolve_all(videos).await?))
}

/// `GET /api/videos/{videoID}` - one video with a signed playback URL.
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<Json<Video>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let video = state.store.get(video_id).await?;
    Ok(Json(state.resolver.resolve(video).await?))
}

/// `DELETE /api/videos/{videoID}` - owner-only. Uploaded objects are kept.
pub async fn delete_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let user_id = state.auth.validate_bearer_token(&headers)?;
    owned_video(&state.store, video_id, user_id).await?;
    state.store.delete(video_id).await?;
    tracing::info!(%video_id, %user_id, "video deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/thumbnail_upload/{videoID}` - multipart field `thumbnail`.
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Video>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let user_id = state.auth.validate_bearer_token(&headers)?;
    let video = owned_video(&state.store, video_id, user_id).await?;

    tracing::info!(%video_id, %user_id, "uploading thumbnail");

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        if field.name() != Some(THUMBNAIL_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(str::to_owned);
        let body = field.map(|chunk| chunk.map_err(io::Error::other));
        let video = state
            .thumbnails
            .ingest(video, content_type.as_deref(), body)
            .await?;
        return Ok(Json(video));
    }

    Err(AppError::bad_request("Unable to get form file `thumbnail`"))
}

/// `POST /api/video_upload/{videoID}` - multipart field `video`.
///
/// Ownership is checked before the body is read.
pub async fn upload_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Video>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let user_id = state.auth.validate_bearer_token(&headers)?;
    let video = owned_video(&state.store, video_id, user_id).await?;

    tracing::info!(%video_id, %user_id, "uploading video");

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(str::to_owned);
        let body = field.map(|chunk| chunk.map_err(io::Error::other));
        let video = state
            .videos
            .ingest(video, content_type.as_deref(), body)
            .await?;
        return Ok(Json(video));
    }

    Err(AppError::bad_request("Unable to get form file `video`"))
}
