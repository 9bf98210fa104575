//! Defines routes for video metadata, uploads and static assets.
//!
//! ## Structure
//! - **Metadata endpoints**
//!   - `POST   /api/videos` - create video (caller becomes owner)
//!   - `GET    /api/videos` - list caller's videos (signed playback URLs)
//!   - `GET    /api/videos/{videoID}` - fetch one video (signed playback URL)
//!   - `DELETE /api/videos/{videoID}` - delete video (owner only)
//!
//! - **Upload endpoints** (multipart)
//!   - `POST   /api/thumbnail_upload/{videoID}` - field `thumbnail`, 10 MiB cap
//!   - `POST   /api/video_upload/{videoID}` - field `video`, 1 GiB cap
//!
//! - `GET /assets/*` serves stored thumbnails from the asset root.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        video_handlers::{
            create_video, delete_video, get_video, list_videos, upload_thumbnail, upload_video,
        },
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::services::ServeDir;

/// Build the application router with its shared state attached.
pub fn routes(state: AppState) -> Router {
    let assets = ServeDir::new(&state.assets_root);

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/videos", get(list_videos).post(create_video))
        .route("/api/videos/{videoID}", get(get_video).delete(delete_video))
        .route(
            "/api/thumbnail_upload/{videoID}",
            post(upload_thumbnail).layer(DefaultBodyLimit::max(state.max_thumbnail_bytes)),
        )
        .route(
            "/api/video_upload/{videoID}",
            post(upload_video).layer(DefaultBodyLimit::max(state.max_video_bytes)),
        )
        .nest_service("/assets", assets)
        .with_state(state)
}
