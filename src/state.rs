//! Shared handler state, assembled once at startup from `AppConfig` and the
//! concrete collaborators. Core logic receives its dependencies from here and
//! never reads configuration on its own.

use crate::{
    config::AppConfig,
    services::{
        auth::JwtAuth,
        faststart::MediaRewriter,
        object_storage::ObjectStorage,
        prober::MediaInspector,
        signing::SignedUrlResolver,
        thumbnail_service::{MAX_THUMBNAIL_BYTES, ThumbnailIngest},
        uploader::DurableUploader,
        video_service::{MAX_VIDEO_BYTES, VideoIngest},
        video_store::VideoStore,
    },
};
use std::{path::PathBuf, sync::Arc};

#[derive(Clone)]
pub struct AppState {
    pub store: VideoStore,
    pub auth: JwtAuth,
    pub resolver: SignedUrlResolver,
    pub thumbnails: ThumbnailIngest,
    pub videos: VideoIngest,
    pub assets_root: PathBuf,
    /// Request body ceilings for the two upload routes.
    pub max_thumbnail_bytes: usize,
    pub max_video_bytes: usize,
}

impl AppState {
    pub fn new(
        cfg: &AppConfig,
        store: VideoStore,
        storage: Arc<dyn ObjectStorage>,
        inspector: Arc<dyn MediaInspector>,
        rewriter: Arc<dyn MediaRewriter>,
    ) -> Self {
        let resolver = SignedUrlResolver::new(storage.clone());
        let thumbnails = ThumbnailIngest::new(
            store.clone(),
            resolver.clone(),
            cfg.assets_root.clone(),
            cfg.public_url.clone(),
        );
        let videos = VideoIngest::new(
            store.clone(),
            inspector,
            rewriter,
            DurableUploader::new(storage),
            resolver.clone(),
            cfg.s3_bucket.clone(),
            cfg.temp_dir.clone(),
        );

        Self {
            store,
            auth: JwtAuth::new(&cfg.jwt_secret),
            resolver,
            thumbnails,
            videos,
            assets_root: cfg.assets_root.clone(),
            max_thumbnail_bytes: MAX_THUMBNAIL_BYTES,
            max_video_bytes: MAX_VIDEO_BYTES,
        }
    }
}
