//! Video ingest pipeline.
//!
//! stage to temp file -> fast-start rewrite -> probe aspect ratio ->
//! upload with retry -> publish `{bucket},{key}` -> respond with signed URL.
//!
//! Every step is sequential and terminal on failure. Both the staged upload
//! and the rewritten file are owned by the request and removed on every exit
//! path when their guards drop.

use crate::{
    errors::{ServiceError, ServiceResult},
    models::{reference::ObjectReference, video::Video},
    services::{
        faststart::MediaRewriter,
        naming,
        prober::MediaInspector,
        signing::SignedUrlResolver,
        staging::{self, ScratchPath},
        uploader::DurableUploader,
        video_store::VideoStore,
    },
};
use bytes::Bytes;
use futures::Stream;
use std::{io, path::PathBuf, sync::Arc};
use tokio::fs::File;
use tracing::info;
use uuid::Uuid;

/// Maximum request body accepted for a video upload (1 GiB).
pub const MAX_VIDEO_BYTES: usize = 1 << 30;

const VIDEO_CONTENT_TYPE: &str = "video/mp4";
const STAGING_PREFIX: &str = "tubely-upload-";

#[derive(Clone)]
pub struct VideoIngest {
    store: VideoStore,
    inspector: Arc<dyn MediaInspector>,
    rewriter: Arc<dyn MediaRewriter>,
    uploader: DurableUploader,
    resolver: SignedUrlResolver,
    bucket: String,
    temp_dir: PathBuf,
}

impl VideoIngest {
    pub fn new(
        store: VideoStore,
        inspector: Arc<dyn MediaInspector>,
        rewriter: Arc<dyn MediaRewriter>,
        uploader: DurableUploader,
        resolver: SignedUrlResolver,
        bucket: impl Into<String>,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            inspector,
            rewriter,
            uploader,
            resolver,
            bucket: bucket.into(),
            temp_dir: temp_dir.into(),
        }
    }

    /// Publish `body` as the video of `video`, which the caller has already
    /// verified belongs to the requesting user.
    pub async fn ingest<S>(
        &self,
        mut video: Video,
        content_type: Option<&str>,
        body: S,
    ) -> ServiceResult<Video>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let media_type = naming::media_type(content_type)?;
        if media_type != VIDEO_CONTENT_TYPE {
            return Err(ServiceError::UnsupportedMediaType(media_type));
        }

        let (staged_file, staged_path) = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(".mp4")
            .tempfile_in(&self.temp_dir)?
            .into_parts();
        let mut staged_file = File::from_std(staged_file);
        let size_bytes = staging::write_stream(&mut staged_file, body).await?;
        drop(staged_file);
        info!(video_id = %video.id, size_bytes, "upload staged");

        let rewritten = ScratchPath::new(self.rewriter.fast_start(&staged_path).await?);
        let aspect_ratio = self.inspector.aspect_ratio(rewritten.path()).await?;
        info!(video_id = %video.id, %aspect_ratio, "video classified");

        let reference = ObjectReference::new(
            self.bucket.clone(),
            format!("{}/{}.mp4", aspect_ratio, naming::random_name()),
        );

        let mut upload_body = File::open(rewritten.path()).await?;
        self.uploader
            .upload(
                &mut upload_body,
                &reference.bucket,
                &reference.key,
                VIDEO_CONTENT_TYPE,
            )
            .await?;
        drop(upload_body);

        video.publish(&reference);
        self.store.update(&video).await?;
        info!(
            video_id = %video.id,
            user_id = %video.user_id,
            bucket = %reference.bucket,
            key = %reference.key,
            "video published"
        );

        self.resolver.resolve(video).await
    }
}

/// Load `video_id` and check that `user_id` owns it.
pub async fn owned_video(
    store: &VideoStore,
    video_id: Uuid,
    user_id: Uuid,
) -> ServiceResult<Video> {
    let video = store.get(video_id).await?;
    if !video.is_owned_by(user_id) {
        return Err(ServiceError::Forbidden(video_id));
    }
    Ok(video)
}
