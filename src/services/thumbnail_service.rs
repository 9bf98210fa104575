//! Thumbnail ingest: validates an image upload, stores it under the static
//! asset directory and points the video's thumbnail at its public URL.

use crate::{
    errors::{ServiceError, ServiceResult},
    models::video::Video,
    services::{naming, signing::SignedUrlResolver, staging, video_store::VideoStore},
};
use bytes::Bytes;
use futures::Stream;
use std::{io, path::PathBuf};
use tokio::fs::{self, OpenOptions};
use tracing::info;

/// Maximum request body accepted for a thumbnail upload.
pub const MAX_THUMBNAIL_BYTES: usize = 10 << 20;

#[derive(Clone)]
pub struct ThumbnailIngest {
    store: VideoStore,
    resolver: SignedUrlResolver,
    assets_root: PathBuf,
    public_base_url: String,
}

impl ThumbnailIngest {
    pub fn new(
        store: VideoStore,
        resolver: SignedUrlResolver,
        assets_root: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            resolver,
            assets_root: assets_root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Store `body` as the thumbnail of `video`, which the caller has already
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
        let extension = extension_for(&media_type)
            .ok_or_else(|| ServiceError::UnsupportedMediaType(media_type.clone()))?;
        // The response resolves the video reference; a corrupt one must fail
        // before anything is written.
        video.reference()?;

        let filename = format!("{}{}", naming::random_name(), extension);
        let path = self.assets_root.join(&filename);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        if let Err(err) = staging::write_stream(&mut file, body).await {
            drop(file);
            let _ = fs::remove_file(&path).await;
            return Err(err);
        }
        drop(file);

        video.set_thumbnail(format!("{}/assets/{}", self.public_base_url, filename));
        if let Err(err) = self.store.update(&video).await {
            let _ = fs::remove_file(&path).await;
            return Err(err.into());
        }

        info!(video_id = %video.id, user_id = %video.user_id, %filename, "thumbnail stored");
        self.resolver.resolve(video).await
    }
}

fn extension_for(media_type: &str) -> Option<&'static str> {
    match media_type {
        "image/jpeg" => Some(".jpg"),
        "image/png" => Some(".png"),
        _ => None,
    }
}
