//! Object store collaborator: streaming puts and presigned GET URLs over a
//! bucket/key namespace.

use async_trait::async_trait;
use axum::http::Method;
use object_store::{
    Attribute, AttributeValue, Attributes, ObjectStore,
    aws::{AmazonS3, AmazonS3Builder},
    buffered::BufWriter,
    path::Path,
    signer::Signer,
};
use std::{io, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("failed to configure client for bucket `{bucket}`: {source}")]
    Config {
        bucket: String,
        #[source]
        source: object_store::Error,
    },
    #[error("upload of `{bucket}/{key}` failed: {source}")]
    Put {
        bucket: String,
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to presign `{bucket}/{key}`: {source}")]
    Presign {
        bucket: String,
        key: String,
        #[source]
        source: object_store::Error,
    },
}

pub type ObjectStoreResult<T> = Result<T, ObjectStoreError>;

/// Bucket/key object storage. Implementations must be safe for concurrent use.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Write the whole of `body` to `bucket/key` with the given content type.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: &mut (dyn AsyncRead + Send + Unpin),
        content_type: &str,
    ) -> ObjectStoreResult<()>;

    /// Time-boxed GET URL for a private object.
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> ObjectStoreResult<String>;
}

/// S3 (or S3-compatible) storage via the `object_store` crate.
///
/// `AmazonS3` is bound to a single bucket, so the configured default bucket
/// keeps a ready client and any other bucket named in a stored reference gets
/// one built from the same template.
#[derive(Clone)]
pub struct S3ObjectStorage {
    template: AmazonS3Builder,
    default_bucket: String,
    default_client: Arc<AmazonS3>,
}

impl S3ObjectStorage {
    /// Credentials come from the standard `AWS_*` environment variables.
    /// `endpoint_url` targets S3-compatible providers such as MinIO.
    pub fn new(
        bucket: &str,
        region: &str,
        endpoint_url: Option<&str>,
    ) -> ObjectStoreResult<Self> {
        let mut template = AmazonS3Builder::from_env().with_region(region);
        if let Some(endpoint) = endpoint_url {
            template = template
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let default_client = Arc::new(build_client(&template, bucket)?);
        Ok(Self {
            template,
            default_bucket: bucket.to_string(),
            default_client,
        })
    }

    fn client_for(&self, bucket: &str) -> ObjectStoreResult<Arc<AmazonS3>> {
        if bucket == self.default_bucket {
            return Ok(self.default_client.clone());
        }
        Ok(Arc::new(build_client(&self.template, bucket)?))
    }
}

fn build_client(template: &AmazonS3Builder, bucket: &str) -> ObjectStoreResult<AmazonS3> {
    template
        .clone()
        .with_bucket_name(bucket)
        .build()
        .map_err(|source| ObjectStoreError::Config {
            bucket: bucket.to_string(),
            source,
        })
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: &mut (dyn AsyncRead + Send + Unpin),
        content_type: &str,
    ) -> ObjectStoreResult<()> {
        let client: Arc<dyn ObjectStore> = self.client_for(bucket)?;

        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_string()),
        );
        let mut writer =
            BufWriter::new(client, Path::from(key)).with_attributes(attributes);

        let copied = match tokio::io::copy(body, &mut writer).await {
            Ok(copied) => copied,
            Err(source) => {
                if let Err(err) = writer.abort().await {
                    warn!(bucket, key, error = %err, "failed to abort partial upload");
                }
                return Err(ObjectStoreError::Put {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    source,
                });
            }
        };

        writer
            .shutdown()
            .await
            .map_err(|source| ObjectStoreError::Put {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source,
            })?;

        debug!(bucket, key, size_bytes = copied, "object uploaded");
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> ObjectStoreResult<String> {
        let client = self.client_for(bucket)?;
        let url = client
            .signed_url(Method::GET, &Path::from(key), expires_in)
            .await
            .map_err(|source| ObjectStoreError::Presign {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source,
            })?;
        Ok(url.to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_clients_for_foreign_buckets() {
        let storage = S3ObjectStorage::new("tubely-media", "us-east-1", Some("http://localhost:9000"))
            .unwrap();
        assert!(Arc::ptr_eq(
            &storage.client_for("tubely-media").unwrap(),
            &storage.default_client
        ));
        assert!(!Arc::ptr_eq(
            &storage.client_for("archive").unwrap(),
            &storage.default_client
        ));
    }
}
