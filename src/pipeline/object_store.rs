//! Object storage for processed videos.

use super::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, meta::region::RegionProviderChain};
use aws_sdk_s3::{Client, error::DisplayErrorContext, primitives::ByteStream};
use base64::{Engine as _, engine::general_purpose};
use md5::Context;
use std::{io, path::Path, time::Instant};
use tokio::{fs::File, io::AsyncReadExt};
use tracing::{error, info};

/// Single-call object creation from a local file.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store the file at `path` under `key`. Returns the number of bytes written.
    ///
    /// Either the complete object is created or nothing is.
    async fn put_file(&self, path: &Path, key: &str, content_type: &str) -> PipelineResult<u64>;

    /// Public URL under which `key` is served.
    fn public_url(&self, key: &str) -> String;
}

/// Immutable store settings, fixed at construction.
#[derive(Clone, Debug)]
pub struct ObjectStoreConfig {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible providers (MinIO, R2, ...).
    pub endpoint: Option<String>,
    /// CDN in front of the bucket; takes precedence for public URLs.
    pub distribution_url: Option<String>,
}

impl ObjectStoreConfig {
    pub fn public_url(&self, key: &str) -> String {
        if let Some(distribution) = &self.distribution_url {
            format!("{}/{}", distribution.trim_end_matches('/'), key)
        } else if let Some(endpoint) = &self.endpoint {
            format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }
}

#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    config: ObjectStoreConfig,
}

impl S3ObjectStore {
    /// Build a client from the ambient AWS credential chain.
    pub async fn connect(config: ObjectStoreConfig) -> Self {
        let region_provider =
            RegionProviderChain::first_try(Region::new(config.region.clone()));
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            // S3-compatible providers generally need path-style addressing
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            config,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_file(&self, path: &Path, key: &str, content_type: &str) -> PipelineResult<u64> {
        let start = Instant::now();
        let (size_bytes, md5) = file_content_md5(path)
            .await
            .map_err(|e| PipelineError::UploadFailed(format!("cannot read upload body: {e}")))?;
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| PipelineError::UploadFailed(format!("cannot read upload body: {e}")))?;

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .content_length(size_bytes as i64)
            .content_md5(md5)
            .send()
            .await
            .map_err(|e| {
                error!(
                    bucket = %self.config.bucket,
                    key = %key,
                    size_bytes,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                PipelineError::UploadFailed(DisplayErrorContext(&e).to_string())
            })?;

        info!(
            bucket = %self.config.bucket,
            key = %key,
            size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );
        Ok(size_bytes)
    }

    fn public_url(&self, key: &str) -> String {
        self.config.public_url(key)
    }
}

/// Size and base64 MD5 (the `Content-MD5` header form) of a file.
async fn file_content_md5(path: &Path) -> io::Result<(u64, String)> {
    let mut file = File::open(path).await?;
    let mut digest = Context::new();
    let mut buf = vec![0u8; 64 * 1024];
    let mut size_bytes = 0u64;
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        size_bytes += n as u64;
        digest.consume(&buf[..n]);
    }
    Ok((size_bytes, general_purpose::STANDARD.encode(digest.compute().0)))
}
