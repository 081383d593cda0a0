//! Upload processing pipeline.
//!
//! A run moves through `Staged → Probed → Classified → Remuxed → Uploaded →
//! Done`. Each transition is attempted once; the first failure ends the run.
//! Temp files are owned by drop guards, so they are removed on every exit
//! path, including a dropped request future. The remote store is written
//! last, which means a failed run never leaves an object behind.

pub mod aspect;
pub mod error;
pub mod media_tool;
pub mod object_store;
pub mod probe;
pub mod remux;
pub mod staging;
#[cfg(test)]
pub(crate) mod testing;

use aspect::{AspectClass, object_key};
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use error::{PipelineError, PipelineResult};
use futures::Stream;
use media_tool::MediaTool;
use mime::Mime;
use object_store::ObjectStore;
use serde::Serialize;
use std::{fmt, future::Future, io, path::PathBuf, sync::Arc, time::Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Upper bound for a single video upload (1 GiB).
pub const MAX_VIDEO_UPLOAD_BYTES: u64 = 1 << 30;

const ACCEPTED_MEDIA_TYPE: &str = "video/mp4";

/// Resilience knobs. There are no built-in retries; timeouts are opt-in.
#[derive(Clone, Copy, Debug)]
pub struct PipelinePolicy {
    pub max_upload_bytes: u64,
    /// Applied to each probe and remux invocation.
    pub tool_timeout: Option<Duration>,
    pub upload_timeout: Option<Duration>,
}

impl Default for PipelinePolicy {
    fn default() -> Self {
        Self {
            max_upload_bytes: MAX_VIDEO_UPLOAD_BYTES,
            tool_timeout: None,
            upload_timeout: None,
        }
    }
}

/// What a successful run hands back to the caller.
#[derive(Clone, Debug, Serialize)]
pub struct UploadResult {
    pub key: String,
    pub url: String,
    pub content_type: String,
    pub aspect: AspectClass,
    pub size_bytes: u64,
}

/// Last state a run reached; logged alongside failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Started,
    Staged,
    Probed,
    Classified,
    Remuxed,
    Uploaded,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Started => "started",
            Stage::Staged => "staged",
            Stage::Probed => "probed",
            Stage::Classified => "classified",
            Stage::Remuxed => "remuxed",
            Stage::Uploaded => "uploaded",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Sequences staging, probing, classification, remuxing and upload.
///
/// Holds no per-upload state; one instance serves concurrent requests.
pub struct UploadPipeline {
    media: Arc<dyn MediaTool>,
    store: Arc<dyn ObjectStore>,
    temp_dir: PathBuf,
    policy: PipelinePolicy,
}

impl UploadPipeline {
    pub fn new(
        media: Arc<dyn MediaTool>,
        store: Arc<dyn ObjectStore>,
        temp_dir: impl Into<PathBuf>,
        policy: PipelinePolicy,
    ) -> Self {
        Self {
            media,
            store,
            temp_dir: temp_dir.into(),
            policy,
        }
    }

    /// Process one upload body declared as `content_type`.
    pub async fn run<S>(&self, content_type: &str, body: S) -> PipelineResult<UploadResult>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let mut stage = Stage::Started;
        let result = self.run_stages(content_type, body, &mut stage).await;
        if let Err(err) = &result {
            warn!(stage = %stage, error = %err, "upload pipeline failed");
        }
        result
    }

    async fn run_stages<S>(
        &self,
        content_type: &str,
        body: S,
        stage: &mut Stage,
    ) -> PipelineResult<UploadResult>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let media_type = accepted_media_type(content_type)?;
        let extension = media_type.subtype().as_str().to_string();
        let name = random_name();

        let staged_path = self.temp_dir.join(format!("upload-{}.{}", name, extension));
        let mut staged = staging::stage(
            staged_path,
            media_type.essence_str(),
            body,
            self.policy.max_upload_bytes,
        )
        .await?;
        *stage = Stage::Staged;
        let brand = staged.major_brand().await.ok().flatten();
        info!(
            content_type = %staged.content_type(),
            size_bytes = staged.size_bytes(),
            md5 = %staged.md5(),
            brand = brand.as_deref().unwrap_or("none"),
            "staged upload"
        );

        let info = with_timeout(
            "probe",
            self.policy.tool_timeout,
            probe::probe_dimensions(self.media.as_ref(), staged.path()),
        )
        .await?;
        *stage = Stage::Probed;

        let aspect = AspectClass::classify(info.width, info.height)?;
        *stage = Stage::Classified;
        info!(
            width = info.width,
            height = info.height,
            aspect = %aspect,
            "classified upload"
        );

        let remuxed = with_timeout(
            "remux",
            self.policy.tool_timeout,
            remux::fast_start(self.media.as_ref(), &staged),
        )
        .await?;
        *stage = Stage::Remuxed;
        // the remuxed copy is confirmed valid, the original is no longer needed
        drop(staged);
        debug!(size_bytes = remuxed.size_bytes(), "remuxed upload");

        let key = object_key(aspect, &name, &extension);
        let size_bytes = with_timeout(
            "upload",
            self.policy.upload_timeout,
            self.store
                .put_file(remuxed.path(), &key, media_type.essence_str()),
        )
        .await?;
        *stage = Stage::Uploaded;
        drop(remuxed);

        let url = self.store.public_url(&key);
        *stage = Stage::Done;
        info!(key = %key, url = %url, "upload pipeline finished");

        Ok(UploadResult {
            key,
            url,
            content_type: media_type.essence_str().to_string(),
            aspect,
            size_bytes,
        })
    }
}

/// Parse `content_type` and accept only `video/mp4` (parameters ignored).
fn accepted_media_type(content_type: &str) -> PipelineResult<Mime> {
    let mime: Mime = content_type
        .parse()
        .map_err(|_| PipelineError::UnsupportedMediaType(content_type.to_string()))?;
    if mime.essence_str() != ACCEPTED_MEDIA_TYPE {
        return Err(PipelineError::UnsupportedMediaType(content_type.to_string()));
    }
    Ok(mime)
}

/// 128 random bits, URL-safe base64 without padding.
fn random_name() -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes())
}

async fn with_timeout<T>(
    stage: &'static str,
    limit: Option<Duration>,
    fut: impl Future<Output = PipelineResult<T>>,
) -> PipelineResult<T> {
    match limit {
        Some(after) => tokio::time::timeout(after, fut)
            .await
            .map_err(|_| PipelineError::Timeout { stage, after })?,
        None => fut.await,
    }
}
