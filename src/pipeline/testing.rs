//! In-process fakes of the pipeline's external collaborators.

use super::{
    error::{PipelineError, PipelineResult},
    media_tool::MediaTool,
    object_store::{ObjectStore, ObjectStoreConfig},
};
use async_trait::async_trait;
use std::{path::Path, sync::Mutex, time::Duration};

#[derive(Clone, Copy, Debug)]
enum RemuxBehaviour {
    Copy,
    Empty,
    Fail,
    FailEmpty,
    Silent,
    Hang,
}

/// Scripted stand-in for ffprobe/ffmpeg.
pub struct FakeMediaTool {
    probe_output: Result<Vec<u8>, String>,
    remux: RemuxBehaviour,
}

impl FakeMediaTool {
    pub fn with_probe_json(json: &str) -> Self {
        Self {
            probe_output: Ok(json.as_bytes().to_vec()),
            remux: RemuxBehaviour::Copy,
        }
    }

    pub fn landscape() -> Self {
        Self::with_probe_json(
            r#"{"streams": [{"codec_type": "video", "width": 1920, "height": 1080}]}"#,
        )
    }

    pub fn with_failing_probe(mut self) -> Self {
        self.probe_output = Err("Invalid data found when processing input".into());
        self
    }

    pub fn with_empty_remux(mut self) -> Self {
        self.remux = RemuxBehaviour::Empty;
        self
    }

    /// Writes a partial file, then reports a non-zero exit.
    pub fn with_failing_remux(mut self) -> Self {
        self.remux = RemuxBehaviour::Fail;
        self
    }

    /// Leaves a zero-byte file, then reports a non-zero exit.
    pub fn with_failing_empty_remux(mut self) -> Self {
        self.remux = RemuxBehaviour::FailEmpty;
        self
    }

    /// Reports success without writing anything.
    pub fn with_silent_remux(mut self) -> Self {
        self.remux = RemuxBehaviour::Silent;
        self
    }

    pub fn with_hanging_remux(mut self) -> Self {
        self.remux = RemuxBehaviour::Hang;
        self
    }
}

#[async_trait]
impl MediaTool for FakeMediaTool {
    async fn probe(&self, _input: &Path) -> PipelineResult<Vec<u8>> {
        self.probe_output
            .clone()
            .map_err(|stderr| PipelineError::ProbeFailed(format!("ffprobe exited with exit status: 1: {stderr}")))
    }

    async fn remux_fast_start(&self, input: &Path, output: &Path) -> PipelineResult<()> {
        match self.remux {
            RemuxBehaviour::Copy => {
                tokio::fs::copy(input, output).await.map(|_| ()).map_err(|e| {
                    PipelineError::RemuxFailed(e.to_string())
                })
            }
            RemuxBehaviour::Empty => tokio::fs::write(output, b"")
                .await
                .map_err(|e| PipelineError::RemuxFailed(e.to_string())),
            RemuxBehaviour::Fail => {
                let _ = tokio::fs::write(output, b"partial").await;
                Err(PipelineError::RemuxFailed(
                    "ffmpeg exited with exit status: 1: moov atom not found".into(),
                ))
            }
            RemuxBehaviour::FailEmpty => {
                let _ = tokio::fs::write(output, b"").await;
                Err(PipelineError::RemuxFailed(
                    "ffmpeg exited with exit status: 1: Invalid argument".into(),
                ))
            }
            RemuxBehaviour::Silent => Ok(()),
            RemuxBehaviour::Hang => {
                let _ = tokio::fs::write(output, b"partial").await;
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            }
        }
    }
}

/// Records every put; optionally fails them all.
pub struct RecordingStore {
    config: ObjectStoreConfig,
    fail: bool,
    hang: bool,
    puts: Mutex<Vec<StoredObject>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            config: ObjectStoreConfig {
                bucket: "tubely-videos".into(),
                region: "us-east-2".into(),
                endpoint: None,
                distribution_url: None,
            },
            fail: false,
            hang: false,
            puts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Never completes a put.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::new()
        }
    }

    pub fn puts(&self) -> Vec<StoredObject> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn put_file(&self, path: &Path, key: &str, content_type: &str) -> PipelineResult<u64> {
        if self.hang {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.fail {
            return Err(PipelineError::UploadFailed(
                "dispatch failure: connection reset".into(),
            ));
        }
        let body = tokio::fs::read(path)
            .await
            .map_err(|e| PipelineError::UploadFailed(e.to_string()))?;
        let size = body.len() as u64;
        self.puts.lock().unwrap().push(StoredObject {
            key: key.to_string(),
            content_type: content_type.to_string(),
            body,
        });
        Ok(size)
    }

    fn public_url(&self, key: &str) -> String {
        self.config.public_url(key)
    }
}
