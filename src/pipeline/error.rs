use std::{io, time::Duration};
use thiserror::Error;

/// Failures of a single upload pipeline run. Every variant is terminal for
/// that run; nothing is retried.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unsupported media type `{0}`, only video/mp4 is accepted")]
    UnsupportedMediaType(String),
    #[error("upload exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },
    #[error("failed to stage upload: {0}")]
    StagingFailed(#[from] io::Error),
    #[error("ffprobe failed: {0}")]
    ProbeFailed(String),
    #[error("no video stream with dimensions found")]
    NoStreamFound,
    #[error("invalid video dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("fast-start remux failed: {0}")]
    RemuxFailed(String),
    #[error("fast-start remux produced an empty file")]
    EmptyOutput,
    #[error("object store upload failed: {0}")]
    UploadFailed(String),
    #[error("{stage} did not finish within {}s", .after.as_secs())]
    Timeout {
        stage: &'static str,
        after: Duration,
    },
}

pub type PipelineResult<T> = Result<T, PipelineError>;
