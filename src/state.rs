use crate::{pipeline::UploadPipeline, services::video_service::VideoService};
use std::{path::PathBuf, sync::Arc};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub videos: VideoService,
    pub pipeline: Arc<UploadPipeline>,
    /// Thumbnails live here, served under `/assets`.
    pub assets_root: PathBuf,
    pub public_url: String,
    pub temp_dir: PathBuf,
}
