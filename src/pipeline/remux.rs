//! Fast-start remux of a staged upload into a second temp file.

use super::{
    error::{PipelineError, PipelineResult},
    media_tool::MediaTool,
    staging::{StagedUpload, TempFile},
};
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};
use tokio::fs;

const REMUX_SUFFIX: &str = ".processing";

/// Remuxed copy of a staged upload, removed on drop.
#[derive(Debug)]
pub struct RemuxedUpload {
    guard: TempFile,
    size_bytes: u64,
}

impl RemuxedUpload {
    pub fn path(&self) -> &Path {
        self.guard.path()
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

/// `<input><suffix>` next to the input file.
pub fn remux_output_path(input: &Path) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(REMUX_SUFFIX);
    PathBuf::from(name)
}

/// Run the remux and validate its output.
///
/// A zero-byte output is `EmptyOutput` whatever the tool's exit status.
/// Otherwise a non-zero exit or an output that cannot be stat'ed is
/// `RemuxFailed`. The output is removed on every error.
pub async fn fast_start(tool: &dyn MediaTool, staged: &StagedUpload) -> PipelineResult<RemuxedUpload> {
    let output = remux_output_path(staged.path());
    // guard before spawning so partial output from a failed run is removed too
    let guard = TempFile::new(output);

    let ran = tool.remux_fast_start(staged.path(), guard.path()).await;
    let metadata = fs::metadata(guard.path()).await;

    if matches!(&metadata, Ok(meta) if meta.len() == 0) {
        return Err(PipelineError::EmptyOutput);
    }
    ran?;
    let metadata = metadata
        .map_err(|e| PipelineError::RemuxFailed(format!("remux output unreadable: {e}")))?;

    Ok(RemuxedUpload {
        guard,
        size_bytes: metadata.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{staging::stage, testing::FakeMediaTool};
    use bytes::Bytes;
    use futures::stream;
    use std::io;

    async fn staged_in(dir: &Path) -> StagedUpload {
        let body: Vec<io::Result<Bytes>> = vec![Ok(Bytes::from_static(b"moov-at-the-end"))];
        stage(dir.join("upload.mp4"), "video/mp4", stream::iter(body), 1024)
            .await
            .unwrap()
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn output_path_appends_suffix() {
        assert_eq!(
            remux_output_path(Path::new("/tmp/upload-abc.mp4")),
            PathBuf::from("/tmp/upload-abc.mp4.processing")
        );
    }

    #[tokio::test]
    async fn copies_into_suffixed_file() {
        let dir = tempfile::tempdir().unwrap();
        let staged = staged_in(dir.path()).await;

        let remuxed = fast_start(&FakeMediaTool::landscape(), &staged)
            .await
            .unwrap();

        assert_eq!(remuxed.size_bytes(), 15);
        assert_eq!(
            entries(dir.path()),
            ["upload.mp4", "upload.mp4.processing"]
        );

        drop(remuxed);
        assert_eq!(entries(dir.path()), ["upload.mp4"]);
    }

    #[tokio::test]
    async fn zero_byte_output_is_empty_output() {
        let dir = tempfile::tempdir().unwrap();
        let staged = staged_in(dir.path()).await;

        let err = fast_start(&FakeMediaTool::landscape().with_empty_remux(), &staged)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::EmptyOutput));
        assert_eq!(entries(dir.path()), ["upload.mp4"]);
    }

    #[tokio::test]
    async fn zero_byte_output_wins_over_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let staged = staged_in(dir.path()).await;

        let err = fast_start(&FakeMediaTool::landscape().with_failing_empty_remux(), &staged)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::EmptyOutput));
        assert_eq!(entries(dir.path()), ["upload.mp4"]);
    }

    #[tokio::test]
    async fn tool_failure_removes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let staged = staged_in(dir.path()).await;

        let err = fast_start(&FakeMediaTool::landscape().with_failing_remux(), &staged)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::RemuxFailed(msg) if msg.contains("moov atom not found")));
        assert_eq!(entries(dir.path()), ["upload.mp4"]);
    }

    #[tokio::test]
    async fn missing_output_is_remux_failure() {
        let dir = tempfile::tempdir().unwrap();
        let staged = staged_in(dir.path()).await;

        let err = fast_start(&FakeMediaTool::landscape().with_silent_remux(), &staged)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::RemuxFailed(_)));
    }
}
