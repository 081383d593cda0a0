//! External media tools (ffprobe / ffmpeg) behind a mockable trait.

use super::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use std::{
    path::{Path, PathBuf},
    process::Stdio,
};
use tokio::process::Command;
use tracing::debug;

/// The two operations the pipeline needs from an external media toolkit.
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Return the tool's JSON stream description of `input`.
    async fn probe(&self, input: &Path) -> PipelineResult<Vec<u8>>;

    /// Stream-copy `input` into `output` with the index moved to the front.
    async fn remux_fast_start(&self, input: &Path, output: &Path) -> PipelineResult<()>;
}

/// Runs the real `ffprobe` and `ffmpeg` binaries.
///
/// Child processes are killed when the awaiting future is dropped, so a
/// timed-out or cancelled run does not leave a tool writing into a file
/// that is about to be removed.
#[derive(Clone, Debug)]
pub struct FfmpegTool {
    ffprobe_path: PathBuf,
    ffmpeg_path: PathBuf,
}

impl FfmpegTool {
    pub fn new(ffprobe_path: impl Into<PathBuf>, ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    fn probe_command(&self, input: &Path) -> Command {
        let mut cmd = Command::new(&self.ffprobe_path);
        cmd.args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(input);
        cmd
    }

    fn remux_command(&self, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.args(["-y", "-v", "error", "-i"])
            .arg(input)
            .args(["-c", "copy", "-movflags", "faststart", "-f", "mp4"])
            .arg(output);
        cmd
    }
}

#[async_trait]
impl MediaTool for FfmpegTool {
    async fn probe(&self, input: &Path) -> PipelineResult<Vec<u8>> {
        let mut cmd = self.probe_command(input);
        debug!("spawning ffprobe for {}", input.display());

        let output = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PipelineError::ProbeFailed(format!("failed to spawn ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(PipelineError::ProbeFailed(format!(
                "ffprobe exited with {}: {}",
                output.status,
                diagnostics(&output.stderr, &[(input, "<input>")])
            )));
        }

        Ok(output.stdout)
    }

    async fn remux_fast_start(&self, input: &Path, output: &Path) -> PipelineResult<()> {
        let mut cmd = self.remux_command(input, output);
        debug!(
            "spawning ffmpeg fast-start remux {} -> {}",
            input.display(),
            output.display()
        );

        let process_output = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PipelineError::RemuxFailed(format!("failed to spawn ffmpeg: {e}")))?;

        if !process_output.status.success() {
            return Err(PipelineError::RemuxFailed(format!(
                "ffmpeg exited with {}: {}",
                process_output.status,
                // output extends the input path, so it is replaced first
                diagnostics(
                    &process_output.stderr,
                    &[(output, "<output>"), (input, "<input>")]
                )
            )));
        }

        Ok(())
    }
}

/// Captured stderr with local paths swapped for placeholders.
fn diagnostics(stderr: &[u8], paths: &[(&Path, &str)]) -> String {
    let mut text = String::from_utf8_lossy(stderr).trim().to_string();
    for (path, placeholder) in paths {
        let shown = path.to_string_lossy();
        if !shown.is_empty() {
            text = text.replace(shown.as_ref(), placeholder);
        }
    }
    text
}
