//! Local staging of upload bodies.
//!
//! Every file the pipeline creates is owned by a [`TempFile`] guard which
//! removes it when dropped, so success, early returns and cancelled futures
//! all leave the temp directory clean.

use super::error::{PipelineError, PipelineResult};
use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use md5::Context;
use std::{
    io::{self, ErrorKind, SeekFrom},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{File, OpenOptions},
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::{debug, warn};

/// Owns a path on local disk and deletes it on drop.
///
/// The file does not need to exist yet; a missing file is not an error.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("removed temp file {}", self.path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(
                "failed to remove temp file {}: {}",
                self.path.display(),
                err
            ),
        }
    }
}

/// Raw upload bytes staged on local disk.
#[derive(Debug)]
pub struct StagedUpload {
    // declared before `guard` so the handle closes before the file is removed
    file: File,
    guard: TempFile,
    content_type: String,
    size_bytes: u64,
    md5: String,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        self.guard.path()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Hex MD5 of the staged bytes.
    pub fn md5(&self) -> &str {
        &self.md5
    }

    /// Read the ISO-BMFF major brand (`ftyp` box) from the start of the file.
    ///
    /// Returns `None` when the file does not open with an `ftyp` box. The
    /// handle is rewound afterwards.
    pub async fn major_brand(&mut self) -> io::Result<Option<String>> {
        let mut header = [0u8; 12];
        self.file.seek(SeekFrom::Start(0)).await?;
        let read = self.file.read_exact(&mut header).await;
        self.file.seek(SeekFrom::Start(0)).await?;

        match read {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(err) => return Err(err),
        }
        if &header[4..8] != b"ftyp" {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&header[8..12]).into_owned()))
    }
}

/// Copy `stream` into `path`, refusing to read more than `max_bytes`.
///
/// A body of exactly `max_bytes` is accepted. The file is created
/// exclusively, flushed and synced. On any error the partial file is removed
/// before returning.
pub async fn stage<S>(
    path: PathBuf,
    content_type: &str,
    stream: S,
    max_bytes: u64,
) -> PipelineResult<StagedUpload>
where
    S: Stream<Item = io::Result<Bytes>>,
{
    let mut file = OpenOptions::new()
        .write(true)
        .read(true)
        .create_new(true)
        .open(&path)
        .await?;
    // from here on the guard removes the partial file on every `?`
    let guard = TempFile::new(path);

    let mut size_bytes: u64 = 0;
    let mut digest = Context::new();
    pin_mut!(stream);
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        size_bytes += chunk.len() as u64;
        if size_bytes > max_bytes {
            return Err(PipelineError::TooLarge { limit: max_bytes });
        }
        digest.consume(&chunk);
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    file.sync_all().await?;
    file.seek(SeekFrom::Start(0)).await?;

    Ok(StagedUpload {
        file,
        guard,
        content_type: content_type.to_string(),
        size_bytes,
        md5: format!("{:x}", digest.compute()),
    })
}
