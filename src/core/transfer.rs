// Per-request transfer state and its scratch file

use std::fmt;
use std::io;
use std::path::Path;

use log::{debug, warn};
use tempfile::TempPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Resolving,
    Downloading,
    Uploading,
    Done,
    Failed,
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferStatus::Resolving => "resolving",
            TransferStatus::Downloading => "downloading",
            TransferStatus::Uploading => "uploading",
            TransferStatus::Done => "done",
            TransferStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One link being processed, owned by the task handling the message
///
/// The scratch file is held as a [`TempPath`], so it is removed when the
/// transfer is finished, and also when the owning task unwinds.
#[derive(Debug)]
pub struct PendingTransfer {
    pub source_link: String,
    resolved_url: Option<String>,
    status: TransferStatus,
    temp: Option<TempPath>,
}

impl PendingTransfer {
    pub fn new<S: Into<String>>(source_link: S) -> Self {
        Self {
            source_link: source_link.into(),
            resolved_url: None,
            status: TransferStatus::Resolving,
            temp: None,
        }
    }

    pub fn status(&self) -> TransferStatus {
        self.status
    }

    pub fn set_status(&mut self, status: TransferStatus) {
        debug!("Transfer {}: {} -> {}", self.source_link, self.status, status);
        self.status = status;
    }

    pub fn set_resolved(&mut self, url: String) {
        self.resolved_url = Some(url);
    }

    pub fn resolved_url(&self) -> Option<&str> {
        self.resolved_url.as_deref()
    }

    /// Creates the scratch file in `dir` and moves to `Downloading`
    ///
    /// Directory and file creation run on the blocking pool.
    pub async fn allocate_temp(&mut self, dir: &Path) -> io::Result<&Path> {
        let dir = dir.to_path_buf();
        let path = tokio::task::spawn_blocking(move || create_temp(&dir))
            .await
            .map_err(io::Error::other)??;
        self.set_status(TransferStatus::Downloading);
        let path: &Path = self.temp.insert(path);
        Ok(path)
    }

    pub fn temp_path(&self) -> Option<&Path> {
        self.temp.as_deref()
    }

    /// Deletes the scratch file if one exists
    pub fn cleanup(&mut self) {
        if let Some(path) = self.temp.take() {
            let display = path.display().to_string();
            match path.close() {
                Ok(()) => debug!("Removed {}", display),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {}: {}", display, e),
            }
        }
    }

    /// Terminal transition; always releases the scratch file
    pub fn finish(&mut self, status: TransferStatus) {
        self.set_status(status);
        self.cleanup();
    }
}

const TEMP_PREFIX: &str = "teradrop-";
const TEMP_SUFFIX: &str = ".part";

fn create_temp(dir: &Path) -> io::Result<TempPath> {
    std::fs::create_dir_all(dir)?;
    Ok(tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)?
        .into_temp_path())
}

/// Removes partial downloads orphaned by a previous crash
pub fn purge_stale_files(dir: &Path) -> io::Result<usize> {
    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX) && entry.file_type()?.is_file() {
            match std::fs::remove_file(entry.path()) {
                Ok(()) => count += 1,
                Err(e) => warn!("Failed to remove {}: {}", entry.path().display(), e),
            }
        }
    }
    Ok(count)
}
