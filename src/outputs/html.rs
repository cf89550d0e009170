//! HTML report writer.
//!
//! Writes exactly one file per run, truncating whatever was there before.
//! There is no append mode and no backup of the previous report.

use crate::error::WriteError;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

/// Write `document` to `path` as UTF-8, creating parent directories as needed.
///
/// The file handle is flushed and synced before returning and is dropped on
/// every path out of this function, including errors.
///
/// # Returns
///
/// The number of bytes written.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_report(path: &Path, document: &str) -> Result<usize, WriteError> {
    let wrap = |source| WriteError {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(wrap)?;
    }

    let mut file = fs::File::create(path).await.map_err(wrap)?;
    file.write_all(document.as_bytes()).await.map_err(wrap)?;
    file.flush().await.map_err(wrap)?;
    file.sync_all().await.map_err(wrap)?;

    info!(bytes = document.len(), "Wrote report");
    Ok(document.len())
}
