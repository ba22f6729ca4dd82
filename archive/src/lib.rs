//! Timestamped preservation of canonical artifacts before overwrite.

use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Copy `source` into `archive_dir` under `<stem>_<timestamp><ext>`.
///
/// A missing source is a no-op returning `None` (nothing is created), so the
/// first run of a fresh installation archives nothing. The source file is
/// left untouched at its canonical path. Copy failures are logged and
/// likewise return `None`; archiving never aborts the caller.
pub async fn archive_file(source: &Path, archive_dir: &Path) -> Option<PathBuf> {
    match tokio::fs::try_exists(source).await {
        Ok(true) => {}
        _ => {
            debug!(source = %source.display(), "nothing to archive");
            return None;
        }
    }
    if let Err(e) = tokio::fs::create_dir_all(archive_dir).await {
        warn!(%e, dir = %archive_dir.display(), "could not create archive directory");
        return None;
    }
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    let ext = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let target = archive_dir.join(format!("{stem}_{stamp}{ext}"));
    match tokio::fs::copy(source, &target).await {
        Ok(_) => {
            info!(from = %source.display(), to = %target.display(), "artifact archived");
            Some(target)
        }
        Err(e) => {
            warn!(%e, source = %source.display(), "archive copy failed");
            None
        }
    }
}
