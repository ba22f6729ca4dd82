use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, warn};

use crate::{Mood, MoodSource, MoodState, DEFAULT_MOOD};

/// Create the persisted mood record with `default` if it does not exist yet.
pub async fn ensure_mood_file(path: &Path, default: Mood) -> std::io::Result<()> {
    if tokio::fs::try_exists(path).await? {
        return Ok(());
    }
    tokio::fs::write(path, default.as_str()).await
}

/// Read the persisted mood record; absence or garbage falls back to the
/// default mood.
pub async fn read_mood_file(path: &Path) -> Mood {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => match text.trim().parse() {
            Ok(mood) => mood,
            Err(e) => {
                debug!(%e, "ignoring unrecognized mood record");
                DEFAULT_MOOD
            }
        },
        Err(e) => {
            debug!(%e, path = %path.display(), "mood record unreadable, using default");
            DEFAULT_MOOD
        }
    }
}

/// Polls the persisted mood record and applies external edits.
///
/// The file is only re-read when its modification time changed since the
/// last check, so an unchanged record costs one `stat` per interval.
pub struct MoodWatcher {
    path: PathBuf,
    interval: Duration,
}

impl MoodWatcher {
    pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            path: path.into(),
            interval,
        }
    }

    /// Watch the record forever, applying recognized values via
    /// [`MoodState::set`]. Read failures and unrecognized contents never stop
    /// the loop; the current mood is simply retained.
    pub async fn run(self, state: Arc<MoodState>) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_modified: Option<SystemTime> = None;
        loop {
            ticker.tick().await;
            let modified = match tokio::fs::metadata(&self.path).await {
                Ok(meta) => meta.modified().ok(),
                // Absent record: nothing to apply this round.
                Err(_) => continue,
            };
            let Some(modified) = modified else { continue };
            if last_modified == Some(modified) {
                continue;
            }
            last_modified = Some(modified);
            match tokio::fs::read_to_string(&self.path).await {
                Ok(text) => match text.trim().parse::<Mood>() {
                    Ok(mood) => {
                        state.set(mood, MoodSource::File).await;
                    }
                    Err(e) => debug!(%e, "ignoring unrecognized mood record"),
                },
                Err(e) => {
                    warn!(%e, path = %self.path.display(), "failed to read mood record");
                }
            }
        }
    }
}
