use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

use crate::Mood;

/// Where the last mood change came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoodSource {
    /// Initial value applied at process start.
    Startup,
    /// Persisted mood record picked up by the [`MoodWatcher`](crate::MoodWatcher).
    File,
    /// Direct request from the command front-end.
    Command,
}

struct Inner {
    mood: Mood,
    source: MoodSource,
    changed_at: DateTime<Utc>,
}

/// The single authoritative mood value.
///
/// Multiple writers (file watcher, command listener) and one hot-path reader
/// (the trigger pipeline's per-run snapshot) share this state. Every committed
/// change is pushed once onto the channel returned by [`MoodState::new`],
/// which the serial push loop drains; redundant writes are suppressed so the
/// serial peer sees at most one line per actual change.
pub struct MoodState {
    inner: Mutex<Inner>,
    push: mpsc::UnboundedSender<Mood>,
}

impl MoodState {
    /// Create the state with `initial` already committed (no push is emitted
    /// for the initial value). The receiver carries one [`Mood`] per
    /// committed change; dropping it simply disables propagation.
    pub fn new(initial: Mood) -> (Arc<Self>, mpsc::UnboundedReceiver<Mood>) {
        let (push, rx) = mpsc::unbounded_channel();
        let state = Arc::new(Self {
            inner: Mutex::new(Inner {
                mood: initial,
                source: MoodSource::Startup,
                changed_at: Utc::now(),
            }),
            push,
        });
        (state, rx)
    }

    /// Commit `mood` if it differs from the current value.
    ///
    /// Returns whether a change occurred. On change the source and timestamp
    /// are recorded and the new mood is propagated to the push channel.
    pub async fn set(&self, mood: Mood, source: MoodSource) -> bool {
        {
            let mut inner = self.inner.lock().await;
            if inner.mood == mood {
                return false;
            }
            inner.mood = mood;
            inner.source = source;
            inner.changed_at = Utc::now();
        }
        info!(%mood, ?source, "mood changed");
        let _ = self.push.send(mood);
        true
    }

    /// Latest committed mood. Never observes a half-written value.
    pub async fn current(&self) -> Mood {
        self.inner.lock().await.mood
    }

    /// Source and timestamp of the last committed change.
    pub async fn last_change(&self) -> (MoodSource, DateTime<Utc>) {
        let inner = self.inner.lock().await;
        (inner.source, inner.changed_at)
    }
}
