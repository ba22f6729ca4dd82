//! Wiring for the ANDI installation binary.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use mood::{Mood, MoodSource, MoodState};

pub mod web;

/// Initialize logging to stdout; `RUST_LOG` overrides the `info` default.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Apply mood commands from the front-end.
///
/// Each accepted command goes through [`MoodState::set`]; when it actually
/// changed the state, the new value is also persisted wholesale to the mood
/// record so it survives a restart (and so the file watcher and the command
/// path agree on the last word).
pub async fn listen_commands(
    mut rx: mpsc::UnboundedReceiver<Mood>,
    state: Arc<MoodState>,
    mood_file: PathBuf,
) {
    while let Some(mood) = rx.recv().await {
        if state.set(mood, MoodSource::Command).await {
            if let Err(e) = tokio::fs::write(&mood_file, mood.as_str()).await {
                warn!(%e, path = %mood_file.display(), "failed to persist mood record");
            }
        }
    }
    debug!("command channel closed");
}

/// A set of long-running loops torn down together at shutdown.
pub struct TaskGroup {
    handles: Vec<(&'static str, tokio::task::JoinHandle<()>)>,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    pub fn spawn<F>(&mut self, name: &'static str, fut: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.handles.push((name, tokio::spawn(fut)));
    }

    pub async fn shutdown(mut self) {
        for (name, handle) in &self.handles {
            debug!(task = name, "stopping");
            handle.abort();
        }
        for (_, handle) in self.handles.drain(..) {
            let _ = handle.await;
        }
    }
}

impl Default for TaskGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskGroup {
    fn drop(&mut self) {
        for (_, handle) in &self.handles {
            handle.abort();
        }
    }
}
