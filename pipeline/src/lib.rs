//! The trigger pipeline: a distance reading becomes a bounded,
//! non-overlapping, multi-stage run.
//!
//! While `ARMED` the poll loop samples the distance sensor; a reading below
//! the threshold starts a run through `SIGNALING → CAPTURING → ANALYZING →
//! SYNTHESIZING → ARCHIVING → PLAYING → COOLDOWN` and back to `ARMED`. Runs
//! never overlap: no sampling happens until the cooldown ends. Every
//! external failure is isolated to its stage; a run always reaches cooldown
//! and the loop always re-arms.

use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use hardware::Hardware;
use mood::MoodState;
use speech::{Player, Synthesizer};
use vision::{Analyzer, FALLBACK_REACTION};

mod report;

pub use report::{RunReport, Stage, StageOutcome, StageStatus};

/// Observable state of the trigger state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Armed,
    Detected,
    Signaling,
    Capturing,
    Analyzing,
    Synthesizing,
    Archiving,
    Playing,
    Cooldown,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Maximum distance in centimeters that counts as "covered".
    pub trigger_cm: f64,
    pub poll_interval: Duration,
    /// Debounce window after a run before the next trigger can start.
    pub cooldown: Duration,
    pub photo_dir: PathBuf,
    pub photo_archive_dir: PathBuf,
    pub audio_dir: PathBuf,
    pub audio_archive_dir: PathBuf,
    pub current_photo: PathBuf,
    pub current_audio: PathBuf,
}

impl PipelineConfig {
    /// Defaults with all artifact paths placed under `dir`.
    pub fn rooted_at(dir: &Path) -> Self {
        Self {
            trigger_cm: 5.0,
            poll_interval: Duration::from_millis(200),
            cooldown: Duration::from_secs(3),
            photo_dir: dir.join("photos"),
            photo_archive_dir: dir.join("photos").join("archive"),
            audio_dir: dir.join("audio"),
            audio_archive_dir: dir.join("audio").join("archive"),
            current_photo: dir.join("photo.jpg"),
            current_audio: dir.join("audio.mp3"),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::rooted_at(Path::new("."))
    }
}

pub struct TriggerPipeline {
    hardware: Arc<dyn Hardware>,
    analyzer: Arc<dyn Analyzer>,
    synthesizer: Arc<dyn Synthesizer>,
    player: Arc<dyn Player>,
    mood: Arc<MoodState>,
    config: PipelineConfig,
    state: watch::Sender<PipelineState>,
}

impl TriggerPipeline {
    pub fn new(
        hardware: Arc<dyn Hardware>,
        analyzer: Arc<dyn Analyzer>,
        synthesizer: Arc<dyn Synthesizer>,
        player: Arc<dyn Player>,
        mood: Arc<MoodState>,
        config: PipelineConfig,
    ) -> Self {
        let (state, _) = watch::channel(PipelineState::Armed);
        Self {
            hardware,
            analyzer,
            synthesizer,
            player,
            mood,
            config,
            state,
        }
    }

    /// Subscribe to state transitions (status endpoint, tests).
    pub fn state(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    fn enter(&self, state: PipelineState) {
        self.state.send_replace(state);
    }

    /// Poll-and-run loop. While armed, each tick samples the sensor; a
    /// sample in `[0, trigger_cm)` starts a run. During a run and its
    /// cooldown no sampling happens, so at most one run is ever in flight.
    pub async fn run(&self) {
        let mut ticker = time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let distance = self.hardware.measure_distance().await;
            trace!(distance, "distance sample");
            if distance >= 0.0 && distance < self.config.trigger_cm {
                info!(distance, "sensor covered, starting run");
                self.enter(PipelineState::Detected);
                let report = self.trigger_run().await;
                info!(run = %report.id, mood = %report.mood, summary = %report.summary(), "run finished");
                ticker.reset();
            }
        }
    }

    /// Execute one full run, ending in the cooldown hold and re-arming.
    ///
    /// The mood is snapshotted exactly once, after capture; every
    /// mood-dependent stage of this run uses that value even if the mood
    /// changes mid-run.
    pub async fn trigger_run(&self) -> RunReport {
        let id = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let mut outcomes = Vec::with_capacity(6);

        // SIGNALING: the cue always runs to completion and the run proceeds
        // regardless of what the LED did.
        self.enter(PipelineState::Signaling);
        let started = Instant::now();
        self.hardware.warning_sequence().await;
        outcomes.push(StageOutcome {
            stage: Stage::Signal,
            status: StageStatus::Ok,
            elapsed: started.elapsed(),
        });

        // CAPTURING
        self.enter(PipelineState::Capturing);
        let started = Instant::now();
        let staged_photo = self.config.photo_dir.join(format!("photo_{id}.jpg"));
        let photo = match self.hardware.capture_still(&staged_photo).await {
            Ok(()) => Some(staged_photo),
            Err(e) => {
                warn!(%e, "capture failed, continuing without an image");
                None
            }
        };
        outcomes.push(StageOutcome {
            stage: Stage::Capture,
            status: if photo.is_some() {
                StageStatus::Ok
            } else {
                StageStatus::Failed
            },
            elapsed: started.elapsed(),
        });

        // One atomic snapshot for the entire run.
        let mood = self.mood.current().await;
        debug!(%mood, "mood snapshot for this run");

        // ANALYZING: any failure substitutes the fixed fallback reaction.
        self.enter(PipelineState::Analyzing);
        let started = Instant::now();
        let (reaction, analyze_status) = match &photo {
            Some(path) => match tokio::fs::read(path).await {
                Ok(image) => match self.analyzer.describe(&image, mood.prompt()).await {
                    Ok(text) => (text, StageStatus::Ok),
                    Err(e) => {
                        warn!(%e, "analysis failed, using fallback reaction");
                        (FALLBACK_REACTION.to_string(), StageStatus::Fallback)
                    }
                },
                Err(e) => {
                    warn!(%e, "captured image unreadable, using fallback reaction");
                    (FALLBACK_REACTION.to_string(), StageStatus::Fallback)
                }
            },
            None => (FALLBACK_REACTION.to_string(), StageStatus::Fallback),
        };
        outcomes.push(StageOutcome {
            stage: Stage::Analyze,
            status: analyze_status,
            elapsed: started.elapsed(),
        });

        // SYNTHESIZING: failure skips playback but the run continues.
        self.enter(PipelineState::Synthesizing);
        let started = Instant::now();
        let staged_audio = self.config.audio_dir.join(format!("audio_{id}.mp3"));
        let audio = match self
            .synthesizer
            .synthesize(&reaction, &mood.voice(), &staged_audio)
            .await
        {
            Ok(()) => Some(staged_audio),
            Err(e) => {
                warn!(%e, "synthesis failed, skipping playback");
                None
            }
        };
        outcomes.push(StageOutcome {
            stage: Stage::Synthesize,
            status: if audio.is_some() {
                StageStatus::Ok
            } else {
                StageStatus::Failed
            },
            elapsed: started.elapsed(),
        });

        // ARCHIVING: preserve the previous canonical artifacts, then promote
        // the staged ones into place — photo first, then audio.
        self.enter(PipelineState::Archiving);
        let started = Instant::now();
        let mut promoted = false;
        if let Some(staged) = &photo {
            self.promote(staged, &self.config.current_photo, &self.config.photo_archive_dir)
                .await;
            promoted = true;
        }
        if let Some(staged) = &audio {
            self.promote(staged, &self.config.current_audio, &self.config.audio_archive_dir)
                .await;
            promoted = true;
        }
        outcomes.push(StageOutcome {
            stage: Stage::Archive,
            status: if promoted {
                StageStatus::Ok
            } else {
                StageStatus::Skipped
            },
            elapsed: started.elapsed(),
        });

        // PLAYING: only when synthesis produced audio; failures are logged.
        self.enter(PipelineState::Playing);
        let started = Instant::now();
        let play_status = if audio.is_some() {
            match self.player.play(&self.config.current_audio).await {
                Ok(()) => StageStatus::Ok,
                Err(e) => {
                    warn!(%e, "playback failed");
                    StageStatus::Failed
                }
            }
        } else {
            StageStatus::Skipped
        };
        outcomes.push(StageOutcome {
            stage: Stage::Play,
            status: play_status,
            elapsed: started.elapsed(),
        });

        // COOLDOWN: hold the debounce window, then re-arm.
        self.enter(PipelineState::Cooldown);
        time::sleep(self.config.cooldown).await;
        self.enter(PipelineState::Armed);

        RunReport { id, mood, outcomes }
    }

    /// Archive the existing canonical artifact, then move the staged file
    /// into its place. Failures are logged and never abort the run.
    async fn promote(&self, staged: &Path, canonical: &Path, archive_dir: &Path) {
        archive::archive_file(canonical, archive_dir).await;
        if let Err(e) = tokio::fs::rename(staged, canonical).await {
            debug!(%e, "rename failed, copying instead");
            match tokio::fs::copy(staged, canonical).await {
                Ok(_) => {
                    let _ = tokio::fs::remove_file(staged).await;
                }
                Err(e) => {
                    warn!(%e, staged = %staged.display(), "failed to promote artifact");
                }
            }
        }
    }
}
