use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use hardware::{Capability, Hardware, HardwareError, SignalColor};
use mood::{Mood, MoodSource, MoodState, VoiceProfile};
use pipeline::{PipelineConfig, PipelineState, Stage, StageStatus, TriggerPipeline};
use speech::{Player, SpeechError, Synthesizer};
use vision::{Analyzer, VisionError, FALLBACK_REACTION};

/// Replays a distance timeline: the sample returned depends on how much
/// (virtual) time has passed, not on how often the sensor is polled, so
/// readings that fall inside a run's cooldown are never observed — exactly
/// like a real object in front of a real sensor.
struct TimelineHardware {
    samples: Vec<f64>,
    step: Duration,
    epoch: Instant,
    captures: AtomicUsize,
    capture_body: &'static [u8],
    fail_capture: bool,
}

impl TimelineHardware {
    fn new(samples: Vec<f64>, step: Duration) -> Self {
        Self {
            samples,
            step,
            epoch: Instant::now(),
            captures: AtomicUsize::new(0),
            capture_body: b"new frame",
            fail_capture: false,
        }
    }

    fn steady(distance: f64) -> Self {
        Self::new(vec![distance], Duration::from_secs(1))
    }

    fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Hardware for TimelineHardware {
    async fn measure_distance(&self) -> f64 {
        let idx = (self.epoch.elapsed().as_millis() / self.step.as_millis()) as usize;
        let idx = idx.min(self.samples.len() - 1);
        self.samples[idx]
    }

    async fn set_signal(&self, _color: SignalColor) {}

    // instant cue so tests only measure the pipeline's own timing
    async fn warning_sequence(&self) {}

    async fn capture_still(&self, path: &Path) -> Result<(), HardwareError> {
        if self.fail_capture {
            return Err(HardwareError::Capture("forced".into()));
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| HardwareError::Capture(e.to_string()))?;
        }
        tokio::fs::write(path, self.capture_body)
            .await
            .map_err(|e| HardwareError::Capture(e.to_string()))?;
        self.captures.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn release(&self) {}

    fn capability(&self) -> Capability {
        Capability::simulated()
    }
}

struct OkAnalyzer;

#[async_trait]
impl Analyzer for OkAnalyzer {
    async fn describe(&self, _image: &[u8], _prompt: &str) -> Result<String, VisionError> {
        Ok("Sehr stilvoll.".to_string())
    }
}

struct FailingAnalyzer;

#[async_trait]
impl Analyzer for FailingAnalyzer {
    async fn describe(&self, _image: &[u8], _prompt: &str) -> Result<String, VisionError> {
        Err(VisionError::Api("forced".into()))
    }
}

/// Commits a new mood while the run is mid-flight, to prove the run sticks
/// to its snapshot.
struct MoodFlippingAnalyzer {
    state: Arc<MoodState>,
    flip_to: Mood,
}

#[async_trait]
impl Analyzer for MoodFlippingAnalyzer {
    async fn describe(&self, _image: &[u8], _prompt: &str) -> Result<String, VisionError> {
        self.state.set(self.flip_to, MoodSource::Command).await;
        Ok("Kommentar.".to_string())
    }
}

#[derive(Default)]
struct RecordingSynthesizer {
    requests: Mutex<Vec<(String, &'static str)>>,
    fail: bool,
}

impl RecordingSynthesizer {
    fn failing() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    async fn requests(&self) -> Vec<(String, &'static str)> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl Synthesizer for RecordingSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceProfile,
        out: &Path,
    ) -> Result<(), SpeechError> {
        self.requests
            .lock()
            .await
            .push((text.to_string(), voice.voice_id));
        if self.fail {
            return Err(SpeechError::Api("forced".into()));
        }
        if let Some(parent) = out.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(out, b"synthesized voice").await?;
        Ok(())
    }
}

#[derive(Default)]
struct CountingPlayer {
    plays: AtomicUsize,
}

#[async_trait]
impl Player for CountingPlayer {
    async fn play(&self, _path: &Path) -> Result<(), SpeechError> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Rig {
    hardware: Arc<TimelineHardware>,
    synthesizer: Arc<RecordingSynthesizer>,
    player: Arc<CountingPlayer>,
    _mood: Arc<MoodState>,
    pipeline: Arc<TriggerPipeline>,
    _dir: tempfile::TempDir,
}

fn rig_with(
    hardware: TimelineHardware,
    analyzer: Arc<dyn Analyzer>,
    synthesizer: RecordingSynthesizer,
) -> Rig {
    let dir = tempfile::tempdir().unwrap();
    let mut config = PipelineConfig::rooted_at(dir.path());
    config.poll_interval = Duration::from_millis(100);
    config.cooldown = Duration::from_millis(300);
    let hardware = Arc::new(hardware);
    let synthesizer = Arc::new(synthesizer);
    let player = Arc::new(CountingPlayer::default());
    let (mood, _push) = MoodState::new(Mood::Happy);
    let pipeline = Arc::new(TriggerPipeline::new(
        hardware.clone(),
        analyzer,
        synthesizer.clone(),
        player.clone(),
        mood.clone(),
        config,
    ));
    Rig {
        hardware,
        synthesizer,
        player,
        _mood: mood,
        pipeline,
        _dir: dir,
    }
}

fn rig(hardware: TimelineHardware) -> Rig {
    rig_with(hardware, Arc::new(OkAnalyzer), RecordingSynthesizer::default())
}

#[tokio::test(start_paused = true)]
async fn one_run_per_contiguous_proximity_interval() {
    // 50, 50, 3, 3, 3, 60 at one sample per poll tick: the run plus its
    // cooldown outlasts the proximity, so exactly one run starts.
    let samples = vec![50.0, 50.0, 3.0, 3.0, 3.0, 60.0];
    let rig = rig(TimelineHardware::new(samples, Duration::from_millis(100)));
    let handle = {
        let pipeline = rig.pipeline.clone();
        tokio::spawn(async move { pipeline.run().await })
    };

    tokio::time::sleep(Duration::from_secs(3)).await;
    handle.abort();

    assert_eq!(rig.hardware.captures(), 1);
    assert_eq!(rig.player.plays.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn negative_sentinel_never_triggers() {
    let rig = rig(TimelineHardware::steady(-1.0));
    let handle = {
        let pipeline = rig.pipeline.clone();
        tokio::spawn(async move { pipeline.run().await })
    };

    tokio::time::sleep(Duration::from_secs(3)).await;
    handle.abort();

    assert_eq!(rig.hardware.captures(), 0);
}

#[tokio::test(start_paused = true)]
async fn analysis_failure_falls_back_and_completes() {
    let rig = rig_with(
        TimelineHardware::steady(100.0),
        Arc::new(FailingAnalyzer),
        RecordingSynthesizer::default(),
    );

    let report = rig.pipeline.trigger_run().await;

    assert_eq!(
        report.outcome(Stage::Analyze).unwrap().status,
        StageStatus::Fallback
    );
    // the fallback text went all the way into synthesis and playback
    assert_eq!(
        rig.synthesizer.requests().await,
        vec![(FALLBACK_REACTION.to_string(), "Bright_Male")]
    );
    assert_eq!(report.outcome(Stage::Play).unwrap().status, StageStatus::Ok);
    assert_eq!(*rig.pipeline.state().borrow(), PipelineState::Armed);
}

#[tokio::test(start_paused = true)]
async fn synthesis_failure_skips_playback_but_reaches_cooldown() {
    let rig = rig_with(
        TimelineHardware::steady(100.0),
        Arc::new(OkAnalyzer),
        RecordingSynthesizer::failing(),
    );

    let report = rig.pipeline.trigger_run().await;

    assert_eq!(
        report.outcome(Stage::Synthesize).unwrap().status,
        StageStatus::Failed
    );
    assert_eq!(
        report.outcome(Stage::Play).unwrap().status,
        StageStatus::Skipped
    );
    assert_eq!(rig.player.plays.load(Ordering::SeqCst), 0);
    assert_eq!(*rig.pipeline.state().borrow(), PipelineState::Armed);
}

#[tokio::test(start_paused = true)]
async fn capture_failure_still_uses_fallback_reaction() {
    let mut hardware = TimelineHardware::steady(100.0);
    hardware.fail_capture = true;
    let rig = rig_with(
        hardware,
        // the analyzer must not be consulted without an image
        Arc::new(FailingAnalyzer),
        RecordingSynthesizer::default(),
    );

    let report = rig.pipeline.trigger_run().await;

    assert_eq!(
        report.outcome(Stage::Capture).unwrap().status,
        StageStatus::Failed
    );
    assert_eq!(
        report.outcome(Stage::Analyze).unwrap().status,
        StageStatus::Fallback
    );
    assert_eq!(
        rig.synthesizer.requests().await,
        vec![(FALLBACK_REACTION.to_string(), "Bright_Male")]
    );
    assert_eq!(*rig.pipeline.state().borrow(), PipelineState::Armed);
}

#[tokio::test(start_paused = true)]
async fn run_uses_a_single_mood_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = PipelineConfig::rooted_at(dir.path());
    config.cooldown = Duration::from_millis(300);
    let hardware = Arc::new(TimelineHardware::steady(100.0));
    let synthesizer = Arc::new(RecordingSynthesizer::default());
    let player = Arc::new(CountingPlayer::default());
    let (mood, _push) = MoodState::new(Mood::Happy);
    let analyzer = Arc::new(MoodFlippingAnalyzer {
        state: mood.clone(),
        flip_to: Mood::Angry,
    });
    let pipeline = TriggerPipeline::new(
        hardware,
        analyzer,
        synthesizer.clone(),
        player,
        mood.clone(),
        config,
    );

    let report = pipeline.trigger_run().await;

    // the run stuck to the snapshot taken before analysis...
    assert_eq!(report.mood, Mood::Happy);
    assert_eq!(
        synthesizer.requests().await,
        vec![("Kommentar.".to_string(), "Bright_Male")]
    );
    // ...while the next run will observe the newer mood
    assert_eq!(mood.current().await, Mood::Angry);
}

#[tokio::test(start_paused = true)]
async fn rearms_within_the_cooldown_window() {
    let rig = rig(TimelineHardware::steady(100.0));
    let mut state = rig.pipeline.state();

    let started = Instant::now();
    rig.pipeline.trigger_run().await;
    let elapsed = started.elapsed();

    assert_eq!(*state.borrow_and_update(), PipelineState::Armed);
    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed <= Duration::from_millis(400));
}

#[tokio::test(start_paused = true)]
async fn archives_previous_canonical_artifacts() {
    let rig = rig(TimelineHardware::steady(100.0));
    let config = PipelineConfig::rooted_at(rig._dir.path());
    tokio::fs::write(&config.current_photo, b"old frame")
        .await
        .unwrap();

    let report = rig.pipeline.trigger_run().await;
    assert_eq!(
        report.outcome(Stage::Archive).unwrap().status,
        StageStatus::Ok
    );

    // exactly one archived copy, byte-identical to the pre-run photo
    let mut entries = tokio::fs::read_dir(&config.photo_archive_dir).await.unwrap();
    let mut archived = Vec::new();
    while let Some(entry) = entries.next_entry().await.unwrap() {
        archived.push(entry.path());
    }
    assert_eq!(archived.len(), 1);
    assert_eq!(tokio::fs::read(&archived[0]).await.unwrap(), b"old frame");

    // the canonical paths now hold this run's artifacts
    assert_eq!(
        tokio::fs::read(&config.current_photo).await.unwrap(),
        b"new frame"
    );
    assert_eq!(
        tokio::fs::read(&config.current_audio).await.unwrap(),
        b"synthesized voice"
    );

    // staged files were promoted, not left behind
    let mut staged = tokio::fs::read_dir(&config.photo_dir).await.unwrap();
    while let Some(entry) = staged.next_entry().await.unwrap() {
        assert!(entry.path().is_dir(), "staged photo left behind");
    }
}

#[tokio::test(start_paused = true)]
async fn first_run_archives_nothing() {
    let rig = rig(TimelineHardware::steady(100.0));
    let config = PipelineConfig::rooted_at(rig._dir.path());

    rig.pipeline.trigger_run().await;

    assert!(!config.photo_archive_dir.exists());
    assert!(tokio::fs::try_exists(&config.current_photo).await.unwrap());
}
