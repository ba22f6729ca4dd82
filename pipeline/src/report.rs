use mood::Mood;
use std::fmt;
use tokio::time::Duration;

/// The six side-effecting stages of a run, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Signal,
    Capture,
    Analyze,
    Synthesize,
    Archive,
    Play,
}

impl Stage {
    fn as_str(&self) -> &'static str {
        match self {
            Stage::Signal => "signal",
            Stage::Capture => "capture",
            Stage::Analyze => "analyze",
            Stage::Synthesize => "synthesize",
            Stage::Archive => "archive",
            Stage::Play => "play",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageStatus {
    Ok,
    /// The stage failed but a substitute result kept the run going.
    Fallback,
    Failed,
    /// The stage was not attempted because an earlier one failed.
    Skipped,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StageStatus::Ok => "ok",
            StageStatus::Fallback => "fallback",
            StageStatus::Failed => "failed",
            StageStatus::Skipped => "skipped",
        })
    }
}

#[derive(Clone, Debug)]
pub struct StageOutcome {
    pub stage: Stage,
    pub status: StageStatus,
    pub elapsed: Duration,
}

/// Record of one full capture-to-playback cycle.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// Timestamp identifier, also used to name the staged artifacts.
    pub id: String,
    /// The mood snapshot every mood-dependent stage of this run used.
    pub mood: Mood,
    pub outcomes: Vec<StageOutcome>,
}

impl RunReport {
    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.outcomes.iter().find(|o| o.stage == stage)
    }

    /// One-line digest for the run log.
    pub fn summary(&self) -> String {
        self.outcomes
            .iter()
            .map(|o| format!("{}={}", o.stage, o.status))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
