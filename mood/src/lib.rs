//! The shared "mood" that colors everything ANDI says.
//!
//! A [`Mood`] is one of a fixed closed set; each value carries the prompt
//! template handed to the image analyzer and the voice profile handed to the
//! speech synthesizer. The *current* mood lives in a [`MoodState`] that is
//! written concurrently by the file watcher and the command front-end and read
//! once per pipeline run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

mod state;
mod watcher;

pub use state::{MoodSource, MoodState};
pub use watcher::{ensure_mood_file, read_mood_file, MoodWatcher};

/// Default mood used when no persisted record exists.
pub const DEFAULT_MOOD: Mood = Mood::Happy;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Flirty,
    Angry,
    Bored,
}

/// Error returned when parsing a string that is not one of the four moods.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown mood: {0}")]
pub struct UnknownMood(pub String);

/// Voice parameters passed to the speech synthesizer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoiceProfile {
    pub voice_id: &'static str,
    pub emotion: &'static str,
    pub pitch: i32,
    pub speed: f32,
}

impl Mood {
    /// All moods, in keyboard order.
    pub const ALL: [Mood; 4] = [Mood::Happy, Mood::Flirty, Mood::Angry, Mood::Bored];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Flirty => "flirty",
            Mood::Angry => "angry",
            Mood::Bored => "bored",
        }
    }

    /// Prompt template for the image analyzer. The installation speaks German.
    pub fn prompt(&self) -> &'static str {
        match self {
            Mood::Happy => {
                "Gib mir ein kurzes, freundliches und kreatives Mode-Kompliment zu dem Outfit \
                 auf dem Bild. Ein einziger, charmanter Satz genügt. Sei dabei so freundlich \
                 und entzückend wie möglich gegenüber dem Kleidungsstil, nach dem Motto: 'Das \
                 ist das stilvollste, was ich je gesehen habe'."
            }
            Mood::Flirty => {
                "Gib mir einen kurzen, charmant-flirtenden Kommentar zu dem Outfit auf dem \
                 Bild. Ein einziger, verspielter Satz genügt. Sei dabei so flirtend und \
                 verführerisch wie möglich, nach dem Motto: 'Wow, in diesem Outfit siehst du \
                 einfach umwerfend aus'."
            }
            Mood::Angry => {
                "Gib mir einen kurzen, vernichtenden Mode-Roast zu dem Outfit auf dem Bild. \
                 Ein einziger, bissiger Satz genügt. Sei dabei so arrogant und herablassend \
                 wie möglich gegenüber dem Kleidungsstil, nach dem Motto: 'Das ist das \
                 Hässlichste, was ich je gesehen habe'."
            }
            Mood::Bored => {
                "Gib mir einen kurzen, gelangweilt-gleichgültigen Kommentar zu dem Outfit auf \
                 dem Bild. Ein einziger, langweiliger Satz genügt. Sei dabei so \
                 desinteressiert und abweisend wie möglich, nach dem Motto: 'Meh, nichts \
                 Besonderes'."
            }
        }
    }

    /// Voice profile for the speech synthesizer.
    pub fn voice(&self) -> VoiceProfile {
        match self {
            Mood::Happy => VoiceProfile {
                voice_id: "Bright_Male",
                emotion: "happy",
                pitch: 0,
                speed: 1.0,
            },
            Mood::Flirty => VoiceProfile {
                voice_id: "Deep_Voice_Woman",
                emotion: "excited",
                pitch: 2,
                speed: 0.9,
            },
            Mood::Angry => VoiceProfile {
                voice_id: "Deep_Voice_Man",
                emotion: "angry",
                pitch: -2,
                speed: 1.2,
            },
            Mood::Bored => VoiceProfile {
                voice_id: "Calm_Male",
                emotion: "sad",
                pitch: 0,
                speed: 0.8,
            },
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = UnknownMood;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "happy" => Ok(Mood::Happy),
            "flirty" => Ok(Mood::Flirty),
            "angry" => Ok(Mood::Angry),
            "bored" => Ok(Mood::Bored),
            other => Err(UnknownMood(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_closed_set() {
        for mood in Mood::ALL {
            assert_eq!(mood.as_str().parse::<Mood>(), Ok(mood));
        }
        assert_eq!(
            "ecstatic".parse::<Mood>(),
            Err(UnknownMood("ecstatic".into()))
        );
    }

    #[test]
    fn each_mood_has_its_own_voice() {
        let mut ids: Vec<_> = Mood::ALL.iter().map(|m| m.voice().voice_id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&Mood::Flirty).unwrap(), "\"flirty\"");
        let parsed: Mood = serde_json::from_str("\"bored\"").unwrap();
        assert_eq!(parsed, Mood::Bored);
    }
}
