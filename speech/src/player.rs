use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;
use tracing::info;

use crate::{Player, SpeechError};

/// Plays audio through the first available command-line player.
pub struct CommandPlayer {
    players: Vec<String>,
}

impl CommandPlayer {
    pub fn new() -> Self {
        Self::with_players(
            ["mpg123", "aplay", "afplay"]
                .into_iter()
                .map(String::from)
                .collect(),
        )
    }

    pub fn with_players(players: Vec<String>) -> Self {
        Self { players }
    }
}

impl Default for CommandPlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Player for CommandPlayer {
    async fn play(&self, path: &Path) -> Result<(), SpeechError> {
        for player in &self.players {
            match tokio::process::Command::new(player)
                .arg(path)
                .status()
                .await
            {
                Ok(status) if status.success() => {
                    info!(%player, path = %path.display(), "audio played");
                    return Ok(());
                }
                Ok(status) => {
                    return Err(SpeechError::Player(
                        player.clone(),
                        format!("exited with {status}"),
                    ))
                }
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(SpeechError::Io(e)),
            }
        }
        Err(SpeechError::NoPlayer)
    }
}
