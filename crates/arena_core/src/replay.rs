//! Replay system for recording and playing back sessions.
//!
//! A session is fully determined by its seed, start level, tuning and the
//! player's input on every tick, so a replay stores exactly that plus
//! periodic state-hash checkpoints for desync detection.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{GameError, Result};
use crate::session::Session;
use crate::simulation::PlayerInput;
use crate::tuning::Tuning;

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Ticks between recorded state-hash checkpoints.
pub const CHECKPOINT_INTERVAL: u64 = 60;

/// A state hash recorded during play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Session tick the hash was taken after.
    pub tick: u64,
    /// [`Session::state_hash`] at that tick.
    pub hash: u64,
}

/// Complete replay data structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Root seed of the session.
    pub session_seed: u64,
    /// Level the session started on.
    pub start_level: u32,
    /// Tuning the session ran with.
    pub tuning: Tuning,
    /// Player input, one entry per tick.
    pub inputs: Vec<PlayerInput>,
    /// Periodic hashes in tick order.
    pub checkpoints: Vec<Checkpoint>,
    /// Final tick when recording stopped.
    pub final_tick: u64,
    /// Final state hash for verification.
    pub final_hash: u64,
}

impl Replay {
    /// An empty replay for a session about to start.
    #[must_use]
    pub fn new(session_seed: u64, start_level: u32, tuning: Tuning) -> Self {
        Self {
            version: REPLAY_VERSION,
            session_seed,
            start_level,
            tuning,
            inputs: Vec::new(),
            checkpoints: Vec::new(),
            final_tick: 0,
            final_hash: 0,
        }
    }

    /// Finalize the replay with end-of-recording state.
    pub fn finalize(&mut self, final_tick: u64, final_hash: u64) {
        self.final_tick = final_tick;
        self.final_hash = final_hash;
    }

    /// Duration in ticks.
    #[must_use]
    pub const fn duration(&self) -> u64 {
        self.final_tick
    }

    /// Encode to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::Replay(format!("Failed to serialize replay: {e}")))
    }

    /// Decode from bytes, rejecting other format versions.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let replay: Self = bincode::deserialize(bytes)
            .map_err(|e| GameError::Replay(format!("Failed to deserialize replay: {e}")))?;
        if replay.version != REPLAY_VERSION {
            return Err(GameError::Replay(format!(
                "Replay version mismatch: expected {REPLAY_VERSION}, got {}",
                replay.version
            )));
        }
        Ok(replay)
    }

    /// Save the replay to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_bytes()?).map_err(|source| GameError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load a replay from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| GameError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }
}

/// Drives a session while recording every input.
#[derive(Debug)]
pub struct ReplayRecorder {
    session: Session,
    replay: Replay,
}

impl ReplayRecorder {
    /// Start a session and a recording together.
    pub fn start(session_seed: u64, start_level: u32, tuning: Tuning) -> Result<Self> {
        let session = Session::new(session_seed, start_level, tuning.clone())?;
        Ok(Self {
            session,
            replay: Replay::new(session_seed, start_level, tuning),
        })
    }

    /// The session being recorded.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Run one tick and record its input.
    pub fn tick(&mut self, input: PlayerInput) -> Result<crate::events::TickReport> {
        let report = self.session.tick(input)?;
        self.replay.inputs.push(input);
        let tick = self.replay.inputs.len() as u64;
        if tick % CHECKPOINT_INTERVAL == 0 {
            self.replay.checkpoints.push(Checkpoint {
                tick,
                hash: self.session.state_hash(),
            });
        }
        Ok(report)
    }

    /// Stop recording and return the finished replay.
    #[must_use]
    pub fn finish(mut self) -> Replay {
        let final_tick = self.replay.inputs.len() as u64;
        self.replay.finalize(final_tick, self.session.state_hash());
        tracing::info!(
            final_tick,
            final_hash = self.replay.final_hash,
            "Replay recorded"
        );
        self.replay
    }
}

/// Replay playback controller.
#[derive(Debug)]
pub struct ReplayPlayer {
    replay: Replay,
    session: Session,
    current_tick: u64,
    /// Whether playback is paused.
    pub paused: bool,
}

impl ReplayPlayer {
    /// Rebuild the session a replay starts from.
    pub fn new(replay: Replay) -> Result<Self> {
        let session = Session::new(replay.session_seed, replay.start_level, replay.tuning.clone())?;
        Ok(Self {
            replay,
            session,
            current_tick: 0,
            paused: false,
        })
    }

    /// Advance the replay by one tick.
    ///
    /// Returns true if there are more ticks to play.
    pub fn advance(&mut self) -> Result<bool> {
        if self.paused || self.is_finished() {
            return Ok(!self.is_finished());
        }
        let input = self
            .replay
            .inputs
            .get(self.current_tick as usize)
            .copied()
            .unwrap_or_default();
        self.session.tick(input)?;
        self.current_tick += 1;
        Ok(!self.is_finished())
    }

    /// Seek to a specific tick by replaying from the start.
    pub fn seek(&mut self, target_tick: u64) -> Result<()> {
        self.session = Session::new(
            self.replay.session_seed,
            self.replay.start_level,
            self.replay.tuning.clone(),
        )?;
        self.current_tick = 0;
        let paused = std::mem::replace(&mut self.paused, false);
        while self.current_tick < target_tick && !self.is_finished() {
            self.advance()?;
        }
        self.paused = paused;
        Ok(())
    }

    /// Current playback tick.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// The session as of the current tick.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// The replay being played.
    #[must_use]
    pub const fn replay(&self) -> &Replay {
        &self.replay
    }

    /// Whether every recorded tick has been played.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.current_tick >= self.replay.final_tick
    }

    /// Replay from the start, comparing every checkpoint and the final hash.
    ///
    /// Fails with [`GameError::DesyncDetected`] at the first mismatch.
    pub fn verify(&mut self) -> Result<()> {
        self.seek(0)?;
        let checkpoints = self.replay.checkpoints.clone();
        for checkpoint in checkpoints {
            while self.current_tick < checkpoint.tick && !self.is_finished() {
                self.advance()?;
            }
            self.check(checkpoint.tick, checkpoint.hash)?;
        }
        while !self.is_finished() {
            self.advance()?;
        }
        self.check(self.replay.final_tick, self.replay.final_hash)
    }

    fn check(&self, tick: u64, expected: u64) -> Result<()> {
        let actual = self.session.state_hash();
        if actual != expected {
            tracing::warn!(tick, expected, actual, "Replay desync");
            return Err(GameError::DesyncDetected {
                tick,
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Progress as a percentage (0-100).
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        if self.replay.final_tick == 0 {
            100.0
        } else {
            (self.current_tick as f64 / self.replay.final_tick as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Direction;

    fn recorded(ticks: u32) -> Replay {
        let mut recorder = ReplayRecorder::start(77, 1, Tuning::default()).unwrap();
        for i in 0..ticks {
            let input = PlayerInput {
                movement: Some(Direction::ALL[(i / 25 % 4) as usize]),
                fire: i % 5 == 0,
            };
            recorder.tick(input).unwrap();
        }
        recorder.finish()
    }

    #[test]
    fn test_recorder_checkpoints() {
        let replay = recorded(250);
        assert_eq!(replay.duration(), 250);
        assert_eq!(replay.inputs.len(), 250);
        let ticks: Vec<u64> = replay.checkpoints.iter().map(|c| c.tick).collect();
        assert_eq!(ticks, vec![60, 120, 180, 240]);
    }

    #[test]
    fn test_replay_verifies() {
        let replay = recorded(300);
        let mut player = ReplayPlayer::new(replay).unwrap();
        assert!(player.verify().is_ok());
        assert!(player.is_finished());
    }

    #[test]
    fn test_tampered_input_desyncs() {
        let mut replay = recorded(300);
        for input in &mut replay.inputs[10..40] {
            input.movement = Some(Direction::Left);
            input.fire = true;
        }
        let mut player = ReplayPlayer::new(replay).unwrap();
        match player.verify() {
            Err(GameError::DesyncDetected { tick, .. }) => assert_eq!(tick, 60),
            other => panic!("expected desync, got {other:?}"),
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let replay = recorded(90);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.replay");
        replay.save(&path).unwrap();
        let loaded = Replay::load(&path).unwrap();
        assert_eq!(loaded, replay);
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut replay = recorded(10);
        replay.version = REPLAY_VERSION + 1;
        let bytes = replay.to_bytes().unwrap();
        assert!(matches!(Replay::from_bytes(&bytes), Err(GameError::Replay(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Replay::load(dir.path().join("absent.replay"));
        assert!(matches!(result, Err(GameError::Io { .. })));
    }

    #[test]
    fn test_seek_and_pause() {
        let replay = recorded(120);
        let mut player = ReplayPlayer::new(replay).unwrap();
        player.seek(50).unwrap();
        assert_eq!(player.current_tick(), 50);
        assert!((player.progress_percent() - 41.666).abs() < 0.01);

        player.paused = true;
        player.advance().unwrap();
        assert_eq!(player.current_tick(), 50);
        player.paused = false;
        player.advance().unwrap();
        assert_eq!(player.current_tick(), 51);
    }
}
