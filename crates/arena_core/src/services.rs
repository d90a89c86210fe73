//! Services the simulation calls out to.
//!
//! The presentation layer plugs in its own [`AudioSink`]; headless runs use
//! [`NullAudio`] or count cues with [`CueLog`].

use serde::{Deserialize, Serialize};

/// Sound effects the simulation asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SoundCue {
    /// A tank fired.
    Fire,
    /// A shell chipped brick.
    BrickHit,
    /// A shell bounced off steel.
    SteelHit,
    /// An enemy took a hit without dying.
    EnemyHit,
    /// A tank blew up.
    Explosion,
    /// The player lost a life.
    PlayerDeath,
    /// The base fell.
    BaseDestroyed,
    /// A power-up appeared.
    PowerUpAppear,
    /// A power-up was collected.
    PowerUpPickup,
    /// The UFO arrived.
    UfoAppear,
    /// The UFO went down.
    UfoDestroyed,
    /// The easter egg was collected.
    EasterEgg,
    /// The level was cleared.
    LevelComplete,
    /// The session ended.
    GameOver,
}

/// Receiver for sound cues.
pub trait AudioSink: Send {
    /// Play (or record) a cue.
    fn play(&mut self, cue: SoundCue);
}

/// Drops every cue.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play(&mut self, _cue: SoundCue) {}
}

/// Records cues in order.
#[derive(Debug, Clone, Default)]
pub struct CueLog {
    /// Cues received so far.
    pub cues: Vec<SoundCue>,
}

impl CueLog {
    /// How many times a cue was played.
    #[must_use]
    pub fn count(&self, cue: SoundCue) -> usize {
        self.cues.iter().filter(|c| **c == cue).count()
    }
}

impl AudioSink for CueLog {
    fn play(&mut self, cue: SoundCue) {
        self.cues.push(cue);
    }
}

/// A [`CueLog`] the caller can keep a handle to after handing it over.
pub type SharedCueLog = std::sync::Arc<std::sync::Mutex<CueLog>>;

impl AudioSink for SharedCueLog {
    fn play(&mut self, cue: SoundCue) {
        if let Ok(mut log) = self.lock() {
            log.play(cue);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_log_records_through_box() {
        let log = SharedCueLog::default();
        let mut sink: Box<dyn AudioSink> = Box::new(log.clone());
        sink.play(SoundCue::Fire);
        sink.play(SoundCue::Fire);
        sink.play(SoundCue::Explosion);
        let log = log.lock().unwrap();
        assert_eq!(log.count(SoundCue::Fire), 2);
        assert_eq!(log.count(SoundCue::Explosion), 1);
    }
}
