use super::{SoundId, SoundOutput};
use crate::error::SoundError;
use crate::meter::Emphasis;
use std::sync::{Arc, Mutex, PoisonError};

/// A call received by [`MockSoundOutput`]
#[derive(Debug, Clone, PartialEq)]
pub enum SoundCall {
    Initialize,
    Load(SoundId),
    Play {
        sound: SoundId,
        emphasis: Emphasis,
        volume: f32,
    },
    SetVolume(f32),
}

/// Records every call; optionally fails initialization or playback.
#[derive(Debug, Clone, Default)]
pub struct MockSoundOutput {
    calls: Arc<Mutex<Vec<SoundCall>>>,
    fail_initialize: bool,
    fail_play: bool,
}

impl MockSoundOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    pub fn failing_playback(mut self) -> Self {
        self.fail_play = true;
        self
    }

    /// Calls recorded so far, shared with every clone of this mock
    pub fn calls(&self) -> Vec<SoundCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn played(&self) -> Vec<(SoundId, Emphasis, f32)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SoundCall::Play {
                    sound,
                    emphasis,
                    volume,
                } => Some((sound, emphasis, volume)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: SoundCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl SoundOutput for MockSoundOutput {
    fn initialize(&mut self) -> Result<(), SoundError> {
        self.record(SoundCall::Initialize);
        if self.fail_initialize {
            return Err(SoundError::Unavailable("mock device missing".to_string()));
        }
        Ok(())
    }

    fn load_sound_set(&mut self, sound: SoundId) -> Result<(), SoundError> {
        self.record(SoundCall::Load(sound));
        Ok(())
    }

    fn play_beat(
        &mut self,
        sound: SoundId,
        emphasis: Emphasis,
        volume: f32,
    ) -> Result<(), SoundError> {
        self.record(SoundCall::Play {
            sound,
            emphasis,
            volume,
        });
        if self.fail_play {
            return Err(SoundError::Load(sound));
        }
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), SoundError> {
        self.record(SoundCall::SetVolume(volume));
        Ok(())
    }
}
