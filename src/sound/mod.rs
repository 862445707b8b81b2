//! Sound output for beats
//!
//! The scheduler only knows the [`SoundOutput`] trait; what a beat sounds
//! like is up to the implementation:
//! - [`SilentOutput`] for a visual-only pulse
//! - [`MidiClickOutput`] for General MIDI percussion clicks via midir
//! - [`MockSoundOutput`] for tests
//!
mod midi;
mod mock;

pub use midi::{list_output_ports, MidiClickOutput};
pub use mock::{MockSoundOutput, SoundCall};

use crate::error::SoundError;
use crate::meter::Emphasis;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which click sound the metronome plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundId {
    #[default]
    Wood,
    Digital,
    Bell,
    Tick,
}

impl SoundId {
    pub const ALL: [SoundId; 4] = [SoundId::Wood, SoundId::Digital, SoundId::Bell, SoundId::Tick];

    pub fn name(self) -> &'static str {
        match self {
            SoundId::Wood => "wood",
            SoundId::Digital => "digital",
            SoundId::Bell => "bell",
            SoundId::Tick => "tick",
        }
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SoundId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SoundId::ALL
            .into_iter()
            .find(|id| id.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown sound '{}', expected wood, digital, bell or tick", s))
    }
}

/// High or low sample of a sound set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundVariant {
    High,
    Low,
}

impl From<Emphasis> for SoundVariant {
    fn from(emphasis: Emphasis) -> Self {
        match emphasis {
            Emphasis::Strong => SoundVariant::High,
            Emphasis::Medium | Emphasis::Weak => SoundVariant::Low,
        }
    }
}

/// Capability the scheduler calls into for every beat.
///
/// Calls happen on the scheduler's thread and must return quickly: well under
/// one beat period at the maximum tempo.
pub trait SoundOutput: Send {
    /// Prepares the output device. Called on every start and may be a no-op
    /// once the device is ready.
    fn initialize(&mut self) -> Result<(), SoundError> {
        Ok(())
    }

    fn load_sound_set(&mut self, sound: SoundId) -> Result<(), SoundError>;

    /// Plays one beat. With no sound set loaded this is a silent no-op.
    fn play_beat(
        &mut self,
        sound: SoundId,
        emphasis: Emphasis,
        volume: f32,
    ) -> Result<(), SoundError>;

    fn set_volume(&mut self, volume: f32) -> Result<(), SoundError>;
}

/// Lets an output picked at runtime be handed to the scheduler.
impl<T: SoundOutput + ?Sized> SoundOutput for Box<T> {
    fn initialize(&mut self) -> Result<(), SoundError> {
        (**self).initialize()
    }

    fn load_sound_set(&mut self, sound: SoundId) -> Result<(), SoundError> {
        (**self).load_sound_set(sound)
    }

    fn play_beat(
        &mut self,
        sound: SoundId,
        emphasis: Emphasis,
        volume: f32,
    ) -> Result<(), SoundError> {
        (**self).play_beat(sound, emphasis, volume)
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), SoundError> {
        (**self).set_volume(volume)
    }
}

/// Produces no sound at all
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentOutput;

impl SoundOutput for SilentOutput {
    fn load_sound_set(&mut self, _sound: SoundId) -> Result<(), SoundError> {
        Ok(())
    }

    fn play_beat(
        &mut self,
        _sound: SoundId,
        _emphasis: Emphasis,
        _volume: f32,
    ) -> Result<(), SoundError> {
        Ok(())
    }

    fn set_volume(&mut self, _volume: f32) -> Result<(), SoundError> {
        Ok(())
    }
}
