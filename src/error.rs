use crate::sound::SoundId;
use std::io;
use thiserror::Error;

/// Message shown to users when playback cannot be started.
pub const PLAYBACK_FAILED: &str = "playback failed, please check audio settings";

/// Failures of the sound output capability
#[derive(Debug, Error)]
pub enum SoundError {
    /// No output device could be opened
    #[error("sound output unavailable: {0}")]
    Unavailable(String),
    /// The output was used before it was connected
    #[error("sound output not connected")]
    NotConnected,
    /// Error when sending a MIDI message
    #[error("MIDI send error: {0}")]
    Send(String),
    /// Error when loading a sound set
    #[error("could not load sound set {0}")]
    Load(SoundId),
}

/// Failures that keep the scheduler from leaving the idle state
#[derive(Debug, Error)]
pub enum StartError {
    #[error("audio output could not be initialized: {0}")]
    AudioSession(#[source] SoundError),
    #[error("sound set {sound} could not be loaded: {source}")]
    SoundSet {
        sound: SoundId,
        #[source]
        source: SoundError,
    },
}

impl StartError {
    pub fn user_message(&self) -> &'static str {
        PLAYBACK_FAILED
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeterError {
    #[error("numerator must be between {min} and {max}, got {value}")]
    Numerator { value: u32, min: u32, max: u32 },
    #[error("denominator must be one of 2, 4, 8, 16, got {0}")]
    Denominator(u32),
    #[error("invalid time signature '{0}', expected <numerator>/<denominator>")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file error: {0}")]
    Io(#[from] io::Error),
    #[error("settings are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("HOME environment variable not set")]
    NoHome,
}

/// Errors reported by the engine handle
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Start(#[from] StartError),
    #[error("metronome engine is no longer running")]
    Disconnected,
}
