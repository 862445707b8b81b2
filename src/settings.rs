//! User-facing metronome settings and their persistence.

use crate::error::SettingsError;
use crate::meter::MeterSpec;
use crate::sound::SoundId;
use crate::tempo::TempoSpec;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const DEFAULT_VOLUME: f32 = 0.7;
pub const MIN_COUNT_IN_BARS: u32 = 1;
pub const MAX_COUNT_IN_BARS: u32 = 4;
/// Latency compensation bounds in milliseconds, well under one beat at the
/// fastest tempo.
pub const MIN_LATENCY_MS: f64 = -100.0;
pub const MAX_LATENCY_MS: f64 = 100.0;

/// Settings the scheduler reads at every decision point.
///
/// Every setter clamps, so a value that made it in here is in range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    bpm: TempoSpec,
    meter: MeterSpec,
    sound: SoundId,
    volume: f32,
    count_in: bool,
    count_in_bars: u32,
    accent_beats: Vec<u32>,
    latency_compensation_ms: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            bpm: TempoSpec::default(),
            meter: MeterSpec::default(),
            sound: SoundId::default(),
            volume: DEFAULT_VOLUME,
            count_in: false,
            count_in_bars: MIN_COUNT_IN_BARS,
            accent_beats: Vec::new(),
            latency_compensation_ms: 0.0,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-applies every bound; used on values that bypassed the setters.
    pub fn normalized(mut self) -> Self {
        let accents = std::mem::take(&mut self.accent_beats);
        self.set_volume(self.volume);
        self.set_count_in_bars(self.count_in_bars);
        self.set_latency_compensation_ms(self.latency_compensation_ms);
        self.set_accent_beats(accents);
        self
    }

    pub fn bpm(&self) -> f64 {
        self.bpm.bpm()
    }

    pub fn tempo(&self) -> TempoSpec {
        self.bpm
    }

    /// Returns the clamped value that was stored.
    pub fn set_bpm(&mut self, bpm: f64) -> f64 {
        self.bpm = TempoSpec::new(bpm);
        self.bpm.bpm()
    }

    pub fn meter(&self) -> MeterSpec {
        self.meter
    }

    /// Changing the meter drops the accent override, which was relative to
    /// the old bar length.
    pub fn set_meter(&mut self, meter: MeterSpec) {
        if meter != self.meter {
            self.accent_beats.clear();
        }
        self.meter = meter;
    }

    pub fn sound(&self) -> SoundId {
        self.sound
    }

    pub fn set_sound(&mut self, sound: SoundId) {
        self.sound = sound;
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) -> f32 {
        self.volume = if volume.is_nan() {
            DEFAULT_VOLUME
        } else {
            volume.clamp(0.0, 1.0)
        };
        self.volume
    }

    pub fn count_in(&self) -> bool {
        self.count_in
    }

    pub fn set_count_in(&mut self, enabled: bool) {
        self.count_in = enabled;
    }

    pub fn count_in_bars(&self) -> u32 {
        self.count_in_bars
    }

    pub fn set_count_in_bars(&mut self, bars: u32) {
        self.count_in_bars = bars.clamp(MIN_COUNT_IN_BARS, MAX_COUNT_IN_BARS);
    }

    /// Beats the count-in lasts, zero when disabled.
    pub fn count_in_beats(&self) -> u32 {
        if self.count_in {
            self.count_in_bars * self.meter.numerator()
        } else {
            0
        }
    }

    pub fn accent_beats(&self) -> &[u32] {
        &self.accent_beats
    }

    /// Positions outside the current bar are dropped; the list is kept
    /// sorted and free of duplicates.
    pub fn set_accent_beats(&mut self, beats: Vec<u32>) {
        let numerator = self.meter.numerator();
        let mut beats: Vec<u32> = beats
            .into_iter()
            .filter(|b| (1..=numerator).contains(b))
            .collect();
        beats.sort_unstable();
        beats.dedup();
        self.accent_beats = beats;
    }

    pub fn latency_compensation_ms(&self) -> f64 {
        self.latency_compensation_ms
    }

    pub fn set_latency_compensation_ms(&mut self, ms: f64) {
        self.latency_compensation_ms = if ms.is_finite() {
            ms.clamp(MIN_LATENCY_MS, MAX_LATENCY_MS)
        } else {
            0.0
        };
    }
}

pub type SharedSettings = Arc<Mutex<Settings>>;

pub fn create_shared_settings(settings: Settings) -> SharedSettings {
    Arc::new(Mutex::new(settings))
}

/// Reads and writes settings as a JSON file
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SettingsStore { path: path.into() }
    }

    /// `$HOME/.local/share/clicktrackrs/settings.json`
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        let home = std::env::var("HOME").map_err(|_| SettingsError::NoHome)?;
        Ok(PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("clicktrackrs")
            .join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when nothing has been saved yet.
    pub fn load(&self) -> Result<Option<Settings>, SettingsError> {
        if !self.path.exists() {
            debug!("No saved settings at {}", self.path.display());
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        info!("Loaded settings from {}", self.path.display());
        Ok(Some(settings.normalized()))
    }

    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(settings)?)?;
        info!("Saved settings to {}", self.path.display());
        Ok(())
    }
}
