//! Tempo bounds, presets and tap tempo.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const MIN_BPM: f64 = 40.0;
pub const MAX_BPM: f64 = 300.0;
pub const DEFAULT_BPM: f64 = 120.0;

/// Clamps into `[MIN_BPM, MAX_BPM]`. Non-finite input yields `DEFAULT_BPM`.
pub fn clamp_bpm(bpm: f64) -> f64 {
    if bpm.is_finite() {
        bpm.clamp(MIN_BPM, MAX_BPM)
    } else {
        DEFAULT_BPM
    }
}

/// Seconds per beat.
pub fn beat_period(bpm: f64) -> f64 {
    60.0 / bpm
}

/// Seconds per bar of `beats_per_bar` beats.
pub fn bar_duration(bpm: f64, beats_per_bar: u32) -> f64 {
    beat_period(bpm) * f64::from(beats_per_bar)
}

/// A tempo that is always inside the supported range.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct TempoSpec {
    bpm: f64,
}

impl TempoSpec {
    pub fn new(bpm: f64) -> Self {
        TempoSpec {
            bpm: clamp_bpm(bpm),
        }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn period(&self) -> f64 {
        beat_period(self.bpm)
    }
}

impl Default for TempoSpec {
    fn default() -> Self {
        TempoSpec { bpm: DEFAULT_BPM }
    }
}

impl From<f64> for TempoSpec {
    fn from(bpm: f64) -> Self {
        TempoSpec::new(bpm)
    }
}

impl From<TempoSpec> for f64 {
    fn from(tempo: TempoSpec) -> Self {
        tempo.bpm
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoPreset {
    pub name: &'static str,
    pub bpm: f64,
    pub min: f64,
    pub max: f64,
    pub description: &'static str,
}

pub const PRESETS: [TempoPreset; 6] = [
    TempoPreset {
        name: "Largo",
        bpm: 50.0,
        min: 40.0,
        max: 60.0,
        description: "Very slow, broad",
    },
    TempoPreset {
        name: "Adagio",
        bpm: 70.0,
        min: 66.0,
        max: 76.0,
        description: "Slow and stately",
    },
    TempoPreset {
        name: "Andante",
        bpm: 90.0,
        min: 76.0,
        max: 108.0,
        description: "Walking pace",
    },
    TempoPreset {
        name: "Moderato",
        bpm: 114.0,
        min: 108.0,
        max: 120.0,
        description: "Moderate speed",
    },
    TempoPreset {
        name: "Allegro",
        bpm: 144.0,
        min: 120.0,
        max: 168.0,
        description: "Fast, lively",
    },
    TempoPreset {
        name: "Presto",
        bpm: 184.0,
        min: 168.0,
        max: 200.0,
        description: "Very fast",
    },
];

/// First preset whose range contains `bpm`.
pub fn preset_for_bpm(bpm: f64) -> Option<&'static TempoPreset> {
    PRESETS.iter().find(|p| bpm >= p.min && bpm <= p.max)
}

pub fn preset_by_name(name: &str) -> Option<&'static TempoPreset> {
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Derives a tempo from a series of taps.
///
/// Later intervals weigh more than earlier ones, so the estimate follows a
/// performer who is settling into a tempo. Taps further apart than the
/// timeout start a new series.
#[derive(Debug, Clone)]
pub struct TapTempo {
    min_taps: usize,
    max_taps: usize,
    timeout: f64,
    taps: VecDeque<f64>,
}

impl Default for TapTempo {
    fn default() -> Self {
        Self::new(2, 8, 3.0)
    }
}

impl TapTempo {
    pub fn new(min_taps: usize, max_taps: usize, timeout_secs: f64) -> Self {
        let min_taps = min_taps.max(2);
        TapTempo {
            min_taps,
            max_taps: max_taps.max(min_taps),
            timeout: timeout_secs,
            taps: VecDeque::with_capacity(max_taps),
        }
    }

    /// Registers a tap at `now` seconds and returns the estimate, if any.
    pub fn tap(&mut self, now: f64) -> Option<f64> {
        if let Some(&last) = self.taps.back() {
            if now - last > self.timeout || now < last {
                self.reset();
            }
        }

        self.taps.push_back(now);
        while self.taps.len() > self.max_taps {
            self.taps.pop_front();
        }

        self.bpm()
    }

    pub fn bpm(&self) -> Option<f64> {
        if self.taps.len() < self.min_taps {
            return None;
        }

        let (weighted_sum, total_weight) = self
            .taps
            .iter()
            .zip(self.taps.iter().skip(1))
            .map(|(earlier, later)| later - earlier)
            .enumerate()
            .fold((0.0, 0.0), |(sum, total), (index, interval)| {
                let weight = (index + 1) as f64;
                (sum + interval * weight, total + weight)
            });

        let average = weighted_sum / total_weight;
        if average <= 0.0 {
            return None;
        }
        Some(clamp_bpm((60.0 / average).round()))
    }

    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }

    pub fn reset(&mut self) {
        self.taps.clear();
    }
}
