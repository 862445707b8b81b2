//! Look-ahead beat scheduling
//!
//! The scheduler turns a coarse poll (every 25 ms by default) into beats
//! that fire on time:
//! - each poll schedules every beat due within the look-ahead window
//!   (100 ms by default) into a queue of pending fires
//! - the driver sleeps until the earlier of the next poll and the first
//!   pending fire, then calls [`BeatScheduler::service`] again
//!
//! Deciding what to play happens on the poll; playing it happens at the
//! beat's own deadline. Stopping or pausing drops the pending queue, so no
//! beat can sound after the transport has stopped.
//!
//! The scheduler is driven from one thread. [`crate::event_loop`] provides
//! that thread for real-time use; tests drive it with a
//! [`crate::clock::ManualClock`].
mod event;
mod state;

pub use event::{BeatEvent, BeatObserver, ChannelObserver, MetronomeEvent};
pub use state::{Cursor, Playback, ScheduleState};

use crate::clock::TransportClock;
use crate::error::StartError;
use crate::meter::MeterSpec;
use crate::settings::{Settings, SharedSettings};
use crate::sound::{SoundId, SoundOutput};
use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::PoisonError;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(25);
pub const DEFAULT_SCHEDULE_AHEAD: Duration = Duration::from_millis(100);

/// What a tempo change does to a running metronome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TempoChange {
    /// Stop and start again at the new tempo; the beat restarts at 1.
    #[default]
    Restart,
    /// Keep the bar position and re-derive upcoming beats from the last one
    /// that sounded.
    InPlace,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    pub poll_interval: Duration,
    pub schedule_ahead: Duration,
    pub tempo_change: TempoChange,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            poll_interval: DEFAULT_POLL_INTERVAL,
            schedule_ahead: DEFAULT_SCHEDULE_AHEAD,
            tempo_change: TempoChange::default(),
        }
    }
}

/// A beat waiting for its due time, with the cursor it was scheduled from.
#[derive(Debug, Clone, Copy)]
struct PendingBeat {
    event: BeatEvent,
    cursor: Cursor,
}

pub struct BeatScheduler {
    clock: TransportClock,
    settings: SharedSettings,
    sound: Box<dyn SoundOutput>,
    observer: Box<dyn BeatObserver>,
    config: SchedulerConfig,
    state: ScheduleState,
    pending: VecDeque<PendingBeat>,
    next_poll_at: f64,
}

impl BeatScheduler {
    pub fn new<S, O>(clock: TransportClock, settings: SharedSettings, sound: S, observer: O) -> Self
    where
        S: SoundOutput + 'static,
        O: BeatObserver + 'static,
    {
        BeatScheduler {
            clock,
            settings,
            sound: Box::new(sound),
            observer: Box::new(observer),
            config: SchedulerConfig::default(),
            state: ScheduleState::idle(),
            pending: VecDeque::new(),
            next_poll_at: 0.0,
        }
    }

    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn state(&self) -> &ScheduleState {
        &self.state
    }

    pub fn playback(&self) -> Playback {
        self.state.playback
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_running()
    }

    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    pub fn clock(&self) -> &TransportClock {
        &self.clock
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Beats scheduled but not fired yet
    pub fn pending_beats(&self) -> usize {
        self.pending.len()
    }

    fn read_settings<R>(&self, f: impl FnOnce(&Settings) -> R) -> R {
        let settings = self.settings.lock().unwrap_or_else(PoisonError::into_inner);
        f(&settings)
    }

    fn write_settings<R>(&self, f: impl FnOnce(&mut Settings) -> R) -> R {
        let mut settings = self.settings.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut settings)
    }

    /// Starts from the top. A running or paused metronome is stopped first.
    pub fn start(&mut self) -> Result<(), StartError> {
        if !self.state.is_idle() {
            info!("Restarting metronome");
            self.stop();
        }

        let (sound, volume, count_in_beats, latency_ms, bpm, meter) = self.read_settings(|s| {
            (
                s.sound(),
                s.volume(),
                s.count_in_beats(),
                s.latency_compensation_ms(),
                s.bpm(),
                s.meter(),
            )
        });

        if let Err(e) = self.prepare_output(sound, volume) {
            error!("Failed to start metronome: {}", e);
            return Err(e);
        }

        let now = self.clock.now();
        self.state = ScheduleState::started(now, latency_ms / 1000.0, count_in_beats);
        self.pending.clear();
        self.next_poll_at = now;

        if count_in_beats > 0 {
            info!(
                "Metronome started at {} BPM in {} with {} count-in beats",
                bpm, meter, count_in_beats
            );
        } else {
            info!("Metronome started at {} BPM in {}", bpm, meter);
        }
        self.observer.on_start();
        Ok(())
    }

    fn prepare_output(&mut self, sound: SoundId, volume: f32) -> Result<(), StartError> {
        self.sound.initialize().map_err(StartError::AudioSession)?;
        self.sound
            .load_sound_set(sound)
            .map_err(|source| StartError::SoundSet { sound, source })?;
        if let Err(e) = self.sound.set_volume(volume) {
            warn!("Could not set volume to {}: {}", volume, e);
        }
        Ok(())
    }

    /// Stops and resets to idle. Does nothing when already idle.
    pub fn stop(&mut self) {
        if self.state.is_idle() {
            debug!("Stop ignored, metronome already idle");
            return;
        }

        let cancelled = self.pending.len();
        self.pending.clear();
        info!(
            "Metronome stopped after {} beats ({} pending cancelled)",
            self.state.beats_fired, cancelled
        );
        self.state = ScheduleState::idle();
        self.observer.on_stop();
    }

    /// Freezes the beat grid. Only valid while running.
    pub fn pause(&mut self) {
        if !self.state.is_running() {
            debug!("Pause ignored in {:?} state", self.state.playback);
            return;
        }

        let now = self.clock.now();
        self.rewind_pending();
        self.state.playback = Playback::Paused;
        self.state.paused_at = Some(now);
        info!(
            "Metronome paused before beat {} of bar {}",
            self.state.cursor.beat_in_bar,
            self.state.cursor.bar + 1
        );
        self.observer.on_pause();
    }

    /// Continues a paused grid, shifted by the time spent paused.
    pub fn resume(&mut self) {
        if !self.state.is_paused() {
            debug!("Resume ignored in {:?} state", self.state.playback);
            return;
        }

        let now = self.clock.now();
        let paused_for = self
            .state
            .paused_at
            .take()
            .map_or(0.0, |at| (now - at).max(0.0));

        self.state.next_beat_due = self
            .clock
            .shift_for_pause(self.state.next_beat_due, paused_for);
        self.state.anchor_time = self.clock.shift_for_pause(self.state.anchor_time, paused_for);
        self.state.last_fired_due = self
            .state
            .last_fired_due
            .map(|due| self.clock.shift_for_pause(due, paused_for));
        self.state.paused_elapsed_correction += paused_for;
        self.state.playback = Playback::Running;
        self.next_poll_at = now;

        info!("Metronome resumed after {:.3}s", paused_for);
        self.observer.on_resume();
    }

    /// Running pauses, paused resumes, idle starts.
    pub fn toggle(&mut self) -> Result<(), StartError> {
        match self.state.playback {
            Playback::Running => self.pause(),
            Playback::Paused => self.resume(),
            Playback::Idle => self.start()?,
        }
        Ok(())
    }

    /// Stores the (clamped) tempo; how a running metronome follows depends
    /// on [`SchedulerConfig::tempo_change`].
    pub fn update_tempo(&mut self, bpm: f64) -> Result<(), StartError> {
        let bpm = self.write_settings(|s| s.set_bpm(bpm));
        match (self.state.playback, self.config.tempo_change) {
            (Playback::Idle, _) => debug!("Tempo set to {} BPM", bpm),
            (Playback::Running, TempoChange::Restart) => {
                info!("Tempo changed to {} BPM, restarting", bpm);
                self.start()?;
            }
            (Playback::Running, TempoChange::InPlace) | (Playback::Paused, _) => self.regrid(bpm),
        }
        Ok(())
    }

    /// Stores the meter. A running metronome restarts so that the bar
    /// starts clean; a paused one resumes on a fresh bar of the new meter.
    pub fn update_meter(&mut self, meter: MeterSpec) -> Result<(), StartError> {
        let previous = self.write_settings(|s| {
            let previous = s.meter();
            s.set_meter(meter);
            previous
        });
        if previous == meter {
            return Ok(());
        }

        match self.state.playback {
            Playback::Running => {
                info!("Meter changed to {}, restarting", meter);
                self.start()?;
            }
            Playback::Paused => {
                self.state.cursor = self
                    .state
                    .cursor
                    .rebarred(previous.numerator(), meter.numerator());
                info!("Meter changed to {} while paused, next beat starts a bar", meter);
            }
            Playback::Idle => debug!("Meter set to {}", meter),
        }
        Ok(())
    }

    pub fn update_volume(&mut self, volume: f32) {
        let volume = self.write_settings(|s| s.set_volume(volume));
        if let Err(e) = self.sound.set_volume(volume) {
            warn!("Could not set volume to {}: {}", volume, e);
        }
        debug!("Volume set to {}", volume);
    }

    pub fn update_sound(&mut self, sound: SoundId) {
        self.write_settings(|s| s.set_sound(sound));
        if !self.state.is_idle() {
            if let Err(e) = self.sound.load_sound_set(sound) {
                warn!("Could not load sound set {}: {}", sound, e);
            }
        }
        debug!("Sound set to {}", sound);
    }

    /// Takes effect on the next start.
    pub fn update_count_in(&mut self, enabled: bool, bars: u32) {
        self.write_settings(|s| {
            s.set_count_in(enabled);
            s.set_count_in_bars(bars);
        });
    }

    /// Fires due beats and polls when the cadence is due. Returns the clock
    /// time at which it wants to be called again, or `None` when not running.
    pub fn service(&mut self) -> Option<f64> {
        if !self.state.is_running() {
            return None;
        }

        let now = self.clock.now();
        self.fire_due(now);
        if now >= self.next_poll_at {
            self.look_ahead(now);
            self.next_poll_at = now + self.config.poll_interval.as_secs_f64();
            self.fire_due(now);
        }

        let next_poll = self.next_poll_at;
        Some(
            self.pending
                .front()
                .map_or(next_poll, |beat| beat.event.due_time.min(next_poll)),
        )
    }

    fn look_ahead(&mut self, now: f64) {
        let horizon = now + self.config.schedule_ahead.as_secs_f64();
        trace!("Poll at {:.3}, scheduling up to {:.3}", now, horizon);
        while self.state.next_beat_due < horizon {
            self.schedule_next();
        }
    }

    fn schedule_next(&mut self) {
        // Emphasis is fixed here, from the meter in force when the beat is
        // scheduled, not when it fires.
        let (bpm, meter, cursor, emphasis) = self.read_settings(|s| {
            let meter = s.meter();
            let cursor = self.state.cursor.wrapped(meter.numerator());
            let emphasis = meter.emphasis_with_accents(cursor.beat_in_bar, s.accent_beats());
            (s.bpm(), meter, cursor, emphasis)
        });

        let due_time = self.state.next_beat_due;
        let count_in = cursor.counting_in();
        let event = BeatEvent {
            beat: cursor.beat_in_bar,
            bar: if count_in {
                cursor.count_in_bar + 1
            } else {
                cursor.bar + 1
            },
            emphasis,
            accent: emphasis.is_accent(),
            count_in,
            due_time,
            meter,
        };
        debug!(
            "Scheduled beat {} of bar {} at {:.3} ({:?}{})",
            event.beat,
            event.bar,
            due_time,
            emphasis,
            if count_in { ", count-in" } else { "" }
        );

        self.pending.push_back(PendingBeat { event, cursor });
        self.state.next_beat_due = self.clock.advance(due_time, bpm);
        self.state.cursor = cursor.advanced(meter.numerator());
    }

    fn fire_due(&mut self, now: f64) {
        while self
            .pending
            .front()
            .is_some_and(|beat| beat.event.due_time <= now)
        {
            if let Some(beat) = self.pending.pop_front() {
                self.fire(beat.event);
            }
        }
    }

    fn fire(&mut self, event: BeatEvent) {
        let (sound, volume) = self.read_settings(|s| (s.sound(), s.volume()));
        if let Err(e) = self.sound.play_beat(sound, event.emphasis, volume) {
            warn!(
                "Beat {} of bar {} dropped by sound output: {}",
                event.beat, event.bar, e
            );
        }

        self.state.last_fired_due = Some(event.due_time);
        self.state.beats_fired += 1;
        self.state.last_beat = Some(event);
        self.observer.on_beat(&event);
    }

    /// Cancels every pending fire and moves the cursor back to the first of
    /// them, so the cancelled beats are scheduled again later.
    fn rewind_pending(&mut self) {
        if let Some(first) = self.pending.front() {
            self.state.cursor = first.cursor;
            self.state.next_beat_due = first.event.due_time;
            debug!("Cancelled {} pending beats", self.pending.len());
        }
        self.pending.clear();
    }

    fn regrid(&mut self, bpm: f64) {
        self.rewind_pending();
        if let Some(previous) = self.state.last_fired_due {
            self.state.next_beat_due = self.clock.advance(previous, bpm);
        }
        self.next_poll_at = self.clock.now();
        info!(
            "Tempo changed to {} BPM in place, next beat at {:.3}",
            bpm, self.state.next_beat_due
        );
    }
}
