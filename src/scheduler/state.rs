use super::event::BeatEvent;

/// Transport state of the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Playback {
    #[default]
    Idle,
    Running,
    Paused,
}

/// Position of the next beat to schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// 1-indexed position within the bar
    pub beat_in_bar: u32,
    /// 0-indexed bar of real playback; stays 0 during count-in
    pub bar: u32,
    /// Count-in beats still to schedule, 0 when not counting in
    pub count_in_remaining: u32,
    /// 0-indexed bar within the count-in
    pub count_in_bar: u32,
}

impl Cursor {
    pub fn new(count_in_beats: u32) -> Self {
        Cursor {
            beat_in_bar: 1,
            bar: 0,
            count_in_remaining: count_in_beats,
            count_in_bar: 0,
        }
    }

    pub fn counting_in(&self) -> bool {
        self.count_in_remaining > 0
    }

    /// Pulls a position left past the end of a shrunken bar back to a bar
    /// start.
    pub fn wrapped(mut self, beats_per_bar: u32) -> Self {
        if self.beat_in_bar > beats_per_bar {
            self.beat_in_bar = 1;
            if self.counting_in() {
                self.count_in_bar += 1;
            } else {
                self.bar += 1;
            }
        }
        self
    }

    /// Cursor of the beat after this one.
    pub fn advanced(self, beats_per_bar: u32) -> Self {
        let mut next = self;
        if self.counting_in() {
            next.count_in_remaining -= 1;
            if next.count_in_remaining == 0 {
                return Cursor::new(0);
            }
            if self.beat_in_bar >= beats_per_bar {
                next.beat_in_bar = 1;
                next.count_in_bar += 1;
            } else {
                next.beat_in_bar += 1;
            }
        } else if self.beat_in_bar >= beats_per_bar {
            next.beat_in_bar = 1;
            next.bar += 1;
        } else {
            next.beat_in_bar += 1;
        }
        next
    }
}

impl Cursor {
    /// Moves the cursor onto a new meter, starting a fresh bar. A count-in
    /// keeps its remaining bars (a partly played one counts again) at the
    /// new bar length.
    pub fn rebarred(self, old_beats_per_bar: u32, new_beats_per_bar: u32) -> Self {
        if self.counting_in() {
            let bars_left = self.count_in_remaining.div_ceil(old_beats_per_bar.max(1));
            return Cursor {
                beat_in_bar: 1,
                bar: 0,
                count_in_remaining: bars_left * new_beats_per_bar,
                count_in_bar: self.count_in_bar,
            };
        }
        Cursor {
            beat_in_bar: 1,
            bar: if self.beat_in_bar > 1 {
                self.bar + 1
            } else {
                self.bar
            },
            ..self
        }
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Cursor::new(0)
    }
}

/// Runtime state owned by the scheduler. Nothing outside the scheduler
/// mutates it; observers get copies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleState {
    pub playback: Playback,
    /// Clock time the current run started at, shifted by pauses
    pub anchor_time: f64,
    /// Clock time of the next beat that has not been scheduled yet
    pub next_beat_due: f64,
    pub cursor: Cursor,
    pub paused_at: Option<f64>,
    /// Total seconds spent paused during this run
    pub paused_elapsed_correction: f64,
    /// Due time of the most recently fired beat
    pub last_fired_due: Option<f64>,
    pub beats_fired: u64,
    pub last_beat: Option<BeatEvent>,
}

impl ScheduleState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn started(now: f64, latency_compensation: f64, count_in_beats: u32) -> Self {
        ScheduleState {
            playback: Playback::Running,
            anchor_time: now,
            next_beat_due: now - latency_compensation,
            cursor: Cursor::new(count_in_beats),
            ..Self::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.playback == Playback::Running
    }

    pub fn is_paused(&self) -> bool {
        self.playback == Playback::Paused
    }

    pub fn is_idle(&self) -> bool {
        self.playback == Playback::Idle
    }

    pub fn counting_in(&self) -> bool {
        !self.is_idle() && self.cursor.counting_in()
    }

    /// Seconds of actual playing since the run started.
    pub fn playing_time(&self, now: f64) -> f64 {
        let end = self.paused_at.unwrap_or(now);
        (end - self.anchor_time).max(0.0)
    }
}
