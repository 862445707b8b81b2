use crate::meter::{Emphasis, MeterSpec};
use crate::sound::SoundVariant;
use crossbeam::channel::Sender;

/// One beat, as resolved when it was scheduled
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatEvent {
    /// 1-indexed position within the bar
    pub beat: u32,
    /// 1-indexed bar; during count-in, the bar of the count-in
    pub bar: u32,
    pub emphasis: Emphasis,
    pub accent: bool,
    pub count_in: bool,
    /// Clock time the beat is due at
    pub due_time: f64,
    pub meter: MeterSpec,
}

impl BeatEvent {
    pub fn variant(&self) -> SoundVariant {
        SoundVariant::from(self.emphasis)
    }
}

/// Receives playback notifications from the scheduler.
///
/// All methods run on the thread that drives the scheduler and default to
/// doing nothing. Pausing is reported through `on_stop` and resuming through
/// `on_start` unless an observer overrides `on_pause` / `on_resume`.
pub trait BeatObserver: Send {
    fn on_beat(&mut self, _event: &BeatEvent) {}

    fn on_start(&mut self) {}

    fn on_stop(&mut self) {}

    fn on_pause(&mut self) {
        self.on_stop();
    }

    fn on_resume(&mut self) {
        self.on_start();
    }
}

impl BeatObserver for () {}

/// Notifications forwarded by [`ChannelObserver`]
#[derive(Debug, Clone, PartialEq)]
pub enum MetronomeEvent {
    Started,
    Stopped,
    Paused,
    Resumed,
    Beat(BeatEvent),
}

/// Forwards every notification over a channel, so a UI or store on another
/// thread can mirror the scheduler.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: Sender<MetronomeEvent>,
}

impl ChannelObserver {
    pub fn new(tx: Sender<MetronomeEvent>) -> Self {
        ChannelObserver { tx }
    }

    fn send(&self, event: MetronomeEvent) {
        // A listener that went away is not the scheduler's problem.
        let _ = self.tx.send(event);
    }
}

impl BeatObserver for ChannelObserver {
    fn on_beat(&mut self, event: &BeatEvent) {
        self.send(MetronomeEvent::Beat(*event));
    }

    fn on_start(&mut self) {
        self.send(MetronomeEvent::Started);
    }

    fn on_stop(&mut self) {
        self.send(MetronomeEvent::Stopped);
    }

    fn on_pause(&mut self) {
        self.send(MetronomeEvent::Paused);
    }

    fn on_resume(&mut self) {
        self.send(MetronomeEvent::Resumed);
    }
}
