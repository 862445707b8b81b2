pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod event_loop;
pub mod input;
pub mod logging;
pub mod meter;
pub mod scheduler;
pub mod settings;
pub mod sound;
pub mod tempo;
pub mod ui;

pub use cli::Args;
pub use clock::{ManualClock, MonotonicClock, TimeSource, TransportClock};
pub use error::{EngineError, MeterError, SettingsError, SoundError, StartError};
pub use event_loop::{spawn_engine, EngineMessage, MetronomeHandle};
pub use meter::{Emphasis, MeterSpec};
pub use scheduler::{
    BeatEvent, BeatObserver, BeatScheduler, ChannelObserver, MetronomeEvent, Playback,
    SchedulerConfig, TempoChange,
};
pub use settings::{create_shared_settings, Settings, SettingsStore, SharedSettings};
pub use sound::{SilentOutput, SoundId, SoundOutput};
pub use tempo::{TapTempo, TempoSpec};
