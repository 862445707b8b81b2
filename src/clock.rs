// clock.rs

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A monotonic source of seconds.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> f64;
}

/// Seconds elapsed since the clock was created, backed by `Instant`.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// A clock that only moves when told to. Cloning shares the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        ManualClock {
            bits: Arc::new(AtomicU64::new(start.to_bits())),
        }
    }

    pub fn set(&self, seconds: f64) {
        self.bits.store(seconds.to_bits(), Ordering::SeqCst);
    }

    pub fn advance_by(&self, seconds: f64) {
        self.set(self.now() + seconds);
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

/// Converts tempo and elapsed time into beat due times.
///
/// `advance` is the only place where a tempo becomes a duration, so a tempo
/// change only ever reshapes intervals that have not been scheduled yet.
#[derive(Clone)]
pub struct TransportClock {
    source: Arc<dyn TimeSource>,
}

impl TransportClock {
    pub fn new<T: TimeSource + 'static>(source: T) -> Self {
        TransportClock {
            source: Arc::new(source),
        }
    }

    pub fn monotonic() -> Self {
        Self::new(MonotonicClock::new())
    }

    pub fn now(&self) -> f64 {
        self.source.now()
    }

    /// Due time of the beat following `due_time` at `bpm`.
    pub fn advance(&self, due_time: f64, bpm: f64) -> f64 {
        due_time + 60.0 / bpm
    }

    /// Re-anchors a frozen due time after a pause of `paused_for` seconds.
    pub fn shift_for_pause(&self, due_time: f64, paused_for: f64) -> f64 {
        due_time + paused_for
    }
}

impl fmt::Debug for TransportClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportClock")
            .field("now", &self.now())
            .finish()
    }
}
