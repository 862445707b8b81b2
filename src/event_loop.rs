// event_loop.rs

use crate::error::{EngineError, StartError};
use crate::meter::MeterSpec;
use crate::scheduler::BeatScheduler;
use crate::sound::SoundId;
use crossbeam::channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info};
use std::sync::PoisonError;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Commands accepted by the engine thread
#[derive(Debug)]
pub enum EngineMessage {
    Start(Sender<Result<(), StartError>>),
    Stop,
    Pause,
    Resume,
    Toggle,
    SetTempo(f64),
    /// Changes the tempo relative to the current one
    NudgeTempo(f64),
    SetMeter(MeterSpec),
    SetVolume(f32),
    SetSound(SoundId),
    Shutdown,
}

/// Owns a scheduler and drives it from a single thread.
///
/// Between wake-ups the loop blocks on the command channel, with a timeout
/// set to the scheduler's next deadline. Observer callbacks therefore all
/// run on this thread.
pub struct EventLoop {
    scheduler: BeatScheduler,
    rx: Receiver<EngineMessage>,
}

impl EventLoop {
    pub fn new(scheduler: BeatScheduler, rx: Receiver<EngineMessage>) -> Self {
        EventLoop { scheduler, rx }
    }

    pub fn run(&mut self) {
        info!("Engine loop started");
        loop {
            let message = match self.scheduler.service() {
                Some(wake_at) => {
                    let wait = (wake_at - self.scheduler.clock().now()).max(0.0);
                    match self.rx.recv_timeout(Duration::from_secs_f64(wait)) {
                        Ok(message) => message,
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match self.rx.recv() {
                    Ok(message) => message,
                    Err(_) => break,
                },
            };

            debug!("Engine message: {:?}", message);
            if !self.handle_message(message) {
                break;
            }
        }

        self.scheduler.stop();
        info!("Engine loop finished");
    }

    /// Returns false once the loop should exit.
    fn handle_message(&mut self, message: EngineMessage) -> bool {
        match message {
            EngineMessage::Start(reply) => {
                let _ = reply.send(self.scheduler.start());
            }
            EngineMessage::Stop => self.scheduler.stop(),
            EngineMessage::Pause => self.scheduler.pause(),
            EngineMessage::Resume => self.scheduler.resume(),
            EngineMessage::Toggle => log_start_error(self.scheduler.toggle()),
            EngineMessage::SetTempo(bpm) => log_start_error(self.scheduler.update_tempo(bpm)),
            EngineMessage::NudgeTempo(delta) => {
                let bpm = self
                    .scheduler
                    .settings()
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .bpm();
                log_start_error(self.scheduler.update_tempo(bpm + delta));
            }
            EngineMessage::SetMeter(meter) => log_start_error(self.scheduler.update_meter(meter)),
            EngineMessage::SetVolume(volume) => self.scheduler.update_volume(volume),
            EngineMessage::SetSound(sound) => self.scheduler.update_sound(sound),
            EngineMessage::Shutdown => return false,
        }
        true
    }
}

fn log_start_error(result: Result<(), StartError>) {
    if let Err(e) = result {
        error!("Metronome could not restart: {}", e);
    }
}

/// Control surface for a scheduler running on its engine thread
#[derive(Debug, Clone)]
pub struct MetronomeHandle {
    tx: Sender<EngineMessage>,
}

impl MetronomeHandle {
    fn send(&self, message: EngineMessage) -> Result<(), EngineError> {
        self.tx
            .send(message)
            .map_err(|_| EngineError::Disconnected)
    }

    /// Waits for the engine to report whether playback started.
    pub fn start(&self) -> Result<(), EngineError> {
        let (reply_tx, reply_rx) = bounded(1);
        self.send(EngineMessage::Start(reply_tx))?;
        reply_rx
            .recv()
            .map_err(|_| EngineError::Disconnected)?
            .map_err(EngineError::from)
    }

    pub fn stop(&self) -> Result<(), EngineError> {
        self.send(EngineMessage::Stop)
    }

    pub fn pause(&self) -> Result<(), EngineError> {
        self.send(EngineMessage::Pause)
    }

    pub fn resume(&self) -> Result<(), EngineError> {
        self.send(EngineMessage::Resume)
    }

    pub fn toggle(&self) -> Result<(), EngineError> {
        self.send(EngineMessage::Toggle)
    }

    pub fn set_tempo(&self, bpm: f64) -> Result<(), EngineError> {
        self.send(EngineMessage::SetTempo(bpm))
    }

    pub fn set_meter(&self, meter: MeterSpec) -> Result<(), EngineError> {
        self.send(EngineMessage::SetMeter(meter))
    }

    pub fn set_volume(&self, volume: f32) -> Result<(), EngineError> {
        self.send(EngineMessage::SetVolume(volume))
    }

    pub fn set_sound(&self, sound: SoundId) -> Result<(), EngineError> {
        self.send(EngineMessage::SetSound(sound))
    }

    /// Forwards an already-built message, e.g. one mapped from user input.
    pub fn dispatch(&self, message: EngineMessage) -> Result<(), EngineError> {
        self.send(message)
    }

    pub fn shutdown(&self) -> Result<(), EngineError> {
        self.send(EngineMessage::Shutdown)
    }
}

/// Moves the scheduler onto its own thread.
pub fn spawn_engine(scheduler: BeatScheduler) -> (MetronomeHandle, JoinHandle<()>) {
    let (tx, rx) = unbounded();
    let handle = thread::spawn(move || {
        let mut event_loop = EventLoop::new(scheduler, rx);
        event_loop.run();
    });
    (MetronomeHandle { tx }, handle)
}
