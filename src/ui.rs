// ui.rs

use crate::meter::Emphasis;
use crate::scheduler::{BeatEvent, MetronomeEvent};
use crate::settings::SharedSettings;
use crossbeam::channel::Receiver;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::PoisonError;

fn create_beat_progress(multi_progress: &MultiProgress, beats_per_bar: u64) -> ProgressBar {
    let pb = multi_progress.add(ProgressBar::new(beats_per_bar));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{prefix:.bold} [{bar:40.cyan}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("⣀⣤⣦⣶⣷⣿ "),
    );
    pb.set_prefix("Beat");
    pb
}

fn create_bar_counter(multi_progress: &MultiProgress) -> ProgressBar {
    let pb = multi_progress.add(ProgressBar::new_spinner());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{prefix:.bold} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix("Bar ");
    pb
}

fn create_transport_spinner(multi_progress: &MultiProgress) -> ProgressBar {
    let pb = multi_progress.add(ProgressBar::new_spinner());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix("Transport");
    pb
}

fn pulse_mark(event: &BeatEvent) -> &'static str {
    match event.emphasis {
        Emphasis::Strong => "●",
        Emphasis::Medium => "◉",
        Emphasis::Weak => "○",
    }
}

/// Terminal beat display fed by scheduler events
pub struct BeatDisplay {
    settings: SharedSettings,
    #[allow(dead_code)]
    multi_progress: MultiProgress,
    beat_pb: ProgressBar,
    bar_pb: ProgressBar,
    transport_pb: ProgressBar,
    status: &'static str,
}

impl BeatDisplay {
    pub fn new(settings: SharedSettings) -> Self {
        let multi_progress = MultiProgress::with_draw_target(ProgressDrawTarget::stderr());
        let beats_per_bar = {
            let settings = settings.lock().unwrap_or_else(PoisonError::into_inner);
            u64::from(settings.meter().numerator())
        };
        let beat_pb = create_beat_progress(&multi_progress, beats_per_bar);
        let bar_pb = create_bar_counter(&multi_progress);
        let transport_pb = create_transport_spinner(&multi_progress);

        let display = BeatDisplay {
            settings,
            multi_progress,
            beat_pb,
            bar_pb,
            transport_pb,
            status: "Stopped",
        };
        display.refresh_transport();
        display
    }

    /// Renders events until the channel closes.
    pub fn run(&mut self, events: Receiver<MetronomeEvent>) {
        for event in events.iter() {
            self.apply(&event);
        }
        self.beat_pb.finish_and_clear();
        self.bar_pb.finish_and_clear();
        self.transport_pb.finish_with_message("Goodbye");
    }

    pub fn apply(&mut self, event: &MetronomeEvent) {
        match event {
            MetronomeEvent::Started => self.status = "Running",
            MetronomeEvent::Resumed => self.status = "Running",
            MetronomeEvent::Paused => self.status = "Paused",
            MetronomeEvent::Stopped => {
                self.status = "Stopped";
                self.beat_pb.set_position(0);
                self.beat_pb.set_message("");
                self.bar_pb.set_message("-");
            }
            MetronomeEvent::Beat(beat) => self.show_beat(beat),
        }
        self.refresh_transport();
    }

    fn show_beat(&self, beat: &BeatEvent) {
        self.beat_pb.set_length(u64::from(beat.meter.numerator()));
        self.beat_pb.set_position(u64::from(beat.beat));
        self.beat_pb.set_message(pulse_mark(beat));
        if beat.count_in {
            self.bar_pb.set_message(format!("count-in {}", beat.bar));
        } else {
            self.bar_pb.set_message(beat.bar.to_string());
        }
    }

    fn refresh_transport(&self) {
        let (bpm, meter, sound, volume) = {
            let settings = self.settings.lock().unwrap_or_else(PoisonError::into_inner);
            (
                settings.bpm(),
                settings.meter(),
                settings.sound(),
                settings.volume(),
            )
        };
        self.transport_pb.set_message(format!(
            "BPM: {}, Meter: {}, Sound: {}, Volume: {:.0}%, Transport: {}",
            bpm,
            meter,
            sound,
            volume * 100.0,
            self.status
        ));
        self.transport_pb.tick();
    }
}

/// Blocks rendering events until the sender side goes away.
pub fn run_beat_display(settings: SharedSettings, events: Receiver<MetronomeEvent>) {
    let mut display = BeatDisplay::new(settings);
    display.run(events);
}
