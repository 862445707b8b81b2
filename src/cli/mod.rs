use crate::meter::MeterSpec;
use crate::settings::Settings;
use crate::sound::SoundId;
use crate::tempo::preset_by_name;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "A practice metronome", long_about = None)]
pub struct Args {
    /// Tempo in beats per minute (40-300)
    #[arg(short, long)]
    pub bpm: Option<f64>,

    /// Time signature, e.g. 4/4 or 7/8
    #[arg(short, long)]
    pub meter: Option<MeterSpec>,

    /// Click sound: wood, digital, bell or tick
    #[arg(short, long)]
    pub sound: Option<SoundId>,

    /// Output volume from 0.0 to 1.0
    #[arg(short, long)]
    pub volume: Option<f32>,

    /// Play this many bars of count-in before the first bar
    #[arg(long, value_name = "BARS")]
    pub count_in: Option<u32>,

    /// Comma-separated beats to accent, replacing the meter's pattern
    #[arg(long, value_delimiter = ',', value_name = "BEATS")]
    pub accent: Option<Vec<u32>>,

    /// Shift beats earlier by this many milliseconds (-100 to 100)
    #[arg(long, allow_negative_numbers = true)]
    pub latency_ms: Option<f64>,

    /// Named tempo such as andante or presto; --bpm wins over it
    #[arg(long)]
    pub preset: Option<String>,

    /// Config file to use instead of the default one
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Send clicks to the MIDI output whose name contains this
    #[arg(long)]
    pub midi_output: Option<String>,

    /// Choose the MIDI output interactively
    #[arg(long)]
    pub pick_output: bool,

    /// List available MIDI outputs
    #[arg(long)]
    pub list_outputs: bool,

    /// Run without sound, display only
    #[arg(long, conflicts_with_all = ["midi_output", "pick_output"])]
    pub silent: bool,

    /// Stop after this many seconds instead of reading commands
    #[arg(long, value_name = "SECS")]
    pub duration: Option<f64>,

    /// Tap the tempo with Enter before starting
    #[arg(long)]
    pub tap: bool,

    /// Do not write settings back on exit
    #[arg(long)]
    pub no_save: bool,
}

impl Args {
    /// Writes every given flag into `settings`. Unknown presets are an error.
    pub fn apply_to(&self, settings: &mut Settings) -> Result<(), String> {
        if let Some(name) = &self.preset {
            let preset =
                preset_by_name(name).ok_or_else(|| format!("Unknown tempo preset '{}'", name))?;
            settings.set_bpm(preset.bpm);
        }
        if let Some(bpm) = self.bpm {
            settings.set_bpm(bpm);
        }
        if let Some(meter) = self.meter {
            settings.set_meter(meter);
        }
        if let Some(sound) = self.sound {
            settings.set_sound(sound);
        }
        if let Some(volume) = self.volume {
            settings.set_volume(volume);
        }
        if let Some(bars) = self.count_in {
            settings.set_count_in(bars > 0);
            if bars > 0 {
                settings.set_count_in_bars(bars);
            }
        }
        if let Some(accent) = &self.accent {
            settings.set_accent_beats(accent.clone());
        }
        if let Some(ms) = self.latency_ms {
            settings.set_latency_compensation_ms(ms);
        }
        Ok(())
    }
}

pub fn validate_output(output_name: &str, outputs: &[String]) -> Result<(), String> {
    if !outputs.iter().any(|o| o.contains(output_name)) {
        let mut error_msg = format!(
            "Error: MIDI output '{}' not found in available outputs:\n",
            output_name
        );
        for output in outputs {
            error_msg.push_str(&format!("  - {}\n", output));
        }
        return Err(error_msg);
    }
    Ok(())
}
