use crate::event_loop::EngineMessage;
use crate::meter::MeterSpec;
use crate::sound::SoundId;

/// Tempo step for `+` / `-`
pub const TEMPO_NUDGE: f64 = 1.0;

/// What the user asked for on one line of input
#[derive(Debug)]
pub enum Command {
    Engine(EngineMessage),
    Quit,
}

pub const HELP: &str =
    "Enter: play/pause | s: stop | +/-: tempo | t <bpm> | m <n/d> | v <0-1> | k <sound> | q: quit";

/// Maps a line typed while the metronome runs to a command.
pub fn map_command(line: &str) -> Option<Command> {
    let line = line.trim();
    let (word, arg) = match line.split_once(char::is_whitespace) {
        Some((word, arg)) => (word, arg.trim()),
        None => (line, ""),
    };

    let message = match word {
        "" | "p" | "P" => EngineMessage::Toggle,
        "s" | "S" => EngineMessage::Stop,
        "+" => EngineMessage::NudgeTempo(TEMPO_NUDGE),
        "-" => EngineMessage::NudgeTempo(-TEMPO_NUDGE),
        "t" => EngineMessage::SetTempo(arg.parse().ok()?),
        "m" => EngineMessage::SetMeter(arg.parse::<MeterSpec>().ok()?),
        "v" => EngineMessage::SetVolume(arg.parse().ok()?),
        "k" => EngineMessage::SetSound(arg.parse::<SoundId>().ok()?),
        "q" | "Q" => return Some(Command::Quit),
        _ => return None,
    };
    Some(Command::Engine(message))
}
