use super::{SoundId, SoundOutput, SoundVariant};
use crate::error::SoundError;
use crate::meter::Emphasis;
use log::{debug, info, warn};
use midir::{MidiOutput, MidiOutputConnection};

/// General MIDI percussion channel (channel 10, zero based)
const PERCUSSION_CHANNEL: u8 = 9;

enum MidiMessage {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
}

impl MidiMessage {
    fn bytes(&self) -> [u8; 3] {
        match *self {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => [0x90 | (channel & 0x0F), note, velocity],
            MidiMessage::NoteOff { channel, note } => [0x80 | (channel & 0x0F), note, 0],
        }
    }
}

/// Percussion note for each sound and variant
fn percussion_note(sound: SoundId, variant: SoundVariant) -> u8 {
    match (sound, variant) {
        (SoundId::Wood, SoundVariant::High) => 76,    // Hi Wood Block
        (SoundId::Wood, SoundVariant::Low) => 77,     // Low Wood Block
        (SoundId::Digital, SoundVariant::High) => 81, // Open Triangle
        (SoundId::Digital, SoundVariant::Low) => 80,  // Mute Triangle
        (SoundId::Bell, SoundVariant::High) => 53,    // Ride Bell
        (SoundId::Bell, SoundVariant::Low) => 56,     // Cowbell
        (SoundId::Tick, SoundVariant::High) => 75,    // Claves
        (SoundId::Tick, SoundVariant::Low) => 42,     // Closed Hi-Hat
    }
}

fn velocity(volume: f32, emphasis: Emphasis) -> u8 {
    let scale = match emphasis {
        Emphasis::Strong => 1.0,
        Emphasis::Medium => 0.85,
        Emphasis::Weak => 0.7,
    };
    (volume.clamp(0.0, 1.0) * scale * 127.0).round() as u8
}

/// Lists the names of all MIDI output ports
pub fn list_output_ports() -> Result<Vec<String>, SoundError> {
    let midi_out = MidiOutput::new("clicktrackrs-port-lister")
        .map_err(|e| SoundError::Unavailable(e.to_string()))?;
    let ports = midi_out.ports();
    Ok(ports
        .iter()
        .filter_map(|p| midi_out.port_name(p).ok())
        .collect())
}

/// Clicks on a MIDI output port, one percussion note per beat
pub struct MidiClickOutput {
    device_name: Option<String>,
    connection: Option<MidiOutputConnection>,
    loaded: Option<SoundId>,
}

impl MidiClickOutput {
    /// `device_name` picks the first port whose name contains it; `None`
    /// takes the first available port.
    pub fn new(device_name: Option<String>) -> Self {
        MidiClickOutput {
            device_name,
            connection: None,
            loaded: None,
        }
    }

    fn connect(&self) -> Result<MidiOutputConnection, SoundError> {
        let midi_out = MidiOutput::new("clicktrackrs-output")
            .map_err(|e| SoundError::Unavailable(e.to_string()))?;

        let out_ports = midi_out.ports();
        let available_ports: Vec<String> = out_ports
            .iter()
            .filter_map(|p| midi_out.port_name(p).ok())
            .collect();
        info!("Available MIDI output ports: {:?}", available_ports);

        let port = match &self.device_name {
            Some(name) => out_ports.iter().find(|p| {
                midi_out
                    .port_name(p)
                    .unwrap_or_default()
                    .contains(name.as_str())
            }),
            None => out_ports.first(),
        }
        .ok_or_else(|| {
            SoundError::Unavailable(match &self.device_name {
                Some(name) => format!("MIDI output device '{}' not found", name),
                None => "no MIDI output ports available".to_string(),
            })
        })?;

        let port_name = midi_out
            .port_name(port)
            .map_err(|e| SoundError::Unavailable(e.to_string()))?;
        info!("Connecting to MIDI output port: {}", port_name);

        midi_out
            .connect(port, "clicktrackrs-output-conn")
            .map_err(|e| SoundError::Unavailable(e.to_string()))
    }

    fn send(&mut self, message: MidiMessage) -> Result<(), SoundError> {
        let conn = self.connection.as_mut().ok_or(SoundError::NotConnected)?;
        conn.send(&message.bytes())
            .map_err(|e| SoundError::Send(e.to_string()))
    }
}

impl SoundOutput for MidiClickOutput {
    fn initialize(&mut self) -> Result<(), SoundError> {
        if self.connection.is_none() {
            self.connection = Some(self.connect()?);
        }
        Ok(())
    }

    fn load_sound_set(&mut self, sound: SoundId) -> Result<(), SoundError> {
        if self.connection.is_none() {
            return Err(SoundError::NotConnected);
        }
        debug!("Selected MIDI sound set: {}", sound);
        self.loaded = Some(sound);
        Ok(())
    }

    fn play_beat(
        &mut self,
        sound: SoundId,
        emphasis: Emphasis,
        volume: f32,
    ) -> Result<(), SoundError> {
        if self.loaded.is_none() {
            return Ok(());
        }
        if self.loaded != Some(sound) {
            warn!("Sound set {} requested but {:?} is loaded", sound, self.loaded);
        }

        let note = percussion_note(sound, SoundVariant::from(emphasis));
        let velocity = velocity(volume, emphasis);
        debug!("Sending click: note={}, vel={}", note, velocity);

        self.send(MidiMessage::NoteOn {
            channel: PERCUSSION_CHANNEL,
            note,
            velocity,
        })?;
        // Percussion notes are one-shots; release right away.
        self.send(MidiMessage::NoteOff {
            channel: PERCUSSION_CHANNEL,
            note,
        })
    }

    /// Velocity comes from the volume passed with each beat, so there is
    /// nothing to store here.
    fn set_volume(&mut self, volume: f32) -> Result<(), SoundError> {
        debug!("MIDI click volume now {}", volume);
        Ok(())
    }
}
