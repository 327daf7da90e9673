/// Represents a decoded MIDI message that can flow through the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note On message with note number and velocity
    NoteOn { channel: u8, note: u8, velocity: u8 },
    /// Note Off message with note number and velocity
    NoteOff { channel: u8, note: u8, velocity: u8 },
    /// Control Change message with controller number and value
    ControlChange {
        channel: u8,
        controller: u8,
        value: u8,
    },
    /// Channel Pressure (aftertouch) message
    ChannelPressure { channel: u8, value: u8 },
    /// Pitch Bend with a 14-bit value re-centered around zero (-8192..=8191)
    PitchBend { channel: u8, value: i16 },
    /// MIDI Clock timing message (24 per quarter note)
    Clock,
    /// MIDI Start message
    Start,
    /// MIDI Stop message
    Stop,
    /// MIDI Continue message
    Continue,
    /// Song Position Pointer with the raw 14-bit value.
    ///
    /// The MIDI standard defines the unit as sixteenth notes, but at least
    /// one consumer labels it eighth notes; the engine never rescales, it
    /// hands the value on exactly as decoded.
    SongPositionPointer { value: u16 },
}

impl MidiMessage {
    /// Returns the channel for channel-voice messages, `None` for system messages
    pub fn channel(&self) -> Option<u8> {
        match self {
            MidiMessage::NoteOn { channel, .. }
            | MidiMessage::NoteOff { channel, .. }
            | MidiMessage::ControlChange { channel, .. }
            | MidiMessage::ChannelPressure { channel, .. }
            | MidiMessage::PitchBend { channel, .. } => Some(*channel),
            _ => None,
        }
    }

    /// Returns true for NoteOn and NoteOff messages
    pub fn is_note(&self) -> bool {
        matches!(
            self,
            MidiMessage::NoteOn { .. } | MidiMessage::NoteOff { .. }
        )
    }
}
