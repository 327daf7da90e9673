//! Wire codec for the MIDI byte protocol
//!
//! The decoder is stateful so it can reassemble messages that arrive split
//! across callbacks and honor running status. The encoder is the exact
//! inverse: `decode(encode(msg))` yields `[msg]` for every constructible
//! message.

use super::{MidiError, MidiMessage, Result};

/// Upper bound on buffered sysex bytes before the run is abandoned
const SYSEX_LIMIT: usize = 128;

/// Stateful decoder for raw MIDI byte runs.
///
/// Feed it byte runs as they arrive; it emits one `Result` per completed
/// message or rejected run. Malformed runs are dropped and decoding
/// resynchronizes on the next status byte, so a bad run never poisons the
/// rest of the buffer.
pub struct MidiDecoder {
    status: Option<u8>,
    data: Vec<u8>,
    // True once the current status has produced at least one message, so a
    // following status byte is a legitimate status change rather than an
    // interrupted message.
    emitted: bool,
    in_sysex: bool,
    sysex_len: usize,
}

impl Default for MidiDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiDecoder {
    pub fn new() -> Self {
        MidiDecoder {
            status: None,
            data: Vec::with_capacity(2),
            emitted: false,
            in_sysex: false,
            sysex_len: 0,
        }
    }

    /// Decodes a raw byte run, returning one entry per completed message or
    /// rejected run.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<MidiMessage>> {
        let mut out = Vec::new();
        for &byte in bytes {
            if byte >= 0xF8 {
                // Real-time bytes are transparent: they may interleave with
                // a message being reassembled.
                if let Some(msg) = decode_realtime(byte) {
                    out.push(Ok(msg));
                }
                continue;
            }
            if byte >= 0x80 {
                self.accept_status(byte, &mut out);
            } else {
                self.accept_data(byte, &mut out);
            }
        }
        out
    }

    fn accept_status(&mut self, byte: u8, out: &mut Vec<Result<MidiMessage>>) {
        if self.in_sysex {
            // Any status terminates a sysex run; 0xF7 is the normal end.
            self.in_sysex = false;
            self.sysex_len = 0;
            if byte == 0xF7 {
                return;
            }
        }
        if let Some(status) = self.status {
            let interrupted = !self.data.is_empty() || !self.emitted;
            if interrupted && is_supported(status) {
                out.push(Err(MidiError::MalformedMessage(format!(
                    "status {:#04x} interrupted by {:#04x} after {} of {} data bytes",
                    status,
                    byte,
                    self.data.len(),
                    data_len(status).unwrap_or(0),
                ))));
            }
            self.data.clear();
        }
        if byte == 0xF0 {
            self.in_sysex = true;
            self.status = None;
            return;
        }
        match data_len(byte) {
            Some(_) => {
                self.status = Some(byte);
                self.emitted = false;
            }
            // Undefined or zero-data statuses carry nothing we decode.
            None => {
                self.status = None;
                self.emitted = false;
            }
        }
    }

    fn accept_data(&mut self, byte: u8, out: &mut Vec<Result<MidiMessage>>) {
        if self.in_sysex {
            if self.sysex_len < SYSEX_LIMIT {
                self.sysex_len += 1;
            } else if self.sysex_len == SYSEX_LIMIT {
                // Bounded reassembly: report the oversized run once, then
                // stay in sysex so the rest of its body is discarded
                // silently until the next status byte.
                self.sysex_len += 1;
                out.push(Err(MidiError::MalformedMessage(format!(
                    "sysex run exceeded {} bytes",
                    SYSEX_LIMIT
                ))));
            }
            return;
        }
        let status = match self.status {
            Some(status) => status,
            None => {
                out.push(Err(MidiError::MalformedMessage(format!(
                    "stray data byte {:#04x} with no status in effect",
                    byte
                ))));
                return;
            }
        };
        self.data.push(byte);
        let needed = data_len(status).unwrap_or(0);
        if self.data.len() == needed {
            if let Some(msg) = assemble(status, &self.data) {
                out.push(Ok(msg));
            }
            self.data.clear();
            self.emitted = true;
            // System common messages do not establish running status.
            if status >= 0xF0 {
                self.status = None;
            }
        }
    }
}

/// Encodes a message back to its wire bytes; the exact inverse of decoding
/// for every in-range message. Data fields are masked to 7 bits so an
/// out-of-range value can never put a status byte in a data position.
pub fn encode(msg: &MidiMessage) -> Vec<u8> {
    match msg {
        MidiMessage::NoteOn {
            channel,
            note,
            velocity,
        } => vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
        MidiMessage::NoteOff {
            channel,
            note,
            velocity,
        } => vec![0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
        MidiMessage::ControlChange {
            channel,
            controller,
            value,
        } => vec![0xB0 | (channel & 0x0F), controller & 0x7F, value & 0x7F],
        MidiMessage::ChannelPressure { channel, value } => {
            vec![0xD0 | (channel & 0x0F), value & 0x7F]
        }
        MidiMessage::PitchBend { channel, value } => {
            let raw = (*value as i32 + 8192) as u16;
            vec![
                0xE0 | (channel & 0x0F),
                (raw & 0x7F) as u8,
                ((raw >> 7) & 0x7F) as u8,
            ]
        }
        MidiMessage::Clock => vec![0xF8],
        MidiMessage::Start => vec![0xFA],
        MidiMessage::Continue => vec![0xFB],
        MidiMessage::Stop => vec![0xFC],
        MidiMessage::SongPositionPointer { value } => {
            vec![0xF2, (value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8]
        }
    }
}

fn decode_realtime(byte: u8) -> Option<MidiMessage> {
    match byte {
        0xF8 => Some(MidiMessage::Clock),
        0xFA => Some(MidiMessage::Start),
        0xFB => Some(MidiMessage::Continue),
        0xFC => Some(MidiMessage::Stop),
        // Active sensing, system reset and the undefined real-time bytes
        // carry nothing the engine acts on.
        _ => None,
    }
}

/// Number of data bytes the status expects, `None` for statuses with no
/// fixed-length body (sysex, undefined)
fn data_len(status: u8) -> Option<usize> {
    match status & 0xF0 {
        0x80 | 0x90 | 0xA0 | 0xB0 | 0xE0 => Some(2),
        0xC0 | 0xD0 => Some(1),
        0xF0 => match status {
            0xF1 | 0xF3 => Some(1),
            0xF2 => Some(2),
            _ => None,
        },
        _ => None,
    }
}

/// Whether the status decodes to a message the engine handles. Unsupported
/// statuses still have their data bytes consumed so the stream stays in
/// sync, but their interruption is not worth reporting.
fn is_supported(status: u8) -> bool {
    matches!(status & 0xF0, 0x80 | 0x90 | 0xB0 | 0xD0 | 0xE0) || status == 0xF2
}

fn assemble(status: u8, data: &[u8]) -> Option<MidiMessage> {
    let channel = status & 0x0F;
    match status & 0xF0 {
        0x90 => Some(MidiMessage::NoteOn {
            channel,
            note: data[0],
            velocity: data[1],
        }),
        0x80 => Some(MidiMessage::NoteOff {
            channel,
            note: data[0],
            velocity: data[1],
        }),
        0xB0 => Some(MidiMessage::ControlChange {
            channel,
            controller: data[0],
            value: data[1],
        }),
        0xD0 => Some(MidiMessage::ChannelPressure {
            channel,
            value: data[0],
        }),
        0xE0 => Some(MidiMessage::PitchBend {
            channel,
            value: combine_14bit(data[0], data[1]) as i16 - 8192,
        }),
        0xF0 if status == 0xF2 => Some(MidiMessage::SongPositionPointer {
            value: combine_14bit(data[0], data[1]),
        }),
        // Poly pressure, program change, quarter frame, song select: valid
        // on the wire but outside the engine's event set.
        _ => None,
    }
}

fn combine_14bit(lsb: u8, msb: u8) -> u16 {
    (lsb as u16) | ((msb as u16) << 7)
}
