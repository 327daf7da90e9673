use std::sync::mpsc::{channel, Receiver};

use midir::{Ignore, MidiInput, MidiOutput, MidiOutputConnection};

use super::engine::{MidiEngine, MidiError, OutputSink, Result};

/// Real MIDI input backed by midir.
///
/// The midir callback runs on a platform thread; it forwards each raw byte
/// run over a channel and `recv` blocks on the other end. Bytes are handed
/// downstream untouched so the decoder sees exactly what the device sent,
/// partial runs and all.
pub struct MidirEngine {
    #[allow(dead_code)]
    input: midir::MidiInputConnection<()>,
    rx: Receiver<Vec<u8>>,
}

impl MidirEngine {
    /// Connects to the first input port whose name contains `device_name`
    pub fn new(device_name: &str) -> Result<Self> {
        let mut midi_in = MidiInput::new("notefluxrs-in")
            .map_err(|e| MidiError::ConnectionError(e.to_string()))?;
        midi_in.ignore(Ignore::None);

        let in_ports = midi_in.ports();
        let in_port = in_ports
            .iter()
            .find(|p| {
                midi_in
                    .port_name(p)
                    .unwrap_or_default()
                    .contains(device_name)
            })
            .ok_or_else(|| {
                MidiError::ConnectionError(format!("input device '{}' not found", device_name))
            })?;

        let (tx, rx) = channel();
        let input = midi_in
            .connect(
                in_port,
                "notefluxrs-input",
                move |_stamp, bytes, _| {
                    let _ = tx.send(bytes.to_vec());
                },
                (),
            )
            .map_err(|e| MidiError::ConnectionError(e.to_string()))?;

        Ok(MidirEngine { input, rx })
    }

    pub fn list_input_devices() -> Vec<String> {
        let mut devices = Vec::new();

        if let Ok(midi_in) = MidiInput::new("notefluxrs-list") {
            for port in midi_in.ports() {
                if let Ok(name) = midi_in.port_name(&port) {
                    devices.push(name);
                }
            }
        }

        devices
    }

    pub fn list_output_devices() -> Vec<String> {
        let mut devices = Vec::new();

        if let Ok(midi_out) = MidiOutput::new("notefluxrs-list") {
            for port in midi_out.ports() {
                if let Ok(name) = midi_out.port_name(&port) {
                    devices.push(name);
                }
            }
        }

        devices
    }
}

impl MidiEngine for MidirEngine {
    fn recv(&mut self) -> Result<Vec<u8>> {
        self.rx
            .recv()
            .map_err(|_| MidiError::DeviceLost("input connection closed".to_string()))
    }

    fn list_devices(&self) -> Vec<String> {
        Self::list_input_devices()
    }
}

/// Real MIDI output backed by midir.
pub struct MidirSink {
    output: MidiOutputConnection,
}

impl MidirSink {
    /// Connects to the first output port whose name contains `device_name`
    pub fn new(device_name: &str) -> Result<Self> {
        let midi_out = MidiOutput::new("notefluxrs-out")
            .map_err(|e| MidiError::ConnectionError(e.to_string()))?;

        let out_ports = midi_out.ports();
        let out_port = out_ports
            .iter()
            .find(|p| {
                midi_out
                    .port_name(p)
                    .unwrap_or_default()
                    .contains(device_name)
            })
            .ok_or_else(|| {
                MidiError::ConnectionError(format!("output device '{}' not found", device_name))
            })?;

        let output = midi_out
            .connect(out_port, "notefluxrs-output")
            .map_err(|e| MidiError::ConnectionError(e.to_string()))?;

        Ok(MidirSink { output })
    }
}

impl OutputSink for MidirSink {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.output
            .send(bytes)
            .map_err(|e| MidiError::SendError(e.to_string()))
    }
}
