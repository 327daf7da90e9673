//! Mock MIDI endpoints for testing without hardware.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::engine::{MidiEngine, MidiError, OutputSink, Result};

/// Mock input engine that replays scripted byte runs.
///
/// Each call to `recv` returns the next scripted run; once the script is
/// exhausted the engine reports the device as lost, which lets tests drive
/// the event loop to a clean shutdown.
pub struct MockMidiEngine {
    runs: VecDeque<Vec<u8>>,
}

impl MockMidiEngine {
    pub fn new(runs: Vec<Vec<u8>>) -> Self {
        MockMidiEngine {
            runs: runs.into(),
        }
    }
}

impl MidiEngine for MockMidiEngine {
    fn recv(&mut self) -> Result<Vec<u8>> {
        self.runs
            .pop_front()
            .ok_or_else(|| MidiError::DeviceLost("mock input exhausted".to_string()))
    }

    fn list_devices(&self) -> Vec<String> {
        vec!["Mock Device".to_string()]
    }
}

/// Output sink that records every byte run it is asked to send.
///
/// The log is shared: clone the handle from [`CaptureSink::sent`] before
/// boxing the sink and inspect it after the fact.
pub struct CaptureSink {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        CaptureSink {
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn sent(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
        Arc::clone(&self.sent)
    }
}

impl Default for CaptureSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for CaptureSink {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.sent
            .lock()
            .map_err(|_| MidiError::SendError("capture log poisoned".to_string()))?
            .push(bytes.to_vec());
        Ok(())
    }
}

/// Output sink whose device is already gone; every send fails.
pub struct FailingSink;

impl OutputSink for FailingSink {
    fn send(&mut self, _bytes: &[u8]) -> Result<()> {
        Err(MidiError::DeviceLost("mock output unplugged".to_string()))
    }
}
