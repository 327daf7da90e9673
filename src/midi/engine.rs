use std::error::Error;
use std::fmt;

/// Custom error type for MIDI operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiError {
    /// A byte run that could not be decoded; the offending run is dropped
    /// and decoding resynchronizes on the next status byte
    MalformedMessage(String),
    /// An input or output device disappeared mid-session
    DeviceLost(String),
    /// Error when sending a MIDI message
    SendError(String),
    /// Error when connecting to a MIDI device
    ConnectionError(String),
}

impl fmt::Display for MidiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidiError::MalformedMessage(msg) => write!(f, "malformed MIDI message: {}", msg),
            MidiError::DeviceLost(msg) => write!(f, "MIDI device lost: {}", msg),
            MidiError::SendError(msg) => write!(f, "MIDI send error: {}", msg),
            MidiError::ConnectionError(msg) => write!(f, "MIDI connection error: {}", msg),
        }
    }
}

impl Error for MidiError {}

/// Result type for MIDI operations
pub type Result<T> = std::result::Result<T, MidiError>;

/// Trait defining the interface for a MIDI input source.
///
/// Implementations deliver raw byte runs exactly as the device handed them
/// over; decoding happens downstream so that partial and interleaved
/// delivery is handled in one place.
pub trait MidiEngine: Send {
    /// Blocks until the next raw byte run arrives from the device
    fn recv(&mut self) -> Result<Vec<u8>>;

    /// Lists the input devices this engine can see
    fn list_devices(&self) -> Vec<String>;
}

/// Trait defining the interface for an output destination.
pub trait OutputSink: Send {
    /// Sends an encoded byte run to the destination
    fn send(&mut self, bytes: &[u8]) -> Result<()>;
}
