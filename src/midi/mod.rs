//! MIDI functionality for Noteflux
//!
//! This module provides the wire-level MIDI layer, including:
//! - Core MIDI message types and error handling
//! - A stateful byte codec with running-status support
//! - Real MIDI device communication via midir
//! - Mock implementations for testing
//!
//! The main components are:
//! - [`MidiMessage`] typed events and [`MidiError`]
//! - [`MidiDecoder`] and [`encode`] for the wire codec
//! - [`MidiEngine`] and [`OutputSink`] traits at the device boundary
//! - [`MidirEngine`] / [`MidirSink`] for real devices
//! - [`MockMidiEngine`] / [`CaptureSink`] for testing
//!
pub mod codec;
mod engine;
mod message;
pub mod midir_engine;
pub mod mock_engine;

// Re-export main types
pub use codec::{encode, MidiDecoder};
pub use engine::{MidiEngine, MidiError, OutputSink, Result};
pub use message::MidiMessage;

// Re-export concrete implementations
pub use midir_engine::{MidirEngine, MidirSink};
pub use mock_engine::{CaptureSink, FailingSink, MockMidiEngine};

// Set default engine type
pub type DefaultMidiEngine = MidirEngine;
