//! Per-destination musical state: the active-note set and the clock.

use std::collections::BTreeSet;

/// Set of `(channel, note)` pairs currently sounding at one destination.
///
/// Every note-on the engine forwards is recorded here so the destination
/// can always be silenced, even if a transformation is interrupted halfway.
#[derive(Debug, Default)]
pub struct ActiveNotes {
    notes: BTreeSet<(u8, u8)>,
}

impl ActiveNotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a sounding note. Re-inserting an already-active pair is a
    /// no-op; duplicate logical note-ons must not corrupt the set.
    pub fn note_on(&mut self, channel: u8, note: u8) -> bool {
        self.notes.insert((channel, note))
    }

    /// Clears a note. Removing an absent pair is a no-op, not an error;
    /// external devices send spurious offs.
    pub fn note_off(&mut self, channel: u8, note: u8) -> bool {
        self.notes.remove(&(channel, note))
    }

    pub fn contains(&self, channel: u8, note: u8) -> bool {
        self.notes.contains(&(channel, note))
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Removes and returns every sounding pair in deterministic order, for
    /// emitting synthetic note-offs on teardown.
    pub fn drain_all(&mut self) -> Vec<(u8, u8)> {
        let drained: Vec<(u8, u8)> = self.notes.iter().copied().collect();
        self.notes.clear();
        drained
    }
}

/// Clock and transport position derived from incoming system messages.
#[derive(Debug, Default)]
pub struct ClockState {
    pulse_count: u64,
    running: bool,
    song_position: u16,
}

impl ClockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the pulse counter. 24 pulses make one quarter note. The
    /// counter advances whether or not the transport is running, matching
    /// how hardware clocks keep pulsing while stopped.
    pub fn tick(&mut self) {
        self.pulse_count += 1;
    }

    /// Start resets the pulse counter to zero and marks the transport
    /// running.
    pub fn start(&mut self) {
        self.pulse_count = 0;
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Continue also resets the visible pulse counter. Resuming from a
    /// remembered position would be defensible, but the devices this was
    /// built against reset their displayed count on Continue, so the
    /// engine does the same.
    pub fn resume(&mut self) {
        self.pulse_count = 0;
        self.running = true;
    }

    /// Stores the raw 14-bit song position value without rescaling.
    pub fn set_song_position(&mut self, value: u16) {
        self.song_position = value;
    }

    pub fn pulse_count(&self) -> u64 {
        self.pulse_count
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn song_position(&self) -> u16 {
        self.song_position
    }

    /// Whole quarter notes elapsed since the last Start/Continue
    pub fn quarter_notes(&self) -> u64 {
        self.pulse_count / crate::config::PULSES_PER_QUARTER_NOTE
    }
}
