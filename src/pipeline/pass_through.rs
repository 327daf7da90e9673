use super::{Stage, StageAction, StageContext};
use crate::midi::MidiMessage;

/// Minimal input-to-output bridge.
///
/// In notes-only mode it forwards `NoteOn`/`NoteOff` and drops everything
/// else; in all-events mode it forwards every decoded message unchanged.
pub struct PassThrough {
    notes_only: bool,
}

impl PassThrough {
    pub fn notes_only() -> Self {
        PassThrough { notes_only: true }
    }

    pub fn all_events() -> Self {
        PassThrough { notes_only: false }
    }
}

impl Stage for PassThrough {
    fn process(&mut self, message: &MidiMessage, _ctx: &StageContext) -> Vec<StageAction> {
        if self.notes_only && !message.is_note() {
            return Vec::new();
        }
        vec![StageAction::Emit(message.clone())]
    }
}
