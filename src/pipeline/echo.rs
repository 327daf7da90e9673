use std::collections::HashMap;
use std::time::Duration;

use super::{Stage, StageAction, StageContext};
use crate::midi::MidiMessage;
use crate::theory::Scale;

/// Interval the echoed note is transposed by (a perfect fifth up)
const ECHO_INTERVAL: u8 = 7;

/// Adds a delayed, transposed echo to every note.
///
/// Each note-on schedules a second note-on a fifth up, conformed to the
/// scale, after the echo delay. The echoed pitch is remembered per held
/// input note; its note-off is scheduled with the same delay when the
/// input note is released, so the off always lands after the echoed on —
/// even when the release arrives before the echo has fired.
pub struct EchoStage {
    scale: Scale,
    delay: Duration,
    held: HashMap<(u8, u8), u8>,
}

impl EchoStage {
    pub fn new(scale: Scale, delay: Duration) -> Self {
        EchoStage {
            scale,
            delay,
            held: HashMap::new(),
        }
    }

    fn echoed_pitch(&self, note: u8) -> u8 {
        let raised = (note as u16 + ECHO_INTERVAL as u16).min(127) as u8;
        self.scale.quantize(raised)
    }
}

impl Stage for EchoStage {
    fn process(&mut self, message: &MidiMessage, _ctx: &StageContext) -> Vec<StageAction> {
        match *message {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => {
                let echoed = self.echoed_pitch(note);
                self.held.insert((channel, note), echoed);
                vec![StageAction::EmitDelayed {
                    message: MidiMessage::NoteOn {
                        channel,
                        note: echoed,
                        velocity,
                    },
                    delay: self.delay,
                    group: None,
                }]
            }
            MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            } => {
                let echoed = match self.held.remove(&(channel, note)) {
                    Some(echoed) => echoed,
                    None => return Vec::new(),
                };
                vec![StageAction::EmitDelayed {
                    message: MidiMessage::NoteOff {
                        channel,
                        note: echoed,
                        velocity,
                    },
                    delay: self.delay,
                    group: None,
                }]
            }
            _ => Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.held.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ActiveNotes, ClockState};

    fn process(stage: &mut EchoStage, message: MidiMessage) -> Vec<StageAction> {
        let clock = ClockState::new();
        let active = ActiveNotes::new();
        stage.process(&message, &StageContext {
            clock: &clock,
            active: &active,
        })
    }

    #[test]
    fn test_echo_is_transposed_and_conformed() {
        let mut stage = EchoStage::new(
            Scale::parse("C_major").unwrap(),
            Duration::from_millis(500),
        );
        let actions = process(
            &mut stage,
            MidiMessage::NoteOn {
                channel: 0,
                note: 59,
                velocity: 80,
            },
        );
        // 59 + 7 = 66 (F#), conformed down to 65 (F)
        assert_eq!(
            actions,
            vec![StageAction::EmitDelayed {
                message: MidiMessage::NoteOn {
                    channel: 0,
                    note: 65,
                    velocity: 80
                },
                delay: Duration::from_millis(500),
                group: None,
            }]
        );
    }

    #[test]
    fn test_release_targets_remembered_echo_pitch() {
        let mut stage = EchoStage::new(
            Scale::parse("C_major").unwrap(),
            Duration::from_millis(500),
        );
        process(
            &mut stage,
            MidiMessage::NoteOn {
                channel: 1,
                note: 60,
                velocity: 100,
            },
        );
        let actions = process(
            &mut stage,
            MidiMessage::NoteOff {
                channel: 1,
                note: 60,
                velocity: 0,
            },
        );
        assert_eq!(
            actions,
            vec![StageAction::EmitDelayed {
                message: MidiMessage::NoteOff {
                    channel: 1,
                    note: 67,
                    velocity: 0
                },
                delay: Duration::from_millis(500),
                group: None,
            }]
        );
    }

    #[test]
    fn test_off_without_on_is_silent() {
        let mut stage = EchoStage::new(
            Scale::parse("C_major").unwrap(),
            Duration::from_millis(500),
        );
        let actions = process(
            &mut stage,
            MidiMessage::NoteOff {
                channel: 0,
                note: 60,
                velocity: 0,
            },
        );
        assert!(actions.is_empty());
    }
}
