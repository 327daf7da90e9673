use std::collections::HashMap;
use std::time::Duration;

use super::{Stage, StageAction, StageContext};
use crate::midi::MidiMessage;
use crate::theory::{expand_chord, Scale, Voicing, DOMINANT_SEVENTH};

/// Expands each incoming note into a chord, optionally strummed.
///
/// Trigger notes whose pitch class is in the active scale get the
/// configured voicing with every chord tone conformed to the scale.
/// Out-of-key triggers get a dominant seventh built straight off the
/// trigger, unquantized. The first chord tone sounds immediately and each
/// later tone is staggered by one more stagger interval, so a 50ms stagger
/// plays the tones 50ms apart in voicing order.
///
/// The exact tones sent for each held input note are remembered so the
/// matching note-off releases precisely what was turned on, even if the
/// scale or voicing changed while the note was held.
pub struct ChordStage {
    scale: Scale,
    voicing: Voicing,
    stagger: Duration,
    held: HashMap<(u8, u8), Vec<u8>>,
}

impl ChordStage {
    pub fn new(scale: Scale, voicing: Voicing, stagger: Duration) -> Self {
        ChordStage {
            scale,
            voicing,
            stagger,
            held: HashMap::new(),
        }
    }

    fn chord_tones(&self, note: u8) -> Vec<u8> {
        let tones = if self.scale.contains(note) {
            expand_chord(note, self.voicing.intervals())
                .into_iter()
                .map(|tone| self.scale.quantize(tone))
                .collect()
        } else {
            expand_chord(note, &DOMINANT_SEVENTH)
        };
        // Conforming can collapse neighboring intervals onto one pitch;
        // keep the first occurrence so no tone is double-triggered.
        let mut deduped = Vec::with_capacity(tones.len());
        for tone in tones {
            if !deduped.contains(&tone) {
                deduped.push(tone);
            }
        }
        deduped
    }
}

impl Stage for ChordStage {
    fn process(&mut self, message: &MidiMessage, _ctx: &StageContext) -> Vec<StageAction> {
        match *message {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => {
                let tones = self.chord_tones(note);
                self.held.insert((channel, note), tones.clone());
                tones
                    .into_iter()
                    .enumerate()
                    .map(|(index, tone)| {
                        let chord_note = MidiMessage::NoteOn {
                            channel,
                            note: tone,
                            velocity,
                        };
                        if index == 0 || self.stagger.is_zero() {
                            StageAction::Emit(chord_note)
                        } else {
                            StageAction::EmitDelayed {
                                message: chord_note,
                                delay: self.stagger * index as u32,
                                group: Some((channel, note)),
                            }
                        }
                    })
                    .collect()
            }
            MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            } => {
                let tones = self
                    .held
                    .remove(&(channel, note))
                    .unwrap_or_else(|| self.chord_tones(note));
                let mut actions = vec![StageAction::CancelGroup { channel, note }];
                actions.extend(tones.into_iter().map(|tone| {
                    StageAction::Emit(MidiMessage::NoteOff {
                        channel,
                        note: tone,
                        velocity,
                    })
                }));
                actions
            }
            _ => Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.held.clear();
    }
}
