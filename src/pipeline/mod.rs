//! Transform pipeline: ordered stages subscribing to decoded events.
//!
//! Every stage sees each decoded input event and produces zero or more
//! actions: immediate emissions, delayed emissions, or cancellations of
//! its own pending delayed emissions. Stages read engine state through
//! [`StageContext`] and never submit events themselves, so processing one
//! input can never re-enter the dispatcher.

mod chord;
mod echo;
mod pass_through;

pub use chord::ChordStage;
pub use echo::EchoStage;
pub use pass_through::PassThrough;

use std::time::Duration;

use crate::config::{PipelineMode, Settings};
use crate::midi::MidiMessage;
use crate::state::{ActiveNotes, ClockState};

/// Read access to engine state during stage processing
pub struct StageContext<'a> {
    pub clock: &'a ClockState,
    pub active: &'a ActiveNotes,
}

/// One output of a stage for a single input event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageAction {
    /// Send now, in production order
    Emit(MidiMessage),
    /// Send after `delay`; `group` tags the emission with the originating
    /// `(channel, note)` so the stage can cancel it later
    EmitDelayed {
        message: MidiMessage,
        delay: Duration,
        group: Option<(u8, u8)>,
    },
    /// Revoke this stage's pending delayed emissions for one held note
    CancelGroup { channel: u8, note: u8 },
}

/// A pipeline stage. Stages are stateful (held chords, pending echoes) and
/// are reset when the destination is torn down.
pub trait Stage: Send {
    fn process(&mut self, message: &MidiMessage, ctx: &StageContext) -> Vec<StageAction>;

    /// Drops any per-note state; called alongside `all_notes_off`
    fn reset(&mut self) {}
}

/// Builds the stage list for the configured pipeline mode
pub fn build_stages(settings: &Settings) -> Vec<Box<dyn Stage>> {
    match settings.mode {
        PipelineMode::Through => vec![Box::new(PassThrough::notes_only())],
        PipelineMode::ThroughAll => vec![Box::new(PassThrough::all_events())],
        PipelineMode::Chord => vec![Box::new(ChordStage::new(
            settings.scale,
            settings.voicing,
            settings.stagger,
        ))],
        PipelineMode::ChordEcho => vec![
            Box::new(ChordStage::new(
                settings.scale,
                settings.voicing,
                settings.stagger,
            )),
            Box::new(EchoStage::new(settings.scale, settings.echo)),
        ],
    }
}
