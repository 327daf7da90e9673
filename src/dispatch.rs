//! Event dispatcher: the single-threaded heart of the engine.
//!
//! Every decoded input event is submitted here. The dispatcher updates the
//! clock and active-note state, runs the event through each pipeline stage
//! in order, sends immediate emissions straight to the output sink and
//! parks delayed ones in the [`DelayQueue`]. Output ordering is exactly
//! production order; nothing is reordered between submission and send.

use std::time::Instant;

use log::{debug, warn};

use crate::midi::{encode, MidiError, MidiMessage, OutputSink, Result};
use crate::pipeline::{Stage, StageAction, StageContext};
use crate::scheduler::DelayQueue;
use crate::state::{ActiveNotes, ClockState};

pub struct Dispatcher {
    stages: Vec<Box<dyn Stage>>,
    sink: Option<Box<dyn OutputSink>>,
    clock: ClockState,
    active: ActiveNotes,
    queue: DelayQueue,
}

impl Dispatcher {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Dispatcher {
            stages,
            sink: None,
            clock: ClockState::new(),
            active: ActiveNotes::new(),
            queue: DelayQueue::new(),
        }
    }

    /// Attaches an output destination. Any previous destination is first
    /// silenced and torn down.
    pub fn select_destination(&mut self, sink: Box<dyn OutputSink>) {
        if self.sink.is_some() {
            self.deselect_destination();
        }
        self.sink = Some(sink);
    }

    /// Silences and detaches the current destination: pending delayed
    /// emissions are revoked, every active note gets a note-off, and the
    /// stages drop their per-note state.
    pub fn deselect_destination(&mut self) {
        self.all_notes_off();
        self.sink = None;
    }

    pub fn has_destination(&self) -> bool {
        self.sink.is_some()
    }

    pub fn clock(&self) -> &ClockState {
        &self.clock
    }

    pub fn active_notes(&self) -> &ActiveNotes {
        &self.active
    }

    /// Fire time of the earliest pending delayed emission
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.queue.next_deadline()
    }

    /// Submits one decoded input event at the current time
    pub fn submit(&mut self, message: MidiMessage) -> Result<()> {
        self.submit_at(message, Instant::now())
    }

    /// Submits one decoded input event as of `now`. Clock and transport
    /// state are updated before the stages run, so a stage observing the
    /// clock through [`StageContext`] sees the event already applied.
    pub fn submit_at(&mut self, message: MidiMessage, now: Instant) -> Result<()> {
        self.update_clock(&message);

        let mut result = Ok(());
        for index in 0..self.stages.len() {
            let ctx = StageContext {
                clock: &self.clock,
                active: &self.active,
            };
            let actions = self.stages[index].process(&message, &ctx);
            for action in actions {
                match action {
                    StageAction::Emit(out) => {
                        if let Err(err) = self.send_now(&out) {
                            result = Err(err);
                        }
                    }
                    StageAction::EmitDelayed {
                        message: out,
                        delay,
                        group,
                    } => {
                        if delay.is_zero() {
                            if let Err(err) = self.send_now(&out) {
                                result = Err(err);
                            }
                        } else {
                            let group = group.map(|(channel, note)| (index, channel, note));
                            self.queue.schedule_at(now + delay, out, group);
                        }
                    }
                    StageAction::CancelGroup { channel, note } => {
                        self.queue.cancel_group((index, channel, note));
                    }
                }
            }
        }
        result
    }

    /// Sends every delayed emission due at or before `now`
    pub fn pump(&mut self, now: Instant) -> Result<()> {
        let mut result = Ok(());
        while let Some(message) = self.queue.pop_due(now) {
            if let Err(err) = self.send_now(&message) {
                result = Err(err);
            }
        }
        result
    }

    /// Revokes all pending delayed emissions, releases every sounding note
    /// at the destination and resets stage state. Safe to call with no
    /// destination attached.
    pub fn all_notes_off(&mut self) {
        self.queue.cancel_all();
        for stage in &mut self.stages {
            stage.reset();
        }
        for (channel, note) in self.active.drain_all() {
            let off = MidiMessage::NoteOff {
                channel,
                note,
                velocity: 0,
            };
            // send_now detaches a lost sink, turning the remaining
            // releases into silent no-ops.
            if let Err(err) = self.send_now(&off) {
                warn!("Failed to release note {} on teardown: {}", note, err);
            }
        }
    }

    fn update_clock(&mut self, message: &MidiMessage) {
        match message {
            MidiMessage::Clock => self.clock.tick(),
            MidiMessage::Start => self.clock.start(),
            MidiMessage::Stop => self.clock.stop(),
            MidiMessage::Continue => self.clock.resume(),
            MidiMessage::SongPositionPointer { value } => self.clock.set_song_position(*value),
            _ => {}
        }
    }

    /// Sends one message to the destination, keeping the active-note set in
    /// step with what was actually put on the wire. With no destination
    /// attached this is a silent no-op, so stages never need to know
    /// whether an output is connected.
    fn send_now(&mut self, message: &MidiMessage) -> Result<()> {
        let sink = match self.sink.as_mut() {
            Some(sink) => sink,
            None => return Ok(()),
        };
        match sink.send(&encode(message)) {
            Ok(()) => {
                match *message {
                    MidiMessage::NoteOn { channel, note, .. } => {
                        self.active.note_on(channel, note);
                    }
                    MidiMessage::NoteOff { channel, note, .. } => {
                        self.active.note_off(channel, note);
                    }
                    _ => {}
                }
                Ok(())
            }
            Err(MidiError::DeviceLost(reason)) => {
                warn!("Output device lost: {}", reason);
                self.sink = None;
                self.queue.cancel_all();
                for stage in &mut self.stages {
                    stage.reset();
                }
                self.active.drain_all();
                Err(MidiError::DeviceLost(reason))
            }
            Err(err) => {
                debug!("Send failed, continuing: {}", err);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::config::{PipelineMode, Settings};
    use crate::midi::{CaptureSink, MidiError, OutputSink};
    use crate::pipeline::build_stages;
    use crate::theory::{Scale, Voicing};

    /// Sink whose device disappears after a fixed number of sends
    struct DyingSink {
        sends_left: usize,
    }

    impl OutputSink for DyingSink {
        fn send(&mut self, _bytes: &[u8]) -> crate::midi::Result<()> {
            if self.sends_left == 0 {
                return Err(MidiError::DeviceLost("gone".to_string()));
            }
            self.sends_left -= 1;
            Ok(())
        }
    }

    fn chord_settings() -> Settings {
        Settings {
            scale: Scale::parse("C_major").unwrap(),
            voicing: Voicing::Root,
            mode: PipelineMode::Chord,
            stagger: Duration::from_millis(50),
            echo: Duration::from_millis(500),
        }
    }

    fn note_on(note: u8) -> MidiMessage {
        MidiMessage::NoteOn {
            channel: 0,
            note,
            velocity: 100,
        }
    }

    fn note_off(note: u8) -> MidiMessage {
        MidiMessage::NoteOff {
            channel: 0,
            note,
            velocity: 0,
        }
    }

    #[test]
    fn test_no_destination_is_silent_noop() {
        let mut dispatcher = Dispatcher::new(build_stages(&chord_settings()));
        assert!(dispatcher.submit(note_on(60)).is_ok());
        assert!(dispatcher.active_notes().is_empty());
    }

    #[test]
    fn test_staggered_chord_fires_in_order() {
        let sink = CaptureSink::new();
        let sent = sink.sent();
        let mut dispatcher = Dispatcher::new(build_stages(&chord_settings()));
        dispatcher.select_destination(Box::new(sink));

        let t0 = Instant::now();
        dispatcher.submit_at(note_on(60), t0).unwrap();
        // Root fires immediately, the rest wait.
        assert_eq!(sent.lock().unwrap().len(), 1);

        dispatcher.pump(t0 + Duration::from_millis(100)).unwrap();
        assert_eq!(sent.lock().unwrap().len(), 3);

        dispatcher.pump(t0 + Duration::from_millis(150)).unwrap();
        let runs = sent.lock().unwrap().clone();
        let notes: Vec<u8> = runs.iter().map(|bytes| bytes[1]).collect();
        assert_eq!(notes, vec![60, 64, 67, 71]);
        assert_eq!(dispatcher.active_notes().len(), 4);
    }

    #[test]
    fn test_release_before_strum_finishes_cancels_tail() {
        let sink = CaptureSink::new();
        let sent = sink.sent();
        let mut dispatcher = Dispatcher::new(build_stages(&chord_settings()));
        dispatcher.select_destination(Box::new(sink));

        let t0 = Instant::now();
        dispatcher.submit_at(note_on(60), t0).unwrap();
        dispatcher
            .pump(t0 + Duration::from_millis(60))
            .unwrap(); // 60 and 64 have sounded
        dispatcher
            .submit_at(note_off(60), t0 + Duration::from_millis(70))
            .unwrap();
        dispatcher.pump(t0 + Duration::from_millis(300)).unwrap();

        // Nothing left sounding, nothing left pending.
        assert!(dispatcher.active_notes().is_empty());
        assert_eq!(dispatcher.next_deadline(), None);
        // 67 and 71 never fired: 2 ons + 4 offs.
        assert_eq!(sent.lock().unwrap().len(), 6);
    }

    #[test]
    fn test_clock_messages_update_transport() {
        let mut dispatcher = Dispatcher::new(build_stages(&chord_settings()));
        dispatcher.submit(MidiMessage::Start).unwrap();
        for _ in 0..25 {
            dispatcher.submit(MidiMessage::Clock).unwrap();
        }
        assert!(dispatcher.clock().is_running());
        assert_eq!(dispatcher.clock().quarter_notes(), 1);

        dispatcher
            .submit(MidiMessage::SongPositionPointer { value: 16 })
            .unwrap();
        assert_eq!(dispatcher.clock().song_position(), 16);
    }

    #[test]
    fn test_sink_lost_during_teardown_is_detached() {
        let mut dispatcher = Dispatcher::new(build_stages(&Settings {
            mode: PipelineMode::Through,
            ..chord_settings()
        }));
        // Survives the two note-ons, dies on the first teardown release.
        dispatcher.select_destination(Box::new(DyingSink { sends_left: 2 }));
        dispatcher.submit(note_on(60)).unwrap();
        dispatcher.submit(note_on(62)).unwrap();
        assert_eq!(dispatcher.active_notes().len(), 2);

        dispatcher.all_notes_off();
        assert!(!dispatcher.has_destination());
        assert!(dispatcher.active_notes().is_empty());
    }

    #[test]
    fn test_deselect_releases_everything() {
        let sink = CaptureSink::new();
        let sent = sink.sent();
        let mut dispatcher = Dispatcher::new(build_stages(&chord_settings()));
        dispatcher.select_destination(Box::new(sink));

        let t0 = Instant::now();
        dispatcher.submit_at(note_on(60), t0).unwrap();
        dispatcher.pump(t0 + Duration::from_millis(200)).unwrap();
        assert_eq!(dispatcher.active_notes().len(), 4);

        dispatcher.deselect_destination();
        assert!(dispatcher.active_notes().is_empty());
        assert!(!dispatcher.has_destination());
        // 4 ons + 4 offs went to the old destination.
        assert_eq!(sent.lock().unwrap().len(), 8);
    }
}
