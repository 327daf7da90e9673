use notefluxrs::state::{ActiveNotes, ClockState};

#[test]
fn test_duplicate_note_on_is_idempotent() {
    let mut notes = ActiveNotes::new();
    assert!(notes.note_on(0, 60));
    assert!(!notes.note_on(0, 60));
    assert_eq!(notes.len(), 1);
}

#[test]
fn test_spurious_note_off_is_harmless() {
    let mut notes = ActiveNotes::new();
    assert!(!notes.note_off(0, 60));
    assert!(notes.is_empty());
}

#[test]
fn test_same_note_on_different_channels_is_distinct() {
    let mut notes = ActiveNotes::new();
    notes.note_on(0, 60);
    notes.note_on(1, 60);
    assert_eq!(notes.len(), 2);

    notes.note_off(0, 60);
    assert!(!notes.contains(0, 60));
    assert!(notes.contains(1, 60));
}

#[test]
fn test_drain_returns_everything_in_order() {
    let mut notes = ActiveNotes::new();
    notes.note_on(1, 64);
    notes.note_on(0, 72);
    notes.note_on(0, 60);

    assert_eq!(notes.drain_all(), vec![(0, 60), (0, 72), (1, 64)]);
    assert!(notes.is_empty());
}

#[test]
fn test_clock_counts_quarter_notes() {
    let mut clock = ClockState::new();
    clock.start();
    for _ in 0..48 {
        clock.tick();
    }
    assert_eq!(clock.pulse_count(), 48);
    assert_eq!(clock.quarter_notes(), 2);
}

#[test]
fn test_start_resets_the_counter() {
    let mut clock = ClockState::new();
    for _ in 0..10 {
        clock.tick();
    }
    clock.start();
    assert_eq!(clock.pulse_count(), 0);
    assert!(clock.is_running());
}

#[test]
fn test_continue_also_resets_the_counter() {
    let mut clock = ClockState::new();
    clock.start();
    for _ in 0..10 {
        clock.tick();
    }
    clock.stop();
    assert!(!clock.is_running());

    clock.resume();
    assert!(clock.is_running());
    assert_eq!(clock.pulse_count(), 0);
}

#[test]
fn test_ticks_advance_while_stopped() {
    let mut clock = ClockState::new();
    clock.stop();
    clock.tick();
    clock.tick();
    assert_eq!(clock.pulse_count(), 2);
    assert!(!clock.is_running());
}

#[test]
fn test_song_position_is_stored_raw() {
    let mut clock = ClockState::new();
    clock.set_song_position(16);
    assert_eq!(clock.song_position(), 16);
}
