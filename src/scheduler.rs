//! Delayed-emission scheduler.
//!
//! A priority queue keyed by fire time, decoupled from any platform timer:
//! the owner asks for the next deadline and pumps due entries itself.
//! Entries scheduled for the same instant fire in scheduling order.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::Instant;

use crate::midi::MidiMessage;

/// Handle for cancelling one scheduled emission
pub type Token = u64;

/// Cancellation group: `(stage index, channel, source note)`. Lets a stage
/// revoke every pending emission it scheduled for one held input note.
pub type Group = (usize, u8, u8);

struct Entry {
    fire_at: Instant,
    seq: u64,
    token: Token,
    message: MidiMessage,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fire_at
            .cmp(&other.fire_at)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Priority queue of delayed emissions with token and group cancellation.
///
/// Cancellation is lazy: cancelled entries stay in the heap as tombstones
/// and are discarded when they surface.
#[derive(Default)]
pub struct DelayQueue {
    heap: BinaryHeap<Reverse<Entry>>,
    live: HashSet<Token>,
    cancelled: HashSet<Token>,
    groups: HashMap<Group, Vec<Token>>,
    next_seq: u64,
}

impl DelayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a message to fire at `fire_at`; returns a cancellation token
    pub fn schedule_at(
        &mut self,
        fire_at: Instant,
        message: MidiMessage,
        group: Option<Group>,
    ) -> Token {
        let seq = self.next_seq;
        self.next_seq += 1;
        let token = seq;
        self.heap.push(Reverse(Entry {
            fire_at,
            seq,
            token,
            message,
        }));
        self.live.insert(token);
        if let Some(group) = group {
            self.groups.entry(group).or_default().push(token);
        }
        token
    }

    /// Revokes a not-yet-fired emission; cancelling a token that already
    /// fired is a no-op
    pub fn cancel(&mut self, token: Token) {
        if self.live.remove(&token) {
            self.cancelled.insert(token);
        }
    }

    /// Revokes every pending emission scheduled under the group
    pub fn cancel_group(&mut self, group: Group) {
        if let Some(tokens) = self.groups.remove(&group) {
            for token in tokens {
                self.cancel(token);
            }
        }
    }

    /// Revokes everything still pending
    pub fn cancel_all(&mut self) {
        let tokens: Vec<Token> = self.live.iter().copied().collect();
        for token in tokens {
            self.cancel(token);
        }
        self.groups.clear();
    }

    /// Pops the next emission due at or before `now`, skipping tombstones
    pub fn pop_due(&mut self, now: Instant) -> Option<MidiMessage> {
        loop {
            let head = self.heap.peek()?;
            if self.cancelled.contains(&head.0.token) {
                let entry = self.heap.pop().unwrap().0;
                self.cancelled.remove(&entry.token);
                continue;
            }
            if head.0.fire_at > now {
                return None;
            }
            let entry = self.heap.pop().unwrap().0;
            self.live.remove(&entry.token);
            return Some(entry.message);
        }
    }

    /// Fire time of the earliest pending emission
    pub fn next_deadline(&mut self) -> Option<Instant> {
        loop {
            let head = self.heap.peek()?;
            if self.cancelled.contains(&head.0.token) {
                let entry = self.heap.pop().unwrap().0;
                self.cancelled.remove(&entry.token);
                continue;
            }
            return Some(head.0.fire_at);
        }
    }

    /// Number of emissions still pending
    pub fn pending(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn note_on(note: u8) -> MidiMessage {
        MidiMessage::NoteOn {
            channel: 0,
            note,
            velocity: 100,
        }
    }

    #[test]
    fn test_equal_fire_times_preserve_scheduling_order() {
        let mut queue = DelayQueue::new();
        let at = Instant::now() + Duration::from_millis(10);
        queue.schedule_at(at, note_on(60), None);
        queue.schedule_at(at, note_on(64), None);
        queue.schedule_at(at, note_on(67), None);

        assert_eq!(queue.pop_due(at), Some(note_on(60)));
        assert_eq!(queue.pop_due(at), Some(note_on(64)));
        assert_eq!(queue.pop_due(at), Some(note_on(67)));
        assert_eq!(queue.pop_due(at), None);
    }

    #[test]
    fn test_nothing_fires_before_deadline() {
        let mut queue = DelayQueue::new();
        let now = Instant::now();
        queue.schedule_at(now + Duration::from_millis(50), note_on(60), None);
        assert_eq!(queue.pop_due(now), None);
        assert_eq!(queue.pending(), 1);
    }

    #[test]
    fn test_cancelled_token_never_fires() {
        let mut queue = DelayQueue::new();
        let now = Instant::now();
        let token = queue.schedule_at(now, note_on(60), None);
        queue.schedule_at(now, note_on(64), None);
        queue.cancel(token);

        assert_eq!(queue.pop_due(now), Some(note_on(64)));
        assert_eq!(queue.pop_due(now), None);
    }

    #[test]
    fn test_group_cancellation_leaves_other_groups() {
        let mut queue = DelayQueue::new();
        let now = Instant::now();
        queue.schedule_at(now, note_on(64), Some((0, 0, 60)));
        queue.schedule_at(now, note_on(67), Some((0, 0, 60)));
        queue.schedule_at(now, note_on(74), Some((1, 0, 60)));
        queue.cancel_group((0, 0, 60));

        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.pop_due(now), Some(note_on(74)));
    }

    #[test]
    fn test_next_deadline_skips_tombstones() {
        let mut queue = DelayQueue::new();
        let now = Instant::now();
        let early = now + Duration::from_millis(10);
        let late = now + Duration::from_millis(20);
        let token = queue.schedule_at(early, note_on(60), None);
        queue.schedule_at(late, note_on(64), None);
        queue.cancel(token);

        assert_eq!(queue.next_deadline(), Some(late));
    }

    #[test]
    fn test_cancel_all_empties_queue() {
        let mut queue = DelayQueue::new();
        let now = Instant::now();
        queue.schedule_at(now, note_on(60), Some((0, 0, 60)));
        queue.schedule_at(now, note_on(64), None);
        queue.cancel_all();

        assert_eq!(queue.pending(), 0);
        assert_eq!(queue.pop_due(now), None);
    }
}
