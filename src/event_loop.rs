//! The engine's main loop: bridges raw device bytes into the dispatcher.
//!
//! Runs on one thread. Blocks on the input channel with a timeout derived
//! from the scheduler's next deadline, so delayed emissions fire on time
//! even when the device goes quiet, and pumps due emissions after every
//! wakeup.

use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, RecvTimeoutError};
use log::{info, warn};

use crate::dispatch::Dispatcher;
use crate::midi::MidiDecoder;

/// How long to sleep when nothing is scheduled
const IDLE_POLL: Duration = Duration::from_millis(100);

pub fn run_event_loop(dispatcher: &mut Dispatcher, rx: Receiver<Vec<u8>>) {
    let mut decoder = MidiDecoder::new();

    loop {
        let timeout = dispatcher
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(IDLE_POLL);

        match rx.recv_timeout(timeout) {
            Ok(bytes) => {
                for decoded in decoder.feed(&bytes) {
                    match decoded {
                        Ok(message) => {
                            if let Err(err) = dispatcher.submit(message) {
                                warn!("Dispatch failed: {}", err);
                            }
                        }
                        Err(err) => {
                            warn!("Dropped undecodable input: {}", err);
                        }
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                info!("Input stream closed, silencing destination");
                dispatcher.all_notes_off();
                break;
            }
        }

        if let Err(err) = dispatcher.pump(Instant::now()) {
            warn!("Delayed emission failed: {}", err);
        }
    }
}
