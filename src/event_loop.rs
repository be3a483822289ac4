// The main loop, and the run flag it shares with the asynchronous handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_derive::{Deserialize, Serialize};

/// Process-wide "keep running" flag.
///
/// Only ever moves from running to stopped: there is deliberately no way to
/// set it back, so concurrent writers can only ever agree.
#[derive(Debug)]
pub struct RunFlag(AtomicBool);

impl RunFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(true))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Stop the loop.  Returns true if this call did the stopping.
    pub fn stop(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// The flag used by the Win32 callbacks, which carry no user data.
pub static RUNNING: RunFlag = RunFlag::new();

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum PollMode {
    /// Re-poll the queue immediately.  Spins a core.
    Busy,
    /// Block for up to `timeout_ms` when the queue is empty.  The timeout bounds
    /// how long a stop from the control handler can go unnoticed.
    Wait { timeout_ms: u32 },
}

impl Default for PollMode {
    fn default() -> Self {
        PollMode::Wait { timeout_ms: 50 }
    }
}

/// A native message queue.
pub trait MessagePump {
    type Message;

    /// Remove the next pending message, if any, without blocking.
    fn peek(&mut self) -> Option<Self::Message>;

    fn is_quit(&self, message: &Self::Message) -> bool;

    /// Translate and dispatch a message to its window.
    fn dispatch(&mut self, message: Self::Message);

    /// Block until a message arrives or `timeout` elapses.
    fn wait(&mut self, timeout: Duration);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    pub polls: u64,
    pub dispatched: u64,
    pub quit: bool,
}

/// Drain `pump` until `flag` is cleared or a quit message arrives.
///
/// The flag is checked before every dispatch, so nothing further reaches the
/// window once something has asked to stop.
pub fn run<P: MessagePump>(flag: &RunFlag, pump: &mut P, poll: PollMode) -> LoopStats {
    let mut stats = LoopStats::default();

    while flag.is_running() {
        stats.polls += 1;

        while flag.is_running() {
            let message = match pump.peek() {
                Some(message) => message,
                None => break,
            };

            if pump.is_quit(&message) {
                log::debug!("WM_QUIT received");
                stats.quit = true;
                flag.stop();
                break;
            }

            pump.dispatch(message);
            stats.dispatched += 1;
        }

        if let PollMode::Wait { timeout_ms } = poll {
            if flag.is_running() {
                pump.wait(Duration::from_millis(timeout_ms.into()));
            }
        }
    }

    log::debug!(
        "Message loop finished after {} polls, {} messages",
        stats.polls,
        stats.dispatched
    );
    stats
}
