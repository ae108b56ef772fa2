//! The per-room countdown (C4). A pure, sans-I/O state machine: it has no
//! awareness of wall-clock time, channels, or the room it belongs to. The
//! room actor (§4.5) owns a `tokio::time::interval` and calls [`Timer::tick`]
//! once a second while the timer is running; the timer only ever reports
//! what happened, it never mutates [`crate::room::state::Room`] directly.
//!
//! Grounded on `congress/src/broadcast.rs`'s periodic-task shape
//! (`tokio::time::sleep`/`interval` loop, signal-don't-mutate) generalized
//! from one process-wide task to one task per room.

use crate::types::TimerPhase;

/// What happened on a given call to [`Timer::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Still running; this many seconds remain.
    Ticked(u32),
    /// Just hit zero. The actor closes the submission window and
    /// broadcasts a full resync after reacting to this.
    Expired,
}

/// One room's countdown. Resolution is 1 second (§4.4).
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    duration: u32,
    seconds_remaining: u32,
    running: bool,
}

impl Timer {
    pub fn new(duration: u32) -> Self {
        Self {
            duration,
            seconds_remaining: duration,
            running: false,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        if self.running {
            TimerPhase::Running
        } else if self.seconds_remaining == 0 {
            TimerPhase::Expired
        } else if self.seconds_remaining == self.duration {
            TimerPhase::Idle
        } else {
            TimerPhase::Paused
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// Idle|Paused -> Running. No-op if already running. Starting from
    /// Expired resets to full duration first (§4.4).
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        if self.seconds_remaining == 0 {
            self.seconds_remaining = self.duration;
        }
        self.running = true;
    }

    /// Running -> Paused. No-op otherwise.
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Any state -> Idle, at `duration` (the current question's
    /// `timerDuration`, supplied by the caller since the timer itself
    /// does not know which question it belongs to).
    pub fn reset(&mut self, duration: u32) {
        self.duration = duration;
        self.seconds_remaining = duration;
        self.running = false;
    }

    /// Advance one second while running. No-op (returns `None`) otherwise.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if !self.running {
            return None;
        }
        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        if self.seconds_remaining == 0 {
            self.running = false;
            Some(TimerEvent::Expired)
        } else {
            Some(TimerEvent::Ticked(self.seconds_remaining))
        }
    }
}
