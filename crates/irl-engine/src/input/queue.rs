use std::collections::vec_deque::{self, VecDeque};

/// Control signals the session understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// The player finished their shot; hand the table to the computer.
    EndTurn,
}

/// FIFO of control signals raised between ticks. Whoever owns the tick loop
/// drains it before reading the next frame.
#[derive(Debug, Default)]
pub struct ControlQueue {
    pending: VecDeque<ControlEvent>,
}

impl ControlQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: ControlEvent) {
        self.pending.push_back(event);
    }

    /// Remove and yield pending signals, oldest first.
    pub fn drain(&mut self) -> vec_deque::Drain<'_, ControlEvent> {
        self.pending.drain(..)
    }
}
