//! Transient status messages.
//!
//! Every notification is visible for a fixed period, then leaves over a short
//! exit transition and is dropped. The center only tracks state; it returns
//! the timer work for the app to schedule, so tests drive the lifecycle by
//! resolving timers instead of waiting on a clock.

use serde::{Deserialize, Serialize};

use crate::capabilities::TimerOutput;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Visible,
    Leaving,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub severity: Severity,
    pub phase: Phase,
    timer_id: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerRequest {
    Start { id: u64, millis: u64 },
    Cancel { id: u64 },
}

#[derive(Clone, Debug, Default)]
pub struct NotificationCenter {
    items: Vec<Notification>,
    next_id: u64,
    next_timer_id: u64,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows a message at once. Several may be on screen together.
    pub fn notify(
        &mut self,
        message: impl Into<String>,
        severity: Severity,
        visible_ms: u64,
    ) -> (u64, TimerRequest) {
        self.next_id += 1;
        let id = self.next_id;
        let timer_id = self.allocate_timer();

        self.items.push(Notification {
            id,
            message: message.into(),
            severity,
            phase: Phase::Visible,
            timer_id,
        });

        (
            id,
            TimerRequest::Start {
                id: timer_id,
                millis: visible_ms,
            },
        )
    }

    /// Advances whichever notification owns the timer. Fires for timers that
    /// no longer belong to anything are ignored.
    pub fn on_timer(&mut self, output: TimerOutput, exit_ms: u64) -> Option<TimerRequest> {
        let TimerOutput::Fired { id: timer_id } = output else {
            return None;
        };
        let index = self.items.iter().position(|n| n.timer_id == timer_id)?;

        match self.items[index].phase {
            Phase::Visible => self.begin_exit(index, exit_ms),
            Phase::Leaving => {
                self.items.remove(index);
                None
            }
        }
    }

    /// Skips the rest of the visible period. Returns the cancel for the
    /// pending timer followed by the exit timer, if any.
    pub fn dismiss(&mut self, id: u64, exit_ms: u64) -> Vec<TimerRequest> {
        let Some(index) = self.items.iter().position(|n| n.id == id) else {
            return Vec::new();
        };
        if self.items[index].phase == Phase::Leaving {
            return Vec::new();
        }

        let mut requests = vec![TimerRequest::Cancel {
            id: self.items[index].timer_id,
        }];
        requests.extend(self.begin_exit(index, exit_ms));
        requests
    }

    fn begin_exit(&mut self, index: usize, exit_ms: u64) -> Option<TimerRequest> {
        if exit_ms == 0 {
            self.items.remove(index);
            return None;
        }

        let timer_id = self.allocate_timer();
        let item = &mut self.items[index];
        item.phase = Phase::Leaving;
        item.timer_id = timer_id;
        Some(TimerRequest::Start {
            id: timer_id,
            millis: exit_ms,
        })
    }

    fn allocate_timer(&mut self) -> u64 {
        self.next_timer_id += 1;
        self.next_timer_id
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn get(&self, id: u64) -> Option<&Notification> {
        self.items.iter().find(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
