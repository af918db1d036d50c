use std::collections::VecDeque;

use parking_lot::Mutex;
use tracing::warn;

use crate::types::{SessionState, Time};

/// Events beyond this many are dropped oldest first.
pub const EVENT_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    SessionStateChanged {
        session: u64,
        state: SessionState,
        time: Time,
    },
    /// Older events were dropped because the application did not poll.
    EventsLost { count: u32 },
}

/// Per-instance event queue drained by `xrPollEvent`.
#[derive(Default)]
pub struct EventQueue {
    inner: Mutex<QueueState>,
}

#[derive(Default)]
struct QueueState {
    events: VecDeque<Event>,
    lost: u32,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Event) {
        let mut inner = self.inner.lock();
        if inner.events.len() == EVENT_QUEUE_CAPACITY {
            inner.events.pop_front();
            inner.lost = inner.lost.saturating_add(1);
            if inner.lost == 1 {
                warn!("event queue full, dropping oldest events");
            }
        }
        inner.events.push_back(event);
    }

    /// Next event, reporting dropped events before anything newer.
    pub fn poll(&self) -> Option<Event> {
        let mut inner = self.inner.lock();
        if inner.lost > 0 {
            let count = std::mem::take(&mut inner.lost);
            return Some(Event::EventsLost { count });
        }
        inner.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop queued events about a destroyed session.
    pub fn forget_session(&self, session: u64) {
        self.inner.lock().events.retain(|event| {
            !matches!(event, Event::SessionStateChanged { session: s, .. } if *s == session)
        });
    }
}
