//! Frame pacing.
//!
//! The clock keeps the application on the display's vsync grid. Missed
//! frames, whether the compositor reports them or the application shows up
//! after its own predicted display time, raise a pressure factor that
//! stretches the frame period in whole vsyncs. Every on-time frame lowers it
//! by one.

use tracing::debug;

use crate::backend::FrameTiming;
use crate::types::{Nanos, Time};

/// Timing decided for one `WaitFrame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePlan {
    /// Vsync the caller should sleep until.
    pub boundary: Time,
    pub predicted_display_time: Time,
    /// Effective period: nominal period times the current pressure.
    pub period: Nanos,
    pub missed_frames: u32,
}

#[derive(Debug, Clone)]
pub struct FrameClock {
    max_pressure: u32,
    latency_frames: u32,
    pressure: u32,
    last_boundary: Option<Time>,
    last_prediction: Option<Time>,
}

impl FrameClock {
    pub fn new(max_pressure: u32, latency_frames: u32) -> Self {
        Self {
            max_pressure: max_pressure.max(1),
            latency_frames: latency_frames.max(1),
            pressure: 1,
            last_boundary: None,
            last_prediction: None,
        }
    }

    pub fn pressure(&self) -> u32 {
        self.pressure
    }

    pub fn last_prediction(&self) -> Option<Time> {
        self.last_prediction
    }

    /// Plan the next frame for a call arriving at `now`. `timing` is the
    /// backend's answer for the same instant.
    pub fn advance(&mut self, now: Time, timing: FrameTiming) -> FramePlan {
        let nominal = timing.period.max(1);

        let late = match self.last_prediction {
            Some(predicted) if now > predicted => ((now - predicted) / nominal) as u32 + 1,
            _ => 0,
        };
        let missed_frames = timing.missed_frames.saturating_add(late);
        self.pressure = if missed_frames > 0 {
            self.pressure.saturating_add(missed_frames).min(self.max_pressure)
        } else {
            self.pressure.saturating_sub(1).max(1)
        };
        let period = nominal * self.pressure as Nanos;

        // First vsync at or after the target, never in the past.
        let target = self
            .last_boundary
            .map_or(now, |boundary| (boundary + period).max(now));
        let boundary = if target <= timing.next_vsync {
            timing.next_vsync
        } else {
            let behind = target - timing.next_vsync;
            timing.next_vsync + (behind + nominal - 1) / nominal * nominal
        };

        let mut predicted = boundary + period * self.latency_frames as Nanos;
        if let Some(last) = self.last_prediction {
            if predicted <= last {
                predicted = last + 1;
            }
        }

        if missed_frames > 0 {
            debug!(
                "missed {} frame(s), pressure now {}",
                missed_frames, self.pressure
            );
        }

        self.last_boundary = Some(boundary);
        self.last_prediction = Some(predicted);
        FramePlan {
            boundary,
            predicted_display_time: predicted,
            period,
            missed_frames,
        }
    }
}
