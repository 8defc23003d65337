#![forbid(unsafe_code)]

//! Frame delta measurement for hosts that drive animation by ticking.

use std::time::Duration;
use web_time::Instant;

/// Upper bound on a single frame delta.
///
/// A backgrounded tab can stall the frame loop for seconds; clamping keeps a
/// resumed animation from jumping straight to its end state mid-frame.
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(100);

/// Measures the time between consecutive animation frames.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last: Option<Instant>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame at `now` and return the delta since the previous one.
    ///
    /// The first frame yields [`Duration::ZERO`].
    pub fn frame_at(&mut self, now: Instant) -> Duration {
        let delta = match self.last {
            Some(prev) => now.saturating_duration_since(prev),
            None => Duration::ZERO,
        };
        self.last = Some(now);
        delta.min(MAX_FRAME_DELTA)
    }

    /// Record a frame now.
    pub fn frame(&mut self) -> Duration {
        self.frame_at(Instant::now())
    }

    /// Forget the previous frame (e.g. after the loop was paused).
    pub fn reset(&mut self) {
        self.last = None;
    }
}
