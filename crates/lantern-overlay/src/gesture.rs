#![forbid(unsafe_code)]

//! Drag-to-dismiss tracking for edge-anchored sheets.
//!
//! The tracker reduces a pointer stream to one vertical distance. While a
//! drag is live, the clamped distance is echoed straight onto the panel
//! transform (no tweening). On release the distance is compared with the
//! threshold: past it the sheet dismisses, otherwise it springs back to
//! rest via [`SnapBack`].
//!
//! Mouse, touch, and pen use the same contract. Only the device that began
//! a drag can move or release it.
//!
//! # Invariants
//!
//! - The live offset is never negative: upward movement clamps to zero and
//!   never moves the panel, and it cannot commit a dismissal.
//! - A release commits iff `offset > threshold`; exactly `threshold`
//!   snaps back.
//! - Drag state exists only between `begin` and `end`/`cancel`.

use std::time::Duration;

use lantern_core::event::PointerSource;

use crate::animation::Easing;

/// Release distance, in logical pixels, past which a sheet dismisses.
pub const DEFAULT_DRAG_THRESHOLD: f64 = 100.0;

/// Duration of the spring back to rest after an uncommitted drag.
pub const DEFAULT_SNAP_BACK: Duration = Duration::from_millis(200);

/// How a finished drag resolves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragResolution {
    /// Below the threshold: return to rest from `offset`.
    SnapBack { offset: f64 },
    /// Past the threshold: dismiss, continuing from `offset`.
    Dismiss { offset: f64 },
}

impl DragResolution {
    /// The live offset at release.
    pub fn offset(self) -> f64 {
        match self {
            Self::SnapBack { offset } | Self::Dismiss { offset } => offset,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    origin: f64,
    current: f64,
    source: PointerSource,
}

impl Drag {
    fn offset(&self) -> f64 {
        (self.current - self.origin).max(0.0)
    }
}

/// Converts pointer movement into a drag distance.
#[derive(Debug, Clone)]
pub struct GestureTracker {
    threshold: f64,
    drag: Option<Drag>,
}

impl Default for GestureTracker {
    fn default() -> Self {
        Self::new(DEFAULT_DRAG_THRESHOLD)
    }
}

impl GestureTracker {
    /// Create a tracker; negative or non-finite thresholds become zero.
    pub fn new(threshold: f64) -> Self {
        let threshold = if threshold.is_finite() { threshold.max(0.0) } else { 0.0 };
        Self {
            threshold,
            drag: None,
        }
    }

    #[inline]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Whether a drag is in progress.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.drag.is_some()
    }

    /// Start a drag at `origin_y`. No-op (returns `false`) unless `allowed`
    /// or if a drag is already live.
    pub fn begin(&mut self, origin_y: f64, source: PointerSource, allowed: bool) -> bool {
        if !allowed || self.drag.is_some() {
            return false;
        }
        self.drag = Some(Drag {
            origin: origin_y,
            current: origin_y,
            source,
        });
        true
    }

    /// Feed a pointer position. Returns the live panel offset, or `None` if
    /// no drag is active or `source` did not start it.
    pub fn update(&mut self, current_y: f64, source: PointerSource) -> Option<f64> {
        let drag = self.drag.as_mut().filter(|d| d.source == source)?;
        drag.current = current_y;
        let offset = drag.offset();
        tracing::trace!(offset, "sheet drag");
        Some(offset)
    }

    /// Raw signed distance from the origin (zero when idle).
    pub fn delta(&self) -> f64 {
        self.drag.map_or(0.0, |d| d.current - d.origin)
    }

    /// Live panel offset: the delta clamped to be non-negative.
    pub fn offset(&self) -> f64 {
        self.drag.map_or(0.0, |d| d.offset())
    }

    /// Whether `source` owns the live drag.
    pub fn is_driven_by(&self, source: PointerSource) -> bool {
        self.drag.is_some_and(|d| d.source == source)
    }

    /// Finish the drag and decide between dismissal and snap back.
    pub fn end(&mut self) -> Option<DragResolution> {
        let drag = self.drag.take()?;
        let offset = drag.offset();
        Some(if offset > self.threshold {
            DragResolution::Dismiss { offset }
        } else {
            DragResolution::SnapBack { offset }
        })
    }

    /// Abandon the drag; always resolves to a snap back.
    pub fn cancel(&mut self) -> Option<DragResolution> {
        let drag = self.drag.take()?;
        Some(DragResolution::SnapBack {
            offset: drag.offset(),
        })
    }
}

/// Spring from a released drag offset back to rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapBack {
    from: f64,
    elapsed: Duration,
    duration: Duration,
}

impl SnapBack {
    pub fn new(from: f64, duration: Duration) -> Self {
        Self {
            from,
            elapsed: Duration::ZERO,
            duration,
        }
    }

    /// Advance; returns `true` once the panel is back at rest.
    pub fn tick(&mut self, delta: Duration) -> bool {
        self.elapsed = self.elapsed.saturating_add(delta).min(self.duration);
        self.is_finished()
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Current panel offset.
    pub fn offset(&self) -> f64 {
        if self.duration.is_zero() {
            return 0.0;
        }
        let t = self.elapsed.as_secs_f64() / self.duration.as_secs_f64();
        self.from * (1.0 - Easing::EaseOut.apply(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOUSE: PointerSource = PointerSource::Mouse;
    const TOUCH: PointerSource = PointerSource::Touch;

    fn drag_to(tracker: &mut GestureTracker, distance: f64) -> Option<DragResolution> {
        assert!(tracker.begin(400.0, TOUCH, true));
        tracker.update(400.0 + distance, TOUCH);
        tracker.end()
    }

    #[test]
    fn begin_requires_permission() {
        let mut tracker = GestureTracker::default();
        assert!(!tracker.begin(10.0, MOUSE, false));
        assert!(!tracker.is_active());
        assert!(tracker.update(50.0, MOUSE).is_none());
        assert!(tracker.end().is_none());
    }

    #[test]
    fn downward_drag_echoes_delta() {
        let mut tracker = GestureTracker::default();
        tracker.begin(200.0, MOUSE, true);
        assert_eq!(tracker.update(260.0, MOUSE), Some(60.0));
        assert_eq!(tracker.delta(), 60.0);
        assert_eq!(tracker.offset(), 60.0);
    }

    #[test]
    fn upward_drag_clamps_to_zero() {
        let mut tracker = GestureTracker::default();
        tracker.begin(200.0, MOUSE, true);
        assert_eq!(tracker.update(50.0, MOUSE), Some(0.0));
        assert_eq!(tracker.delta(), -150.0);
        assert_eq!(tracker.end(), Some(DragResolution::SnapBack { offset: 0.0 }));
    }

    #[test]
    fn threshold_boundaries() {
        let mut tracker = GestureTracker::new(100.0);
        assert_eq!(
            drag_to(&mut tracker, 99.0),
            Some(DragResolution::SnapBack { offset: 99.0 })
        );
        assert_eq!(
            drag_to(&mut tracker, 100.0),
            Some(DragResolution::SnapBack { offset: 100.0 })
        );
        assert_eq!(
            drag_to(&mut tracker, 101.0),
            Some(DragResolution::Dismiss { offset: 101.0 })
        );
    }

    #[test]
    fn other_source_cannot_hijack() {
        let mut tracker = GestureTracker::default();
        tracker.begin(0.0, TOUCH, true);
        assert!(tracker.update(300.0, MOUSE).is_none());
        assert_eq!(tracker.offset(), 0.0);
        assert!(tracker.is_driven_by(TOUCH));
        assert!(!tracker.begin(0.0, MOUSE, true), "one drag at a time");
    }

    #[test]
    fn cancel_always_snaps_back() {
        let mut tracker = GestureTracker::default();
        tracker.begin(0.0, TOUCH, true);
        tracker.update(500.0, TOUCH);
        assert_eq!(
            tracker.cancel(),
            Some(DragResolution::SnapBack { offset: 500.0 })
        );
        assert!(!tracker.is_active());
    }

    #[test]
    fn invalid_thresholds_are_sanitized() {
        assert_eq!(GestureTracker::new(-5.0).threshold(), 0.0);
        assert_eq!(GestureTracker::new(f64::NAN).threshold(), 0.0);
    }

    #[test]
    fn snap_back_reaches_rest() {
        let mut snap = SnapBack::new(80.0, Duration::from_millis(200));
        assert_eq!(snap.offset(), 80.0);
        assert!(!snap.tick(Duration::from_millis(100)));
        let mid = snap.offset();
        assert!(mid > 0.0 && mid < 80.0);
        assert!(snap.tick(Duration::from_millis(150)));
        assert_eq!(snap.offset(), 0.0);
    }

    #[test]
    fn snap_back_survives_huge_tick() {
        let mut snap = SnapBack::new(80.0, Duration::from_millis(200));
        snap.tick(Duration::from_millis(16));
        assert!(snap.tick(Duration::MAX));
        assert_eq!(snap.offset(), 0.0);
    }

    #[test]
    fn zero_duration_snap_is_instant() {
        let snap = SnapBack::new(42.0, Duration::ZERO);
        assert!(snap.is_finished());
        assert_eq!(snap.offset(), 0.0);
    }
}
