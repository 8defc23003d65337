#![forbid(unsafe_code)]

//! Phased overlay animation: backdrop, panel, then staggered content.
//!
//! [`AnimationTimeline`] is the seam between the session state machine and
//! whatever actually moves pixels. [`TweenTimeline`] is the frame-driven
//! implementation: the host calls [`AnimationTimeline::tick`] once per
//! animation frame and reads interpolated values from
//! [`AnimationTimeline::frame`]. A CSS-transition backend can satisfy the
//! same trait by reporting completion from `transitionend`.
//!
//! # Sequencing
//!
//! Entering: the backdrop fade and the panel transform share a start; marked
//! content nodes reveal one after another after a short delay.
//! Exiting: content drops out at once, the panel leaves, and the backdrop
//! fades over the tail of the panel motion. Exit durations are shorter than
//! entry durations so dismissal reads as snappier.
//!
//! Sheets slide along the vertical axis from off-screen; dialogs scale and
//! fade from a slightly smaller, offset state.
//!
//! # Invariants
//!
//! - `start` cancels any in-flight run before doing anything else; two runs
//!   never drive the same frame.
//! - Every run that is not superseded or cancelled yields exactly one
//!   [`Completion`], retrieved via [`AnimationTimeline::take_completion`].
//!   A superseded run yields none.
//! - With reduced motion (or an all-zero plan), `start` reaches the
//!   terminal phase synchronously and the completion is available at once.
//! - All opacities and progress values stay in `[0.0, 1.0]`.
//!
//! # Failure Modes
//!
//! - `tick` with no run in flight is a no-op.
//! - Zero-duration segments complete as soon as their delay has elapsed.

use std::time::Duration;

use smallvec::SmallVec;

use crate::config::LayoutMode;

/// Easing curve for a tweened segment.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Easing {
    Linear,
    /// Decelerating; used for entrances.
    #[default]
    EaseOut,
    /// Accelerating; used for exits.
    EaseIn,
    EaseInOut,
}

impl Easing {
    /// Apply the curve to a progress value in `[0.0, 1.0]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseOut => {
                let inv = 1.0 - t;
                1.0 - inv * inv * inv
            }
            Self::EaseIn => t * t * t,
            Self::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let inv = -2.0 * t + 2.0;
                    1.0 - inv * inv * inv / 2.0
                }
            }
        }
    }
}

/// Which way a run moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Entering,
    Exiting,
}

/// Timeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AnimationPhase {
    #[default]
    Idle,
    Entering,
    Entered,
    Exiting,
    Exited,
}

impl AnimationPhase {
    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, Self::Entering | Self::Exiting)
    }
}

/// Identifies one `start` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(pub u64);

/// Terminal notification for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub run: RunId,
    pub direction: Direction,
}

/// What to animate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineRequest {
    pub direction: Direction,
    pub layout: LayoutMode,
    /// Distance a sheet travels from rest to fully off-screen.
    pub extent: f64,
    /// Panel offset at the start of an exit (a released drag, or a sheet
    /// closed before it finished sliding in).
    pub from_offset: f64,
    /// Backdrop opacity at the start of an exit.
    pub from_backdrop: f64,
    /// How far a dialog panel had appeared when the exit started, in
    /// `[0.0, 1.0]`.
    pub from_presence: f64,
    /// Number of content nodes marked for staggered reveal.
    pub reveal_items: usize,
}

impl TimelineRequest {
    pub fn new(direction: Direction, layout: LayoutMode) -> Self {
        Self {
            direction,
            layout,
            extent: 0.0,
            from_offset: 0.0,
            from_backdrop: 1.0,
            from_presence: 1.0,
            reveal_items: 0,
        }
    }

    #[must_use]
    pub fn extent(mut self, extent: f64) -> Self {
        self.extent = extent.max(0.0);
        self
    }

    #[must_use]
    pub fn from_offset(mut self, offset: f64) -> Self {
        self.from_offset = offset.max(0.0);
        self
    }

    /// Start an exit from the values currently on screen.
    #[must_use]
    pub fn from_frame(mut self, frame: &VisualFrame) -> Self {
        self.from_offset = frame.panel_offset_y.max(0.0);
        self.from_backdrop = frame.backdrop_opacity.clamp(0.0, 1.0);
        self.from_presence = frame.panel_opacity.clamp(0.0, 1.0);
        self
    }

    #[must_use]
    pub fn reveal_items(mut self, count: usize) -> Self {
        self.reveal_items = count;
        self
    }
}

/// Interpolated visual state for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualFrame {
    pub backdrop_opacity: f64,
    pub panel_opacity: f64,
    pub panel_scale: f64,
    /// Vertical panel translation in logical pixels (positive is down).
    pub panel_offset_y: f64,
    /// Per-item opacity of staggered content.
    pub content: SmallVec<[f64; 8]>,
}

impl VisualFrame {
    /// Fully presented.
    pub fn rest(items: usize) -> Self {
        Self {
            backdrop_opacity: 1.0,
            panel_opacity: 1.0,
            panel_scale: 1.0,
            panel_offset_y: 0.0,
            content: SmallVec::from_elem(1.0, items),
        }
    }

    /// Not presented.
    pub fn hidden(layout: LayoutMode, extent: f64, items: usize, settings: &AnimationSettings) -> Self {
        let (scale, offset) = match layout {
            LayoutMode::Sheet => (1.0, extent),
            LayoutMode::Dialog => (settings.dialog_min_scale, settings.dialog_offset),
        };
        Self {
            backdrop_opacity: 0.0,
            panel_opacity: 0.0,
            panel_scale: scale,
            panel_offset_y: offset,
            content: SmallVec::from_elem(0.0, items),
        }
    }
}

/// Durations and shape parameters for [`TweenTimeline`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSettings {
    pub enter_backdrop: Duration,
    pub enter_panel_sheet: Duration,
    pub enter_panel_dialog: Duration,
    pub enter_content_delay: Duration,
    pub enter_stagger: Duration,
    pub enter_item: Duration,
    pub exit_backdrop: Duration,
    pub exit_panel: Duration,
    pub exit_item: Duration,
    /// Dialog scale at the hidden end of the motion.
    pub dialog_min_scale: f64,
    /// Dialog vertical offset at the hidden end of the motion.
    pub dialog_offset: f64,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            enter_backdrop: Duration::from_millis(300),
            enter_panel_sheet: Duration::from_millis(500),
            enter_panel_dialog: Duration::from_millis(400),
            enter_content_delay: Duration::from_millis(200),
            enter_stagger: Duration::from_millis(60),
            enter_item: Duration::from_millis(250),
            exit_backdrop: Duration::from_millis(200),
            exit_panel: Duration::from_millis(250),
            exit_item: Duration::from_millis(150),
            dialog_min_scale: 0.95,
            dialog_offset: 24.0,
        }
    }
}

impl AnimationSettings {
    /// Every duration zero: runs complete on `start`.
    pub fn instant() -> Self {
        Self {
            enter_backdrop: Duration::ZERO,
            enter_panel_sheet: Duration::ZERO,
            enter_panel_dialog: Duration::ZERO,
            enter_content_delay: Duration::ZERO,
            enter_stagger: Duration::ZERO,
            enter_item: Duration::ZERO,
            exit_backdrop: Duration::ZERO,
            exit_panel: Duration::ZERO,
            exit_item: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Total length of a run.
    pub fn total(&self, direction: Direction, layout: LayoutMode, items: usize) -> Duration {
        Plan::build(self, direction, layout, items).total
    }
}

/// The animation seam used by the overlay session.
pub trait AnimationTimeline {
    /// Set the reduced-motion preference for subsequent runs.
    fn set_reduced_motion(&mut self, reduced: bool);

    fn reduced_motion(&self) -> bool;

    /// Cancel any in-flight run, then start a new one.
    fn start(&mut self, request: TimelineRequest) -> RunId;

    /// Cancel the in-flight run without completing it.
    fn cancel(&mut self);

    /// Advance by one frame.
    fn tick(&mut self, delta: Duration);

    /// Take the pending completion, if the current run has finished.
    fn take_completion(&mut self) -> Option<Completion>;

    fn phase(&self) -> AnimationPhase;

    /// Interpolated values for the current frame.
    fn frame(&self) -> VisualFrame;

    /// The host surface changed; affects sheet travel distance and which
    /// panel motion is drawn.
    fn set_layout(&mut self, layout: LayoutMode, extent: f64);
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Segment {
    delay: Duration,
    duration: Duration,
    easing: Easing,
}

impl Segment {
    fn new(delay: Duration, duration: Duration, easing: Easing) -> Self {
        Self {
            delay,
            duration,
            easing,
        }
    }

    fn end(&self) -> Duration {
        self.delay.saturating_add(self.duration)
    }

    fn progress(&self, elapsed: Duration) -> f64 {
        if elapsed < self.delay {
            return 0.0;
        }
        if self.duration.is_zero() {
            return 1.0;
        }
        let local = (elapsed - self.delay).as_secs_f64() / self.duration.as_secs_f64();
        self.easing.apply(local)
    }
}

#[derive(Debug, Clone)]
struct Plan {
    backdrop: Segment,
    panel: Segment,
    content: SmallVec<[Segment; 8]>,
    total: Duration,
}

impl Plan {
    fn build(settings: &AnimationSettings, direction: Direction, layout: LayoutMode, items: usize) -> Self {
        let (backdrop, panel, content): (Segment, Segment, SmallVec<[Segment; 8]>) = match direction {
            Direction::Entering => {
                let panel_duration = match layout {
                    LayoutMode::Sheet => settings.enter_panel_sheet,
                    LayoutMode::Dialog => settings.enter_panel_dialog,
                };
                let content = (0..items)
                    .map(|i| {
                        let stagger = settings
                            .enter_stagger
                            .saturating_mul(u32::try_from(i).unwrap_or(u32::MAX));
                        let delay = settings.enter_content_delay.saturating_add(stagger);
                        Segment::new(delay, settings.enter_item, Easing::EaseOut)
                    })
                    .collect();
                (
                    Segment::new(Duration::ZERO, settings.enter_backdrop, Easing::EaseOut),
                    Segment::new(Duration::ZERO, panel_duration, Easing::EaseOut),
                    content,
                )
            }
            Direction::Exiting => {
                let backdrop_delay = settings.exit_panel.saturating_sub(settings.exit_backdrop);
                let content = (0..items)
                    .map(|_| Segment::new(Duration::ZERO, settings.exit_item, Easing::EaseIn))
                    .collect();
                (
                    Segment::new(backdrop_delay, settings.exit_backdrop, Easing::EaseIn),
                    Segment::new(Duration::ZERO, settings.exit_panel, Easing::EaseIn),
                    content,
                )
            }
        };

        let total = content
            .iter()
            .map(Segment::end)
            .chain([backdrop.end(), panel.end()])
            .max()
            .unwrap_or(Duration::ZERO);

        Self {
            backdrop,
            panel,
            content,
            total,
        }
    }
}

#[derive(Debug, Clone)]
struct ActiveRun {
    id: RunId,
    direction: Direction,
    elapsed: Duration,
    plan: Plan,
}

/// Frame-driven implementation of [`AnimationTimeline`].
#[derive(Debug, Clone)]
pub struct TweenTimeline {
    settings: AnimationSettings,
    reduced_motion: bool,
    phase: AnimationPhase,
    run: Option<ActiveRun>,
    next_run: u64,
    pending: Option<Completion>,
    layout: LayoutMode,
    extent: f64,
    from_offset: f64,
    from_backdrop: f64,
    from_presence: f64,
    /// Per-item opacity an exit starts from.
    from_content: SmallVec<[f64; 8]>,
    items: usize,
}

impl Default for TweenTimeline {
    fn default() -> Self {
        Self::new(AnimationSettings::default())
    }
}

impl TweenTimeline {
    pub fn new(settings: AnimationSettings) -> Self {
        Self {
            settings,
            reduced_motion: false,
            phase: AnimationPhase::Idle,
            run: None,
            next_run: 1,
            pending: None,
            layout: LayoutMode::Dialog,
            extent: 0.0,
            from_offset: 0.0,
            from_backdrop: 1.0,
            from_presence: 1.0,
            from_content: SmallVec::new(),
            items: 0,
        }
    }

    pub fn settings(&self) -> &AnimationSettings {
        &self.settings
    }

    /// Elapsed time of the in-flight run.
    pub fn elapsed(&self) -> Option<Duration> {
        self.run.as_ref().map(|r| r.elapsed)
    }

    /// The id of the in-flight run.
    pub fn current_run(&self) -> Option<RunId> {
        self.run.as_ref().map(|r| r.id)
    }

    fn finish(&mut self, id: RunId, direction: Direction) {
        self.run = None;
        self.phase = match direction {
            Direction::Entering => AnimationPhase::Entered,
            Direction::Exiting => AnimationPhase::Exited,
        };
        self.pending = Some(Completion { run: id, direction });
        tracing::trace!(run = id.0, ?direction, "timeline complete");
    }

    fn running_frame(&self, run: &ActiveRun) -> VisualFrame {
        let s = &self.settings;
        let t = run.elapsed;
        let b = run.plan.backdrop.progress(t);
        let p = run.plan.panel.progress(t);
        let shrink = 1.0 - s.dialog_min_scale;

        let (backdrop, opacity, scale, offset) = match (run.direction, self.layout) {
            (Direction::Entering, LayoutMode::Sheet) => (b, 1.0, 1.0, self.extent * (1.0 - p)),
            (Direction::Entering, LayoutMode::Dialog) => {
                (b, p, s.dialog_min_scale + shrink * p, s.dialog_offset * (1.0 - p))
            }
            (Direction::Exiting, LayoutMode::Sheet) => {
                let from = self.from_offset.min(self.extent);
                (self.from_backdrop * (1.0 - b), 1.0, 1.0, from + (self.extent - from) * p)
            }
            (Direction::Exiting, LayoutMode::Dialog) => {
                let q = self.from_presence * (1.0 - p);
                (
                    self.from_backdrop * (1.0 - b),
                    q,
                    s.dialog_min_scale + shrink * q,
                    s.dialog_offset * (1.0 - q),
                )
            }
        };

        let content = run
            .plan
            .content
            .iter()
            .enumerate()
            .map(|(i, seg)| {
                let c = seg.progress(t);
                match run.direction {
                    Direction::Entering => c,
                    Direction::Exiting => self.from_content.get(i).copied().unwrap_or(1.0) * (1.0 - c),
                }
            })
            .collect();

        VisualFrame {
            backdrop_opacity: backdrop,
            panel_opacity: opacity,
            panel_scale: scale,
            panel_offset_y: offset,
            content,
        }
    }
}

impl AnimationTimeline for TweenTimeline {
    fn set_reduced_motion(&mut self, reduced: bool) {
        self.reduced_motion = reduced;
    }

    fn reduced_motion(&self) -> bool {
        self.reduced_motion
    }

    fn start(&mut self, request: TimelineRequest) -> RunId {
        // An exit that interrupts an entrance fades each item from where it is.
        let interrupted = match (&self.run, request.direction) {
            (Some(run), Direction::Exiting) if run.direction == Direction::Entering => {
                Some(self.running_frame(run).content)
            }
            _ => None,
        };
        self.cancel();

        let id = RunId(self.next_run);
        self.next_run += 1;
        self.layout = request.layout;
        self.extent = request.extent;
        self.from_offset = request.from_offset;
        self.from_backdrop = request.from_backdrop.clamp(0.0, 1.0);
        self.from_presence = request.from_presence.clamp(0.0, 1.0);
        self.from_content = interrupted.unwrap_or_default();
        self.items = request.reveal_items;

        let plan = Plan::build(
            &self.settings,
            request.direction,
            request.layout,
            request.reveal_items,
        );
        tracing::trace!(
            run = id.0,
            direction = ?request.direction,
            total_ms = plan.total.as_millis() as u64,
            reduced_motion = self.reduced_motion,
            "timeline start"
        );

        if self.reduced_motion || plan.total.is_zero() {
            self.finish(id, request.direction);
            return id;
        }

        self.phase = match request.direction {
            Direction::Entering => AnimationPhase::Entering,
            Direction::Exiting => AnimationPhase::Exiting,
        };
        self.run = Some(ActiveRun {
            id,
            direction: request.direction,
            elapsed: Duration::ZERO,
            plan,
        });
        id
    }

    fn cancel(&mut self) {
        if let Some(run) = self.run.take() {
            tracing::trace!(run = run.id.0, "timeline run superseded");
        }
        self.pending = None;
        self.phase = AnimationPhase::Idle;
    }

    fn tick(&mut self, delta: Duration) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        run.elapsed = run.elapsed.saturating_add(delta).min(run.plan.total);
        if run.elapsed >= run.plan.total {
            let (id, direction) = (run.id, run.direction);
            self.finish(id, direction);
        }
    }

    fn take_completion(&mut self) -> Option<Completion> {
        self.pending.take()
    }

    fn phase(&self) -> AnimationPhase {
        self.phase
    }

    fn frame(&self) -> VisualFrame {
        match (&self.run, self.phase) {
            (Some(run), _) => self.running_frame(run),
            (None, AnimationPhase::Entered) => VisualFrame::rest(self.items),
            (None, _) => VisualFrame::hidden(self.layout, self.extent, self.items, &self.settings),
        }
    }

    fn set_layout(&mut self, layout: LayoutMode, extent: f64) {
        self.layout = layout;
        self.extent = extent.max(0.0);
    }
}
