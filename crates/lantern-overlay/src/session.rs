#![forbid(unsafe_code)]

//! One overlay's open/close lifecycle.
//!
//! [`OverlaySession`] composes the scroll lock, focus scope, gesture
//! tracker, and animation timeline into a single state machine:
//!
//! ```text
//!            open               entered
//!   Closed ───────▶ Opening ─────────────▶ Open ◀──────────┐
//!     ▲                │ close              │  │ handle down │ release ≤ threshold
//!     │ exited         ▼                    │  ▼ (sheet)     │
//!     └──────────── Closing ◀───────────────┘  Dragging ─────┘
//!                      ▲          close           │
//!                      └──────────────────────────┘ release > threshold
//! ```
//!
//! # Side effects
//!
//! - `Closed → Opening`: acquire the scroll lock, capture focus, start the
//!   entering run.
//! - `Opening → Open`: move focus to the initial target, then `on_opened`.
//! - `Closing → Closed`: release the lock, restore focus, then `on_closed`,
//!   in that order.
//!
//! # Invariants
//!
//! - `Dragging` is reachable only in [`LayoutMode::Sheet`].
//! - A session in any state but `Closed` holds exactly one scroll lock; a
//!   `Closed` session holds none.
//! - Only the run started last can complete a transition; completions from
//!   superseded runs are dropped.
//! - Dropping or [`unmount`](OverlaySession::unmount)ing a session that is
//!   not `Closed` still releases the lock and restores focus.
//!
//! # Failure Modes
//!
//! - A close attempt blocked by [`Guards`] is ignored; state is unchanged.
//! - `open` while `Closing` is deferred until the exit finishes.
//! - Resizes during a drag are held until release.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lantern_core::event::{Event, HitRegion, KeyCode, KeyEvent, PointerEvent, PointerEventKind};
use lantern_core::geometry::Size;
use lantern_core::host::{ElementId, FocusHost, MediaQuery, ScrollSurface};
use lantern_core::viewport::ViewportClass;

use crate::animation::{
    AnimationTimeline, Direction, RunId, TimelineRequest, TweenTimeline, VisualFrame,
};
use crate::config::{CloseReason, Guards, LayoutMode, OverlayConfig};
use crate::focus::{FocusScope, InitialFocus, TrapOutcome};
use crate::gesture::{DragResolution, GestureTracker, SnapBack};
use crate::scroll_lock::{ScrollLock, ScrollLockManager};
use crate::settings::EngineSettings;

static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an overlay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OverlayState {
    #[default]
    Closed,
    Opening,
    Open,
    Dragging,
    Closing,
}

impl OverlayState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "Closed",
            Self::Opening => "Opening",
            Self::Open => "Open",
            Self::Dragging => "Dragging",
            Self::Closing => "Closing",
        }
    }

    /// Whether the overlay is mounted and visible.
    #[inline]
    pub const fn is_visible(self) -> bool {
        !matches!(self, Self::Closed)
    }

    /// Whether Tab navigation is contained.
    #[inline]
    pub const fn traps_focus(self) -> bool {
        matches!(self, Self::Opening | Self::Open | Self::Dragging)
    }
}

impl fmt::Display for OverlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the host should do with an event after the session saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    /// Not for this overlay.
    Ignored,
    /// Consumed; the host's default action may still run.
    Handled,
    /// Consumed; the host must cancel its default action.
    PreventDefault,
}

impl EventDisposition {
    #[inline]
    pub fn is_consumed(self) -> bool {
        !matches!(self, Self::Ignored)
    }

    #[inline]
    pub fn prevents_default(self) -> bool {
        matches!(self, Self::PreventDefault)
    }
}

/// Host services shared by every session on a page.
///
/// Sessions built from clones of one environment share its scroll-lock
/// counter.
#[derive(Clone)]
pub struct OverlayEnv {
    pub focus: Rc<dyn FocusHost>,
    pub media: Rc<dyn MediaQuery>,
    pub scroll_locks: ScrollLockManager,
    pub settings: EngineSettings,
}

impl fmt::Debug for OverlayEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayEnv")
            .field("scroll_locks", &self.scroll_locks)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl OverlayEnv {
    pub fn new(
        focus: Rc<dyn FocusHost>,
        media: Rc<dyn MediaQuery>,
        scroll_locks: ScrollLockManager,
    ) -> Self {
        Self {
            focus,
            media,
            scroll_locks,
            settings: EngineSettings::default(),
        }
    }

    /// Environment for a host object that implements every boundary trait,
    /// with a fresh scroll-lock manager.
    pub fn for_document<D>(doc: &Rc<D>) -> Self
    where
        D: FocusHost + ScrollSurface + MediaQuery + 'static,
    {
        let surface: Rc<dyn ScrollSurface> = doc.clone();
        Self::new(doc.clone(), doc.clone(), ScrollLockManager::new(surface))
    }

    /// Use `manager` (for example [`ScrollLockManager::global_or_init`]).
    #[must_use]
    pub fn with_scroll_locks(mut self, manager: ScrollLockManager) -> Self {
        self.scroll_locks = manager;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }
}

#[derive(Debug)]
struct HandleShared {
    guards: Guards,
    close_requested: bool,
}

/// Imperative handle for content embedded in an overlay.
///
/// Requests are applied by the session on its next `handle_event`, `tick`,
/// or `poll`.
#[derive(Clone)]
pub struct OverlayHandle {
    session: SessionId,
    shared: Rc<RefCell<HandleShared>>,
}

impl fmt::Debug for OverlayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.borrow();
        f.debug_struct("OverlayHandle")
            .field("session", &self.session)
            .field("guards", &shared.guards)
            .field("close_requested", &shared.close_requested)
            .finish()
    }
}

impl OverlayHandle {
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Ask the overlay to close. Returns `false` (and records nothing) if
    /// the guards currently forbid it.
    pub fn request_close(&self) -> bool {
        let mut shared = self.shared.borrow_mut();
        if !shared.guards.permits(CloseReason::Requested) {
            tracing::debug!(session = self.session.id(), "close request denied by guards");
            return false;
        }
        shared.close_requested = true;
        true
    }

    pub fn set_busy(&self, busy: bool) {
        self.shared.borrow_mut().guards.is_busy = busy;
    }

    pub fn set_prevent_close(&self, prevent: bool) {
        self.shared.borrow_mut().guards.prevent_close = prevent;
    }

    pub fn guards(&self) -> Guards {
        self.shared.borrow().guards
    }
}

/// The overlay state machine.
pub struct OverlaySession<T: AnimationTimeline = TweenTimeline> {
    id: SessionId,
    state: OverlayState,
    config: OverlayConfig,
    shared: Rc<RefCell<HandleShared>>,
    media: Rc<dyn MediaQuery>,
    scroll_locks: ScrollLockManager,
    settings: EngineSettings,
    focus: FocusScope,
    lock: Option<ScrollLock>,
    timeline: T,
    active_run: Option<RunId>,
    gesture: GestureTracker,
    snap_back: Option<SnapBack>,
    viewport: Size,
    viewport_class: ViewportClass,
    layout: LayoutMode,
    reduced_motion: bool,
    pending_resize: Option<Size>,
    pending_reopen: bool,
    close_reason: Option<CloseReason>,
}

impl<T: AnimationTimeline> fmt::Debug for OverlaySession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlaySession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("layout", &self.layout)
            .field("viewport_class", &self.viewport_class)
            .field("guards", &self.guards())
            .field("lock_held", &self.lock.is_some())
            .field("pending_reopen", &self.pending_reopen)
            .finish_non_exhaustive()
    }
}

impl OverlaySession<TweenTimeline> {
    /// Create a session driven by the built-in [`TweenTimeline`].
    pub fn new(env: &OverlayEnv, config: OverlayConfig) -> Self {
        let timeline = TweenTimeline::new(env.settings.animation.clone());
        Self::with_timeline(env, config, timeline)
    }
}

impl<T: AnimationTimeline> OverlaySession<T> {
    /// Create a session driven by a custom timeline backend.
    pub fn with_timeline(env: &OverlayEnv, config: OverlayConfig, timeline: T) -> Self {
        let viewport = env.media.viewport();
        let viewport_class = env.settings.breakpoints.classify(viewport);
        let layout = LayoutMode::resolve(viewport_class, config.layout_override);
        let shared = Rc::new(RefCell::new(HandleShared {
            guards: config.guards,
            close_requested: false,
        }));
        Self {
            id: SessionId::next(),
            state: OverlayState::Closed,
            shared,
            media: env.media.clone(),
            scroll_locks: env.scroll_locks.clone(),
            focus: FocusScope::new(env.focus.clone()),
            lock: None,
            timeline,
            active_run: None,
            gesture: GestureTracker::new(env.settings.drag_threshold),
            snap_back: None,
            viewport,
            viewport_class,
            layout,
            reduced_motion: false,
            pending_resize: None,
            pending_reopen: false,
            close_reason: None,
            settings: env.settings.clone(),
            config,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn layout_mode(&self) -> LayoutMode {
        self.layout
    }

    pub fn viewport_class(&self) -> ViewportClass {
        self.viewport_class
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn guards(&self) -> Guards {
        self.shared.borrow().guards
    }

    pub fn set_guards(&mut self, guards: Guards) {
        self.shared.borrow_mut().guards = guards;
    }

    /// A handle for embedded content.
    pub fn handle(&self) -> OverlayHandle {
        OverlayHandle {
            session: self.id,
            shared: self.shared.clone(),
        }
    }

    /// Whether this session currently holds a scroll lock.
    pub fn holds_scroll_lock(&self) -> bool {
        self.lock.is_some()
    }

    pub fn focus_scope(&self) -> &FocusScope {
        &self.focus
    }

    pub fn timeline(&self) -> &T {
        &self.timeline
    }

    /// Scope the focus trap to a panel mounted after construction.
    pub fn set_container(&mut self, container: ElementId) {
        self.config.container = Some(container);
        if self.state.is_visible() {
            self.focus.attach(container);
        }
    }

    /// Request the overlay to open.
    ///
    /// While `Opening` this restarts the entering run. While `Closing` the
    /// open is deferred until the exit completes. Otherwise a no-op.
    pub fn open(&mut self) {
        match self.state {
            OverlayState::Closed => self.begin_open(),
            OverlayState::Opening => {
                tracing::debug!(session = self.id.id(), "open restarted while opening");
                self.start_run(Direction::Entering, None);
            }
            OverlayState::Closing => {
                tracing::debug!(session = self.id.id(), "open deferred until closed");
                self.pending_reopen = true;
            }
            OverlayState::Open | OverlayState::Dragging => {}
        }
    }

    /// Request the overlay to close. Returns `true` if an exit started.
    ///
    /// Ignored while `Closed` or `Closing`, or if the guards forbid
    /// `reason`.
    pub fn request_close(&mut self, reason: CloseReason) -> bool {
        if matches!(self.state, OverlayState::Closed | OverlayState::Closing) {
            return false;
        }
        if !self.guards().permits(reason) {
            tracing::debug!(session = self.id.id(), ?reason, "close denied by guards");
            return false;
        }

        // The exit picks up from what is on screen: a live drag, a snap-back
        // in progress, or an entrance that has not finished.
        let origin = self.visual_frame();
        if self.state == OverlayState::Dragging {
            self.gesture.cancel();
        }
        self.begin_close(reason, &origin);
        true
    }

    /// Route a host event.
    pub fn handle_event(&mut self, event: &Event) -> EventDisposition {
        self.apply_requests();
        if self.state == OverlayState::Closed {
            return EventDisposition::Ignored;
        }
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Pointer(pointer) => self.handle_pointer(pointer),
            Event::Resize(size) => self.handle_resize(*size),
        }
    }

    /// Advance animations by one frame.
    pub fn tick(&mut self, delta: Duration) -> OverlayState {
        self.apply_requests();
        if let Some(snap) = self.snap_back.as_mut()
            && snap.tick(delta)
        {
            self.snap_back = None;
        }
        self.timeline.tick(delta);
        self.drain_completions();
        self.state
    }

    /// Apply pending handle requests and timeline completions without
    /// advancing time. Used with timelines that complete on their own.
    pub fn poll(&mut self) -> OverlayState {
        self.apply_requests();
        self.drain_completions();
        self.state
    }

    /// The overlay's content changed; the focusable set is recomputed on
    /// next use.
    pub fn notify_content_changed(&mut self) {
        self.focus.invalidate();
    }

    /// Visual values for the current frame, including the live drag offset.
    pub fn visual_frame(&self) -> VisualFrame {
        let mut frame = self.timeline.frame();
        match (self.state, &self.snap_back) {
            (OverlayState::Dragging, _) => frame.panel_offset_y = self.gesture.offset(),
            (OverlayState::Open, Some(snap)) => frame.panel_offset_y = snap.offset(),
            _ => {}
        }
        frame
    }

    /// Tear down immediately. Releases the lock and restores focus without
    /// waiting for animation; `on_closed` is not called.
    pub fn unmount(&mut self) {
        if self.state == OverlayState::Closed {
            return;
        }
        tracing::debug!(
            session = self.id.id(),
            state = %self.state,
            "overlay unmounted before close completed"
        );
        self.timeline.cancel();
        self.active_run = None;
        self.gesture.cancel();
        self.snap_back = None;
        self.pending_reopen = false;
        self.pending_resize = None;
        self.close_reason = None;
        if let Some(lock) = self.lock.take() {
            lock.release();
        }
        self.focus.restore();
        self.focus.detach();
        self.transition(OverlayState::Closed);
    }

    fn transition(&mut self, to: OverlayState) {
        let from = self.state;
        if from == to {
            return;
        }
        tracing::debug!(session = self.id.id(), %from, %to, "overlay transition");
        self.state = to;
    }

    fn begin_open(&mut self) {
        self.shared.borrow_mut().close_requested = false;
        self.apply_viewport(self.media.viewport());
        self.reduced_motion = self.media.prefers_reduced_motion();
        self.timeline.set_reduced_motion(self.reduced_motion);

        self.lock = Some(self.scroll_locks.acquire());
        self.focus.capture();
        if let Some(container) = self.config.container {
            self.focus.attach(container);
        }
        self.transition(OverlayState::Opening);
        self.start_run(Direction::Entering, None);
    }

    fn begin_close(&mut self, reason: CloseReason, origin: &VisualFrame) {
        self.close_reason = Some(reason);
        self.pending_reopen = false;
        self.snap_back = None;
        self.shared.borrow_mut().close_requested = false;
        self.transition(OverlayState::Closing);
        self.start_run(Direction::Exiting, Some(origin));
    }

    fn start_run(&mut self, direction: Direction, origin: Option<&VisualFrame>) {
        let mut request = TimelineRequest::new(direction, self.layout)
            .extent(f64::from(self.viewport.height))
            .reveal_items(self.config.reveal_items);
        if let Some(origin) = origin {
            request = request.from_frame(origin);
        }
        self.active_run = Some(self.timeline.start(request));
        self.drain_completions();
    }

    fn drain_completions(&mut self) {
        while let Some(done) = self.timeline.take_completion() {
            if self.active_run != Some(done.run) {
                tracing::trace!(session = self.id.id(), run = done.run.0, "stale completion dropped");
                continue;
            }
            self.active_run = None;
            match (done.direction, self.state) {
                (Direction::Entering, OverlayState::Opening) => self.finish_open(),
                (Direction::Exiting, OverlayState::Closing) => self.finish_close(),
                _ => {}
            }
        }
    }

    fn finish_open(&mut self) {
        self.transition(OverlayState::Open);
        let focused = self.focus.focus_initial(InitialFocus {
            target: self.config.initial_focus,
            close_button: self.config.close_button,
        });
        tracing::trace!(session = self.id.id(), focused = focused.map(ElementId::get), "initial focus");
        if let Some(on_opened) = self.config.on_opened.as_mut() {
            on_opened();
        }
    }

    fn finish_close(&mut self) {
        if let Some(lock) = self.lock.take() {
            lock.release();
        }
        self.focus.restore();
        self.focus.detach();
        self.snap_back = None;
        self.transition(OverlayState::Closed);

        let reason = self.close_reason.take().unwrap_or(CloseReason::Requested);
        if let Some(on_closed) = self.config.on_closed.as_mut() {
            on_closed(reason);
        }

        if std::mem::take(&mut self.pending_reopen) {
            self.begin_open();
        }
    }

    fn apply_requests(&mut self) {
        let requested = std::mem::take(&mut self.shared.borrow_mut().close_requested);
        if requested {
            self.request_close(CloseReason::Requested);
        }
    }

    fn apply_viewport(&mut self, size: Size) {
        self.viewport = size;
        self.viewport_class = self.settings.breakpoints.classify(size);
        let layout = LayoutMode::resolve(self.viewport_class, self.config.layout_override);
        if layout != self.layout {
            tracing::debug!(
                session = self.id.id(),
                from = %self.layout,
                to = %layout,
                "layout changed"
            );
            self.layout = layout;
            self.snap_back = None;
        }
        self.timeline.set_layout(self.layout, f64::from(size.height));
    }

    fn handle_key(&mut self, key: &KeyEvent) -> EventDisposition {
        if !key.is_press() {
            return EventDisposition::Ignored;
        }
        match key.code {
            KeyCode::Escape => match self.state {
                OverlayState::Opening | OverlayState::Open => {
                    if self.request_close(CloseReason::Escape) {
                        EventDisposition::PreventDefault
                    } else {
                        EventDisposition::Handled
                    }
                }
                _ => EventDisposition::Handled,
            },
            KeyCode::Tab | KeyCode::BackTab if self.state.traps_focus() => {
                match self.focus.trap(key) {
                    TrapOutcome::Ignored => EventDisposition::Ignored,
                    outcome if outcome.prevents_default() => EventDisposition::PreventDefault,
                    _ => EventDisposition::Handled,
                }
            }
            _ => EventDisposition::Ignored,
        }
    }

    fn handle_pointer(&mut self, pointer: &PointerEvent) -> EventDisposition {
        let y = pointer.position.y;
        match pointer.kind {
            PointerEventKind::Down => match (pointer.region, self.state) {
                (HitRegion::Outside, _) => EventDisposition::Ignored,
                (HitRegion::Backdrop, OverlayState::Opening | OverlayState::Open) => {
                    self.request_close(CloseReason::Backdrop);
                    EventDisposition::Handled
                }
                (HitRegion::DragHandle, OverlayState::Open) if self.layout == LayoutMode::Sheet => {
                    let allowed = self.guards().is_dismissible();
                    if self.gesture.begin(y, pointer.source, allowed) {
                        self.snap_back = None;
                        self.transition(OverlayState::Dragging);
                        EventDisposition::PreventDefault
                    } else {
                        EventDisposition::Handled
                    }
                }
                _ => EventDisposition::Handled,
            },
            PointerEventKind::Move => {
                if self.state == OverlayState::Dragging
                    && self.gesture.update(y, pointer.source).is_some()
                {
                    EventDisposition::PreventDefault
                } else {
                    EventDisposition::Ignored
                }
            }
            PointerEventKind::Up | PointerEventKind::Cancel => {
                if self.state != OverlayState::Dragging || !self.gesture.is_driven_by(pointer.source) {
                    return EventDisposition::Ignored;
                }
                if pointer.kind == PointerEventKind::Up {
                    self.gesture.update(y, pointer.source);
                    let resolution = self.gesture.end();
                    self.finish_drag(resolution);
                } else {
                    let resolution = self.gesture.cancel();
                    self.finish_drag(resolution);
                }
                EventDisposition::Handled
            }
        }
    }

    fn finish_drag(&mut self, resolution: Option<DragResolution>) {
        match resolution {
            Some(DragResolution::Dismiss { offset }) if self.guards().permits(CloseReason::Drag) => {
                let mut origin = self.timeline.frame();
                origin.panel_offset_y = offset;
                self.begin_close(CloseReason::Drag, &origin);
            }
            other => {
                self.transition(OverlayState::Open);
                let offset = other.map_or(0.0, DragResolution::offset);
                if !self.reduced_motion && offset > 0.0 {
                    self.snap_back = Some(SnapBack::new(offset, self.settings.snap_back));
                }
            }
        }
        if let Some(size) = self.pending_resize.take()
            && self.state.is_visible()
        {
            self.apply_viewport(size);
        }
    }

    fn handle_resize(&mut self, size: Size) -> EventDisposition {
        if self.state == OverlayState::Dragging {
            self.pending_resize = Some(size);
        } else {
            self.apply_viewport(size);
        }
        EventDisposition::Handled
    }
}

impl<T: AnimationTimeline> Drop for OverlaySession<T> {
    fn drop(&mut self) {
        self.unmount();
    }
}
