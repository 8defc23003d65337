#![forbid(unsafe_code)]

//! Stacking for simultaneously open overlays.
//!
//! The `OverlayStack` keeps sessions in LIFO order. Only the topmost live
//! session receives keyboard and pointer input; resizes and frame ticks
//! reach every session, and sessions that have finished closing are reaped
//! on `tick`.
//!
//! # Invariants
//!
//! - Z-order is strictly increasing: later overlays are always on top.
//! - Only the top live (non-`Closed`) session receives input events.
//! - Each session holds its own scroll lock, so the lock count equals the
//!   number of live sessions sharing one manager.
//! - `clear()` and dropping the stack unmount sessions top first, so each
//!   one restores focus into the overlay below it before that one unwinds.
//!
//! # Failure Modes
//!
//! - `close_top()` on an empty stack returns `false`.
//! - `get()` / `get_mut()` / `remove()` for an unknown ID return `None`.
//!
//! # Example
//!
//! ```ignore
//! let mut stack = OverlayStack::new();
//! let leadership = stack.push(OverlaySession::new(&env, leadership_config));
//! let signup = stack.push(OverlaySession::new(&env, presets::workforce_registration()));
//!
//! // Only `signup` sees the Escape.
//! stack.handle_event(&Event::key(KeyCode::Escape));
//! let reaped = stack.tick(frame_delta);
//! ```

use std::time::Duration;

use lantern_core::event::Event;
use smallvec::SmallVec;

use crate::animation::{AnimationTimeline, TweenTimeline};
use crate::config::CloseReason;
use crate::session::{EventDisposition, OverlaySession, OverlayState, SessionId};

/// Base z-index for the overlay layer.
pub const BASE_OVERLAY_Z: u32 = 1000;

/// Z-index increment between overlays (leaves room for backdrop and panel
/// layers inside one overlay).
pub const Z_INCREMENT: u32 = 10;

struct StackedOverlay<T: AnimationTimeline> {
    z_index: u32,
    session: OverlaySession<T>,
}

/// Stack of overlays with z-ordering and input routing.
pub struct OverlayStack<T: AnimationTimeline = TweenTimeline> {
    /// Bottom to top.
    entries: Vec<StackedOverlay<T>>,
    next_z: u32,
}

impl<T: AnimationTimeline> Default for OverlayStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: AnimationTimeline> std::fmt::Debug for OverlayStack<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|e| (e.session.id(), e.z_index, e.session.state())),
            )
            .finish()
    }
}

impl<T: AnimationTimeline> OverlayStack<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_z: 0,
        }
    }

    /// Push `session` on top and open it.
    pub fn push(&mut self, mut session: OverlaySession<T>) -> SessionId {
        let id = session.id();
        let z_index = BASE_OVERLAY_Z.saturating_add(self.next_z);
        self.next_z = self.next_z.saturating_add(Z_INCREMENT);
        session.open();
        tracing::debug!(session = id.id(), z_index, depth = self.entries.len() + 1, "overlay pushed");
        self.entries.push(StackedOverlay { z_index, session });
        id
    }

    /// Remove a session from any position. Dropping the returned session
    /// tears it down if it is still open.
    pub fn remove(&mut self, id: SessionId) -> Option<OverlaySession<T>> {
        let idx = self.entries.iter().position(|e| e.session.id() == id)?;
        Some(self.entries.remove(idx).session)
    }

    /// Tear down every session, top first.
    pub fn clear(&mut self) {
        while let Some(mut entry) = self.entries.pop() {
            entry.session.unmount();
        }
    }

    pub fn get(&self, id: SessionId) -> Option<&OverlaySession<T>> {
        self.entries
            .iter()
            .find(|e| e.session.id() == id)
            .map(|e| &e.session)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut OverlaySession<T>> {
        self.entries
            .iter_mut()
            .find(|e| e.session.id() == id)
            .map(|e| &mut e.session)
    }

    pub fn z_index(&self, id: SessionId) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| e.session.id() == id)
            .map(|e| e.z_index)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.entries.iter().any(|e| e.session.id() == id)
    }

    /// Session IDs, bottom to top.
    pub fn ids(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.entries.iter().map(|e| e.session.id())
    }

    /// The topmost session that is not `Closed`.
    pub fn top_id(&self) -> Option<SessionId> {
        self.top_index().map(|i| self.entries[i].session.id())
    }

    fn top_index(&self) -> Option<usize> {
        self.entries
            .iter()
            .rposition(|e| e.session.state() != OverlayState::Closed)
    }

    /// Ask the top session to close.
    pub fn close_top(&mut self, reason: CloseReason) -> bool {
        match self.top_index() {
            Some(i) => self.entries[i].session.request_close(reason),
            None => false,
        }
    }

    /// Route an event: resizes go to every session, everything else to the
    /// top live session only.
    pub fn handle_event(&mut self, event: &Event) -> EventDisposition {
        if let Event::Resize(_) = event {
            let mut out = EventDisposition::Ignored;
            for entry in &mut self.entries {
                if entry.session.handle_event(event).is_consumed() {
                    out = EventDisposition::Handled;
                }
            }
            return out;
        }
        match self.top_index() {
            Some(i) => self.entries[i].session.handle_event(event),
            None => EventDisposition::Ignored,
        }
    }

    /// Advance every session, then reap the ones that are `Closed`.
    ///
    /// Returns the reaped IDs, bottom to top.
    pub fn tick(&mut self, delta: Duration) -> SmallVec<[SessionId; 4]> {
        for entry in &mut self.entries {
            entry.session.tick(delta);
        }
        let mut reaped = SmallVec::new();
        self.entries.retain(|e| {
            let closed = e.session.state() == OverlayState::Closed;
            if closed {
                reaped.push(e.session.id());
            }
            !closed
        });
        if !reaped.is_empty() {
            tracing::debug!(reaped = reaped.len(), depth = self.entries.len(), "overlays reaped");
        }
        reaped
    }
}

impl<T: AnimationTimeline> Drop for OverlayStack<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverlayConfig;
    use crate::session::OverlayEnv;
    use lantern_core::event::{KeyCode, PointerEvent, PointerEventKind};
    use lantern_core::geometry::Size;
    use lantern_core::host::{ElementKind, FocusHost};
    use lantern_core::testing::MemoryDocument;
    use std::rc::Rc;

    fn env() -> (Rc<MemoryDocument>, OverlayEnv) {
        let doc = Rc::new(MemoryDocument::new());
        doc.set_reduced_motion(true);
        let env = OverlayEnv::for_document(&doc);
        (doc, env)
    }

    #[test]
    fn z_order_increases() {
        let (_doc, env) = env();
        let mut stack = OverlayStack::new();
        let a = stack.push(OverlaySession::new(&env, OverlayConfig::new()));
        let b = stack.push(OverlaySession::new(&env, OverlayConfig::new()));
        assert_eq!(stack.z_index(a), Some(BASE_OVERLAY_Z));
        assert_eq!(stack.z_index(b), Some(BASE_OVERLAY_Z + Z_INCREMENT));
        assert_eq!(stack.top_id(), Some(b));
        assert_eq!(stack.ids().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn push_opens_and_locks() {
        let (_doc, env) = env();
        let mut stack = OverlayStack::new();
        let a = stack.push(OverlaySession::new(&env, OverlayConfig::new()));
        assert_eq!(stack.get(a).map(|s| s.state()), Some(OverlayState::Open));
        stack.push(OverlaySession::new(&env, OverlayConfig::new()));
        assert_eq!(env.scroll_locks.lock_count(), 2);
    }

    #[test]
    fn input_goes_to_top_only() {
        let (_doc, env) = env();
        let mut stack = OverlayStack::new();
        let a = stack.push(OverlaySession::new(&env, OverlayConfig::new()));
        let b = stack.push(OverlaySession::new(&env, OverlayConfig::new()));

        stack.handle_event(&Event::key(KeyCode::Escape));
        assert_eq!(stack.get(b).map(|s| s.state()), Some(OverlayState::Closed));
        assert_eq!(stack.get(a).map(|s| s.state()), Some(OverlayState::Open));
        assert_eq!(stack.top_id(), Some(a));

        let reaped = stack.tick(Duration::from_millis(16));
        assert_eq!(reaped.as_slice(), &[b]);
        assert_eq!(stack.depth(), 1);
        assert_eq!(env.scroll_locks.lock_count(), 1);
    }

    #[test]
    fn resize_reaches_every_session() {
        let (_doc, env) = env();
        let mut stack = OverlayStack::new();
        let a = stack.push(OverlaySession::new(&env, OverlayConfig::new()));
        let b = stack.push(OverlaySession::new(&env, OverlayConfig::new()));
        let out = stack.handle_event(&Event::Resize(Size::new(400, 800)));
        assert_eq!(out, EventDisposition::Handled);
        for id in [a, b] {
            assert!(stack.get(id).is_some_and(|s| s.viewport_class().is_compact()));
        }
    }

    #[test]
    fn backdrop_of_lower_overlay_is_unreachable() {
        let (_doc, env) = env();
        let mut stack = OverlayStack::new();
        let a = stack.push(OverlaySession::new(&env, OverlayConfig::new()));
        stack.push(OverlaySession::new(
            &env,
            OverlayConfig::new().guards(crate::config::Guards::default().close_on_backdrop(false)),
        ));
        let click = Event::Pointer(
            PointerEvent::new(PointerEventKind::Down, 1.0, 1.0)
                .region(lantern_core::event::HitRegion::Backdrop),
        );
        stack.handle_event(&click);
        assert_eq!(stack.get(a).map(|s| s.state()), Some(OverlayState::Open));
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn clear_unwinds_focus_top_first() {
        let (doc, env) = env();
        let body = doc.body();
        let trigger = doc.append(body, ElementKind::Button);
        let outer = doc.append(body, ElementKind::Generic);
        let outer_btn = doc.append(outer, ElementKind::Button);
        let inner = doc.append(body, ElementKind::Generic);
        doc.append(inner, ElementKind::Button);
        doc.focus(trigger);

        let mut stack = OverlayStack::new();
        stack.push(OverlaySession::new(&env, OverlayConfig::new().container(outer)));
        assert_eq!(doc.active_element(), Some(outer_btn));
        stack.push(OverlaySession::new(&env, OverlayConfig::new().container(inner)));

        stack.clear();
        assert!(stack.is_empty());
        assert_eq!(doc.active_element(), Some(trigger));
        assert_eq!(env.scroll_locks.lock_count(), 0);
    }

    #[test]
    fn dropping_stack_unwinds_focus_top_first() {
        let (doc, env) = env();
        let body = doc.body();
        let trigger = doc.append(body, ElementKind::Button);
        let outer = doc.append(body, ElementKind::Generic);
        let outer_btn = doc.append(outer, ElementKind::Button);
        let inner = doc.append(body, ElementKind::Generic);
        doc.append(inner, ElementKind::Button);
        doc.focus(trigger);

        let mut stack = OverlayStack::new();
        stack.push(OverlaySession::new(&env, OverlayConfig::new().container(outer)));
        stack.push(OverlaySession::new(&env, OverlayConfig::new().container(inner)));
        assert_ne!(doc.active_element(), Some(outer_btn));

        drop(stack);
        assert_eq!(doc.active_element(), Some(trigger));
        assert_eq!(env.scroll_locks.lock_count(), 0);
    }

    #[test]
    fn remove_and_close_top_on_empty() {
        let (_doc, env) = env();
        let mut stack: OverlayStack = OverlayStack::new();
        assert!(!stack.close_top(CloseReason::Requested));
        let a = stack.push(OverlaySession::new(&env, OverlayConfig::new()));
        let removed = stack.remove(a);
        assert!(removed.is_some());
        assert!(!stack.contains(a));
        drop(removed);
        assert_eq!(env.scroll_locks.lock_count(), 0);
    }
}
