#![forbid(unsafe_code)]

//! Focus containment for an open overlay.
//!
//! A [`FocusScope`] owns three pieces of focus state for one overlay:
//!
//! - **Prior focus**: the element focused before the overlay existed,
//!   captured once and used only for restoration.
//! - **Focusable set**: tabbable descendants of the overlay container in
//!   document order, recomputed lazily after [`FocusScope::invalidate`].
//! - **Trap**: Tab / Shift+Tab wrap at the ends of the set and never leave
//!   it.
//!
//! # Failure Modes
//!
//! - The prior element was removed while the overlay was open:
//!   [`FocusScope::restore`] is a no-op.
//! - The focusable set is empty: [`FocusScope::trap`] swallows the key
//!   without moving focus.
//! - Focus somehow sits outside the set (e.g. on the container itself):
//!   the next Tab is redirected to the first (or last) member.

use std::fmt;
use std::rc::Rc;

use lantern_core::event::KeyEvent;
use lantern_core::host::{ElementId, FocusHost};

/// Result of offering a key event to the trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapOutcome {
    /// Not a Tab key; the trap did nothing.
    Ignored,
    /// Focus is inside the set and not at an edge; the host's default Tab
    /// behavior keeps it inside.
    PassThrough,
    /// Focus wrapped from one end of the set to the other.
    Wrapped(ElementId),
    /// Focus was outside the set and was pulled back in.
    Redirected(ElementId),
    /// The set is empty; the key must be swallowed.
    Suppressed,
}

impl TrapOutcome {
    /// Whether the host must cancel its default Tab handling.
    #[inline]
    pub fn prevents_default(self) -> bool {
        matches!(
            self,
            Self::Wrapped(_) | Self::Redirected(_) | Self::Suppressed
        )
    }
}

/// Where focus lands when an overlay finishes opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InitialFocus {
    /// Explicit target chosen by the caller.
    pub target: Option<ElementId>,
    /// The overlay's close button.
    pub close_button: Option<ElementId>,
}

/// Focus state for one overlay.
pub struct FocusScope {
    host: Rc<dyn FocusHost>,
    container: Option<ElementId>,
    prior: Option<ElementId>,
    focusable: Vec<ElementId>,
    dirty: bool,
}

impl fmt::Debug for FocusScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusScope")
            .field("container", &self.container)
            .field("prior", &self.prior)
            .field("focusable", &self.focusable)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl FocusScope {
    pub fn new(host: Rc<dyn FocusHost>) -> Self {
        Self {
            host,
            container: None,
            prior: None,
            focusable: Vec::new(),
            dirty: true,
        }
    }

    /// Remember the currently focused element. Call before the overlay
    /// content is mounted.
    pub fn capture(&mut self) {
        self.prior = self.host.active_element();
    }

    /// The element captured by [`capture`](Self::capture).
    #[must_use]
    pub fn prior_focus(&self) -> Option<ElementId> {
        self.prior
    }

    /// Scope the trap to `container`'s descendants.
    pub fn attach(&mut self, container: ElementId) {
        self.container = Some(container);
        self.dirty = true;
    }

    /// The container the trap is scoped to.
    #[must_use]
    pub fn container(&self) -> Option<ElementId> {
        self.container
    }

    /// Mark the focusable set stale after a content mutation.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Recompute and return the tabbable descendants, in document order.
    pub fn compute_focusable(&mut self) -> &[ElementId] {
        self.focusable = match self.container {
            Some(root) => self
                .host
                .descendants(root)
                .into_iter()
                .filter(|c| c.is_tabbable())
                .map(|c| c.id)
                .collect(),
            None => Vec::new(),
        };
        self.dirty = false;
        &self.focusable
    }

    /// The focusable set, recomputed first if stale.
    pub fn focusable(&mut self) -> &[ElementId] {
        if self.dirty {
            self.compute_focusable();
        }
        &self.focusable
    }

    /// Move focus to the initial target.
    ///
    /// Preference order: explicit target, close button, first focusable
    /// element, the container itself. Returns the element that took focus.
    pub fn focus_initial(&mut self, initial: InitialFocus) -> Option<ElementId> {
        let first = self.focusable().first().copied();
        let candidates = [initial.target, initial.close_button, first, self.container];
        candidates
            .into_iter()
            .flatten()
            .find(|&id| self.host.is_connected(id) && self.host.focus(id))
    }

    /// Contain Tab / Shift+Tab within the focusable set.
    pub fn trap(&mut self, key: &KeyEvent) -> TrapOutcome {
        if !key.is_press() {
            return TrapOutcome::Ignored;
        }
        let backward = if key.is_back_tab() {
            true
        } else if key.is_tab() {
            false
        } else {
            return TrapOutcome::Ignored;
        };

        let active = self.host.active_element();
        let set = self.focusable();
        let (Some(&first), Some(&last)) = (set.first(), set.last()) else {
            return TrapOutcome::Suppressed;
        };
        let position = active.and_then(|a| set.iter().position(|&id| id == a));
        let at_edge = if backward { first } else { last };
        let wrap_to = if backward { last } else { first };

        match position {
            Some(_) if active == Some(at_edge) => {
                self.host.focus(wrap_to);
                TrapOutcome::Wrapped(wrap_to)
            }
            Some(_) => TrapOutcome::PassThrough,
            None => {
                self.host.focus(wrap_to);
                TrapOutcome::Redirected(wrap_to)
            }
        }
    }

    /// Whether focus currently sits inside the container.
    #[must_use]
    pub fn contains_focus(&self) -> bool {
        match (self.container, self.host.active_element()) {
            (Some(root), Some(active)) => self.host.contains(root, active),
            _ => false,
        }
    }

    /// Return focus to the captured element if it is still in the document.
    ///
    /// Returns `true` if focus was moved. The captured element is forgotten
    /// either way.
    pub fn restore(&mut self) -> bool {
        let Some(prior) = self.prior.take() else {
            return false;
        };
        if !self.host.is_connected(prior) {
            tracing::debug!(element = prior.get(), "prior focus target is gone");
            return false;
        }
        self.host.focus(prior)
    }

    /// Drop container scope and cached set (prior focus is kept).
    pub fn detach(&mut self) {
        self.container = None;
        self.focusable.clear();
        self.dirty = true;
    }
}
