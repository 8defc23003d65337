#![forbid(unsafe_code)]

//! Input events delivered by the host environment.
//!
//! Events are never generated by the engine itself. The host translates its
//! native keyboard, pointer/touch, and resize notifications into [`Event`]
//! values and forwards them to the overlay that owns input.
//!
//! Pointer events carry a [`HitRegion`] that the host has already resolved,
//! in the same way a hit grid is consulted before a click is routed.

use bitflags::bitflags;

use crate::geometry::{Point, Size};

/// Canonical input event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A keyboard event.
    Key(KeyEvent),
    /// A mouse, touch, or pen event.
    Pointer(PointerEvent),
    /// The host surface changed size.
    Resize(Size),
}

impl Event {
    /// Shorthand for a key press without modifiers.
    pub fn key(code: KeyCode) -> Self {
        Self::Key(KeyEvent::new(code))
    }
}

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
    pub kind: KeyEventKind,
}

impl KeyEvent {
    /// A key press with no modifiers.
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
            kind: KeyEventKind::Press,
        }
    }

    /// Replace the modifier set.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Replace the event kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: KeyEventKind) -> Self {
        self.kind = kind;
        self
    }

    #[inline]
    pub fn is_press(&self) -> bool {
        matches!(self.kind, KeyEventKind::Press | KeyEventKind::Repeat)
    }

    /// Forward Tab navigation.
    pub fn is_tab(&self) -> bool {
        self.code == KeyCode::Tab && !self.modifiers.contains(Modifiers::SHIFT)
    }

    /// Backwards Tab navigation (`Shift+Tab` or a dedicated back-tab code).
    pub fn is_back_tab(&self) -> bool {
        self.code == KeyCode::BackTab
            || (self.code == KeyCode::Tab && self.modifiers.contains(Modifiers::SHIFT))
    }
}

/// Key identifiers the engine cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Escape,
    Tab,
    BackTab,
    Enter,
    Char(char),
}

/// Press, repeat, or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEventKind {
    #[default]
    Press,
    Repeat,
    Release,
}

bitflags! {
    /// Keyboard modifier set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0000_0001;
        const ALT   = 0b0000_0010;
        const CTRL  = 0b0000_0100;
        const SUPER = 0b0000_1000;
    }
}

/// Pointer phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerEventKind {
    Down,
    Move,
    Up,
    /// The platform aborted the gesture (e.g. `touchcancel`).
    Cancel,
}

/// Physical input device behind a pointer event.
///
/// Mouse and touch input follow the same contract; the source is only used
/// to keep a second device from hijacking a gesture already in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PointerSource {
    #[default]
    Mouse,
    Touch,
    Pen,
}

/// Overlay region under the pointer, as resolved by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HitRegion {
    /// The dimmed layer behind the panel.
    Backdrop,
    /// The panel body.
    Panel,
    /// The grab area of an edge-anchored sheet.
    DragHandle,
    /// Anything not belonging to the overlay.
    #[default]
    Outside,
}

/// A mouse, touch, or pen event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub position: Point,
    pub source: PointerSource,
    pub region: HitRegion,
}

impl PointerEvent {
    /// Create a pointer event at `(x, y)`.
    pub const fn new(kind: PointerEventKind, x: f64, y: f64) -> Self {
        Self {
            kind,
            position: Point::new(x, y),
            source: PointerSource::Mouse,
            region: HitRegion::Outside,
        }
    }

    #[must_use]
    pub const fn source(mut self, source: PointerSource) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub const fn region(mut self, region: HitRegion) -> Self {
        self.region = region;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_tab_is_back_tab() {
        let ev = KeyEvent::new(KeyCode::Tab).with_modifiers(Modifiers::SHIFT);
        assert!(ev.is_back_tab());
        assert!(!ev.is_tab());
    }

    #[test]
    fn back_tab_code_is_back_tab() {
        let ev = KeyEvent::new(KeyCode::BackTab);
        assert!(ev.is_back_tab());
        assert!(!ev.is_tab());
    }

    #[test]
    fn plain_tab_is_forward() {
        let ev = KeyEvent::new(KeyCode::Tab);
        assert!(ev.is_tab());
        assert!(!ev.is_back_tab());
    }

    #[test]
    fn release_is_not_press() {
        let ev = KeyEvent::new(KeyCode::Escape).with_kind(KeyEventKind::Release);
        assert!(!ev.is_press());
        assert!(KeyEvent::new(KeyCode::Escape).with_kind(KeyEventKind::Repeat).is_press());
    }

    #[test]
    fn pointer_builder() {
        let ev = PointerEvent::new(PointerEventKind::Down, 4.0, 20.0)
            .source(PointerSource::Touch)
            .region(HitRegion::DragHandle);
        assert_eq!(ev.source, PointerSource::Touch);
        assert_eq!(ev.region, HitRegion::DragHandle);
        assert_eq!(ev.position.y, 20.0);
    }
}
