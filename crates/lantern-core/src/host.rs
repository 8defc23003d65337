#![forbid(unsafe_code)]

//! Host boundary traits.
//!
//! These traits are the only way the overlay engine observes or mutates the
//! page. They are deliberately small and take `&self`: a host backs them
//! with interior mutability (a DOM binding already behaves that way), which
//! lets an overlay keep a shared `Rc` handle and still reach the host from
//! `Drop` during abnormal teardown.
//!
//! # Contract
//!
//! - Implementations must never panic on stale identifiers. An
//!   [`ElementId`] that no longer refers to a live element is simply
//!   "not connected".
//! - [`FocusHost::descendants`] returns candidates in document order.

use crate::geometry::{ScrollOffset, Size};

/// Opaque handle to a host element.
///
/// Holding an `ElementId` does not keep the element alive; it behaves like a
/// weak reference and must be checked with [`FocusHost::is_connected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

impl ElementId {
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Broad element category used to decide focusability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Button,
    /// An anchor; only focusable by default when it has an `href`.
    Link { href: bool },
    Input,
    Select,
    TextArea,
    /// Any other element; focusable only through a non-negative tab index.
    Generic,
}

impl ElementKind {
    /// Whether the element takes focus without an explicit tab index.
    #[inline]
    pub const fn is_natively_interactive(self) -> bool {
        match self {
            Self::Button | Self::Input | Self::Select | Self::TextArea => true,
            Self::Link { href } => href,
            Self::Generic => false,
        }
    }
}

/// Snapshot of an element as seen by focus enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusCandidate {
    pub id: ElementId,
    pub kind: ElementKind,
    pub visible: bool,
    pub disabled: bool,
    pub aria_hidden: bool,
    pub tab_index: Option<i32>,
}

impl FocusCandidate {
    /// A visible, enabled element with no explicit tab index.
    pub const fn new(id: ElementId, kind: ElementKind) -> Self {
        Self {
            id,
            kind,
            visible: true,
            disabled: false,
            aria_hidden: false,
            tab_index: None,
        }
    }

    /// Whether Tab navigation can land on this element.
    pub fn is_tabbable(&self) -> bool {
        if !self.visible || self.disabled || self.aria_hidden {
            return false;
        }
        match self.tab_index {
            Some(idx) if idx < 0 => false,
            Some(_) => true,
            None => self.kind.is_natively_interactive(),
        }
    }
}

/// Focus access on the host document.
pub trait FocusHost {
    /// The element that currently holds focus, if any.
    fn active_element(&self) -> Option<ElementId>;

    /// Move focus to `id`. Returns `false` if the element cannot take focus.
    fn focus(&self, id: ElementId) -> bool;

    /// Whether `id` still refers to an element attached to the document.
    fn is_connected(&self, id: ElementId) -> bool;

    /// All descendants of `root` (excluding `root`), in document order.
    fn descendants(&self, root: ElementId) -> Vec<FocusCandidate>;

    /// Whether `id` is `root` or one of its descendants.
    fn contains(&self, root: ElementId, id: ElementId) -> bool;
}

/// Style properties touched by the scroll lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleProperty {
    Position,
    Top,
    Left,
    Width,
    Height,
    Overflow,
    TouchAction,
}

impl StyleProperty {
    /// Every property the scroll lock snapshots, in application order.
    pub const ALL: [StyleProperty; 7] = [
        Self::Position,
        Self::Top,
        Self::Left,
        Self::Width,
        Self::Height,
        Self::Overflow,
        Self::TouchAction,
    ];

    /// CSS property name.
    pub const fn css_name(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Top => "top",
            Self::Left => "left",
            Self::Width => "width",
            Self::Height => "height",
            Self::Overflow => "overflow",
            Self::TouchAction => "touch-action",
        }
    }
}

/// The scrollable page body.
pub trait ScrollSurface {
    /// Current scroll position.
    fn scroll_offset(&self) -> ScrollOffset;

    /// Jump to `offset` without smooth scrolling.
    fn scroll_to(&self, offset: ScrollOffset);

    /// Inline style value, `None` when unset.
    fn style(&self, property: StyleProperty) -> Option<String>;

    /// Set (`Some`) or remove (`None`) an inline style value.
    fn set_style(&self, property: StyleProperty, value: Option<String>);
}

/// Environment queries sampled when an overlay opens or the surface resizes.
pub trait MediaQuery {
    /// Current size of the host surface.
    fn viewport(&self) -> Size;

    /// Whether the user asked for reduced motion.
    fn prefers_reduced_motion(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_controls_are_tabbable() {
        for kind in [
            ElementKind::Button,
            ElementKind::Input,
            ElementKind::Select,
            ElementKind::TextArea,
            ElementKind::Link { href: true },
        ] {
            assert!(FocusCandidate::new(ElementId(1), kind).is_tabbable(), "{kind:?}");
        }
    }

    #[test]
    fn anchor_without_href_is_not_tabbable() {
        let c = FocusCandidate::new(ElementId(1), ElementKind::Link { href: false });
        assert!(!c.is_tabbable());
    }

    #[test]
    fn generic_needs_tab_index() {
        let mut c = FocusCandidate::new(ElementId(1), ElementKind::Generic);
        assert!(!c.is_tabbable());
        c.tab_index = Some(0);
        assert!(c.is_tabbable());
        c.tab_index = Some(-1);
        assert!(!c.is_tabbable());
    }

    #[test]
    fn hidden_disabled_and_aria_hidden_are_skipped() {
        let base = FocusCandidate::new(ElementId(1), ElementKind::Button);
        assert!(!FocusCandidate { visible: false, ..base }.is_tabbable());
        assert!(!FocusCandidate { disabled: true, ..base }.is_tabbable());
        assert!(!FocusCandidate { aria_hidden: true, ..base }.is_tabbable());
    }

    #[test]
    fn css_names() {
        assert_eq!(StyleProperty::TouchAction.css_name(), "touch-action");
        assert_eq!(StyleProperty::ALL.len(), 7);
    }
}
