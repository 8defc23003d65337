#![forbid(unsafe_code)]

//! In-memory host document for engine tests.
//!
//! [`MemoryDocument`] implements [`FocusHost`], [`ScrollSurface`], and
//! [`MediaQuery`] over a flat element list kept in document order. It also
//! simulates the browser's default Tab behavior via [`MemoryDocument::tab`]
//! so focus-trap tests can interleave trapped and untrapped moves.

use std::cell::RefCell;

use ahash::AHashMap;

use crate::geometry::{ScrollOffset, Size};
use crate::host::{
    ElementId, ElementKind, FocusCandidate, FocusHost, MediaQuery, ScrollSurface, StyleProperty,
};

#[derive(Debug, Clone)]
struct Node {
    candidate: FocusCandidate,
    parent: Option<ElementId>,
    connected: bool,
}

#[derive(Debug)]
struct DocState {
    next_id: u64,
    nodes: Vec<Node>,
    active: Option<ElementId>,
    scroll: ScrollOffset,
    styles: AHashMap<StyleProperty, String>,
    scroll_to_calls: usize,
    viewport: Size,
    reduced_motion: bool,
}

impl DocState {
    fn index_of(&self, id: ElementId) -> Option<usize> {
        self.nodes.iter().position(|n| n.candidate.id == id)
    }

    fn parent_of(&self, id: ElementId) -> Option<ElementId> {
        self.index_of(id).and_then(|i| self.nodes[i].parent)
    }

    fn is_within(&self, root: ElementId, id: ElementId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == root {
                return true;
            }
            cursor = self.parent_of(current);
        }
        false
    }

    fn is_connected(&self, id: ElementId) -> bool {
        self.index_of(id).is_some_and(|i| self.nodes[i].connected)
    }

    fn update(&mut self, id: ElementId, f: impl FnOnce(&mut FocusCandidate)) {
        if let Some(i) = self.index_of(id) {
            f(&mut self.nodes[i].candidate);
        }
    }
}

/// In-memory document implementing every host trait.
#[derive(Debug)]
pub struct MemoryDocument {
    body: ElementId,
    state: RefCell<DocState>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// An empty document with a 1280x800 viewport.
    pub fn new() -> Self {
        let body = ElementId(1);
        let mut body_candidate = FocusCandidate::new(body, ElementKind::Generic);
        body_candidate.tab_index = Some(-1);
        Self {
            body,
            state: RefCell::new(DocState {
                next_id: 2,
                nodes: vec![Node {
                    candidate: body_candidate,
                    parent: None,
                    connected: true,
                }],
                active: None,
                scroll: ScrollOffset::default(),
                styles: AHashMap::new(),
                scroll_to_calls: 0,
                viewport: Size::new(1280, 800),
                reduced_motion: false,
            }),
        }
    }

    /// The document body.
    pub fn body(&self) -> ElementId {
        self.body
    }

    /// Append a child as the last descendant of `parent`.
    pub fn append(&self, parent: ElementId, kind: ElementKind) -> ElementId {
        let mut st = self.state.borrow_mut();
        let id = ElementId(st.next_id);
        st.next_id += 1;

        let parent_idx = st.index_of(parent).unwrap_or(0);
        let mut insert_at = parent_idx + 1;
        while insert_at < st.nodes.len() && st.is_within(parent, st.nodes[insert_at].candidate.id)
        {
            insert_at += 1;
        }
        st.nodes.insert(
            insert_at,
            Node {
                candidate: FocusCandidate::new(id, kind),
                parent: Some(parent),
                connected: true,
            },
        );
        id
    }

    /// Detach `id` and all of its descendants.
    pub fn remove(&self, id: ElementId) {
        let mut st = self.state.borrow_mut();
        let doomed: Vec<ElementId> = st
            .nodes
            .iter()
            .map(|n| n.candidate.id)
            .filter(|&n| st.is_within(id, n))
            .collect();
        for node in st.nodes.iter_mut() {
            if doomed.contains(&node.candidate.id) {
                node.connected = false;
            }
        }
        if st.active.is_some_and(|a| doomed.contains(&a)) {
            st.active = None;
        }
    }

    pub fn set_visible(&self, id: ElementId, visible: bool) {
        self.state.borrow_mut().update(id, |c| c.visible = visible);
    }

    pub fn set_disabled(&self, id: ElementId, disabled: bool) {
        self.state.borrow_mut().update(id, |c| c.disabled = disabled);
    }

    pub fn set_aria_hidden(&self, id: ElementId, hidden: bool) {
        self.state.borrow_mut().update(id, |c| c.aria_hidden = hidden);
    }

    pub fn set_tab_index(&self, id: ElementId, tab_index: Option<i32>) {
        self.state.borrow_mut().update(id, |c| c.tab_index = tab_index);
    }

    /// Simulate the user scrolling (not counted as a `scroll_to` call).
    pub fn set_scroll(&self, offset: ScrollOffset) {
        self.state.borrow_mut().scroll = offset;
    }

    /// Number of programmatic `scroll_to` calls so far.
    pub fn scroll_to_calls(&self) -> usize {
        self.state.borrow().scroll_to_calls
    }

    /// Number of inline styles currently set on the body.
    pub fn inline_style_count(&self) -> usize {
        self.state.borrow().styles.len()
    }

    pub fn set_viewport(&self, size: Size) {
        self.state.borrow_mut().viewport = size;
    }

    pub fn set_reduced_motion(&self, reduced: bool) {
        self.state.borrow_mut().reduced_motion = reduced;
    }

    /// Browser default Tab: move to the next (or previous) tabbable element
    /// in document order, wrapping at the ends.
    pub fn tab(&self, backward: bool) -> Option<ElementId> {
        let mut st = self.state.borrow_mut();
        let order: Vec<ElementId> = st
            .nodes
            .iter()
            .filter(|n| n.connected && n.candidate.is_tabbable())
            .map(|n| n.candidate.id)
            .collect();
        if order.is_empty() {
            return st.active;
        }
        let pos = st.active.and_then(|a| order.iter().position(|&id| id == a));
        let next = match (pos, backward) {
            (Some(i), false) => order[(i + 1) % order.len()],
            (Some(i), true) => order[(i + order.len() - 1) % order.len()],
            (None, false) => order[0],
            (None, true) => order[order.len() - 1],
        };
        st.active = Some(next);
        Some(next)
    }
}

impl FocusHost for MemoryDocument {
    fn active_element(&self) -> Option<ElementId> {
        self.state.borrow().active
    }

    fn focus(&self, id: ElementId) -> bool {
        let mut st = self.state.borrow_mut();
        if !st.is_connected(id) {
            return false;
        }
        st.active = Some(id);
        true
    }

    fn is_connected(&self, id: ElementId) -> bool {
        self.state.borrow().is_connected(id)
    }

    fn descendants(&self, root: ElementId) -> Vec<FocusCandidate> {
        let st = self.state.borrow();
        st.nodes
            .iter()
            .filter(|n| n.connected && n.candidate.id != root && st.is_within(root, n.candidate.id))
            .map(|n| n.candidate)
            .collect()
    }

    fn contains(&self, root: ElementId, id: ElementId) -> bool {
        self.state.borrow().is_within(root, id)
    }
}

impl ScrollSurface for MemoryDocument {
    fn scroll_offset(&self) -> ScrollOffset {
        self.state.borrow().scroll
    }

    fn scroll_to(&self, offset: ScrollOffset) {
        let mut st = self.state.borrow_mut();
        st.scroll = offset;
        st.scroll_to_calls += 1;
    }

    fn style(&self, property: StyleProperty) -> Option<String> {
        self.state.borrow().styles.get(&property).cloned()
    }

    fn set_style(&self, property: StyleProperty, value: Option<String>) {
        let mut st = self.state.borrow_mut();
        match value {
            Some(v) => {
                st.styles.insert(property, v);
            }
            None => {
                st.styles.remove(&property);
            }
        }
    }
}

impl MediaQuery for MemoryDocument {
    fn viewport(&self) -> Size {
        self.state.borrow().viewport
    }

    fn prefers_reduced_motion(&self) -> bool {
        self.state.borrow().reduced_motion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_keeps_document_order() {
        let doc = MemoryDocument::new();
        let a = doc.append(doc.body(), ElementKind::Generic);
        let b = doc.append(doc.body(), ElementKind::Button);
        let a_child = doc.append(a, ElementKind::Input);

        let ids: Vec<_> = doc.descendants(doc.body()).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![a, a_child, b]);
    }

    #[test]
    fn remove_disconnects_subtree_and_clears_focus() {
        let doc = MemoryDocument::new();
        let panel = doc.append(doc.body(), ElementKind::Generic);
        let button = doc.append(panel, ElementKind::Button);
        assert!(doc.focus(button));

        doc.remove(panel);
        assert!(!doc.is_connected(panel));
        assert!(!doc.is_connected(button));
        assert_eq!(doc.active_element(), None);
        assert!(!doc.focus(button));
    }

    #[test]
    fn default_tab_wraps() {
        let doc = MemoryDocument::new();
        let a = doc.append(doc.body(), ElementKind::Button);
        let b = doc.append(doc.body(), ElementKind::Button);
        assert_eq!(doc.tab(false), Some(a));
        assert_eq!(doc.tab(false), Some(b));
        assert_eq!(doc.tab(false), Some(a));
        assert_eq!(doc.tab(true), Some(b));
    }

    #[test]
    fn scroll_to_is_counted() {
        let doc = MemoryDocument::new();
        doc.set_scroll(ScrollOffset::new(0.0, 300.0));
        assert_eq!(doc.scroll_to_calls(), 0);
        doc.scroll_to(ScrollOffset::new(0.0, 10.0));
        assert_eq!(doc.scroll_to_calls(), 1);
        assert_eq!(doc.scroll_offset().y, 10.0);
    }

    #[test]
    fn styles_set_and_remove() {
        let doc = MemoryDocument::new();
        doc.set_style(StyleProperty::Position, Some("fixed".into()));
        assert_eq!(doc.style(StyleProperty::Position).as_deref(), Some("fixed"));
        doc.set_style(StyleProperty::Position, None);
        assert_eq!(doc.style(StyleProperty::Position), None);
        assert_eq!(doc.inline_style_count(), 0);
    }
}
