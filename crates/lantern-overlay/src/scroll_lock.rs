#![forbid(unsafe_code)]

//! Reference-counted page scroll lock.
//!
//! Every open overlay holds one [`ScrollLock`]. The manager freezes the page
//! on the first acquire and restores it on the last release, so nested
//! overlays never fight over the body styles.
//!
//! # Invariants
//!
//! 1. The page is frozen iff `lock_count() > 0`.
//! 2. The scroll offset and inline styles are snapshotted exactly once, on
//!    the `0 → 1` transition, and restored exactly once, on `1 → 0`.
//! 3. Each [`ScrollLock`] releases at most once. Dropping it without an
//!    explicit [`ScrollLock::release`] still releases, so teardown on any
//!    exit path keeps the counter balanced.
//! 4. `lock_count()` cannot underflow: only a live guard can release.
//!
//! # Restore order
//!
//! On `1 → 0`, inline styles are put back first and the saved offset is
//! re-applied immediately after, in the same call, so the page does not
//! flash at the top.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use lantern_core::geometry::ScrollOffset;
use lantern_core::host::{ScrollSurface, StyleProperty};

thread_local! {
    static GLOBAL: RefCell<Option<ScrollLockManager>> = const { RefCell::new(None) };
}

/// State captured on the `0 → 1` transition.
#[derive(Debug, Clone)]
struct Snapshot {
    offset: ScrollOffset,
    styles: AHashMap<StyleProperty, Option<String>>,
}

#[derive(Debug, Default)]
struct LockState {
    count: usize,
    saved: Option<Snapshot>,
}

/// Shared scroll-lock coordinator.
///
/// Cloning yields another handle to the same counter. A UI thread normally
/// has a single manager, registered with [`ScrollLockManager::install_global`].
#[derive(Clone)]
pub struct ScrollLockManager {
    surface: Rc<dyn ScrollSurface>,
    state: Rc<RefCell<LockState>>,
}

impl fmt::Debug for ScrollLockManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.state.borrow();
        f.debug_struct("ScrollLockManager")
            .field("lock_count", &st.count)
            .field("saved_offset", &st.saved.as_ref().map(|s| s.offset))
            .finish()
    }
}

impl ScrollLockManager {
    /// Create a manager for `surface`.
    pub fn new(surface: Rc<dyn ScrollSurface>) -> Self {
        Self {
            surface,
            state: Rc::new(RefCell::new(LockState::default())),
        }
    }

    /// Register `manager` as this thread's global instance.
    ///
    /// Returns the previously installed manager, if any.
    pub fn install_global(manager: ScrollLockManager) -> Option<ScrollLockManager> {
        GLOBAL.with(|g| g.borrow_mut().replace(manager))
    }

    /// This thread's global manager, if one was installed.
    #[must_use]
    pub fn global() -> Option<ScrollLockManager> {
        GLOBAL.with(|g| g.borrow().clone())
    }

    /// This thread's global manager, installing one for `surface` on first
    /// use.
    pub fn global_or_init(surface: impl FnOnce() -> Rc<dyn ScrollSurface>) -> ScrollLockManager {
        GLOBAL.with(|g| {
            g.borrow_mut()
                .get_or_insert_with(|| ScrollLockManager::new(surface()))
                .clone()
        })
    }

    /// Number of outstanding locks.
    #[must_use]
    pub fn lock_count(&self) -> usize {
        self.state.borrow().count
    }

    /// Whether the page is currently frozen.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.lock_count() > 0
    }

    /// Scroll offset that will be restored by the outermost release.
    #[must_use]
    pub fn saved_offset(&self) -> Option<ScrollOffset> {
        self.state.borrow().saved.as_ref().map(|s| s.offset)
    }

    /// Whether two handles share the same counter.
    #[must_use]
    pub fn same_manager(&self, other: &ScrollLockManager) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Acquire a lock. The page is frozen on the first outstanding lock.
    #[must_use = "dropping the guard releases the lock immediately"]
    pub fn acquire(&self) -> ScrollLock {
        let first = {
            let mut st = self.state.borrow_mut();
            st.count += 1;
            st.count == 1
        };

        if first {
            let snapshot = self.freeze();
            self.state.borrow_mut().saved = Some(snapshot);
            tracing::debug!(
                offset_x = self.saved_offset().map_or(0.0, |o| o.x),
                offset_y = self.saved_offset().map_or(0.0, |o| o.y),
                "scroll lock engaged"
            );
        } else {
            tracing::trace!(count = self.lock_count(), "scroll lock nested");
        }

        ScrollLock {
            manager: self.clone(),
            released: false,
        }
    }

    fn release_one(&self) {
        let restore = {
            let mut st = self.state.borrow_mut();
            match st.count {
                0 => {
                    tracing::warn!("scroll lock released with no outstanding locks");
                    return;
                }
                1 => {
                    st.count = 0;
                    st.saved.take()
                }
                _ => {
                    st.count -= 1;
                    None
                }
            }
        };

        match restore {
            Some(snapshot) => {
                self.thaw(&snapshot);
                tracing::debug!(offset_y = snapshot.offset.y, "scroll lock released");
            }
            None => tracing::trace!(count = self.lock_count(), "nested scroll lock released"),
        }
    }

    /// Snapshot the page and pin it in place.
    fn freeze(&self) -> Snapshot {
        let offset = self.surface.scroll_offset();
        let styles = StyleProperty::ALL
            .iter()
            .map(|&p| (p, self.surface.style(p)))
            .collect();

        let pinned = [
            (StyleProperty::Position, "fixed".to_string()),
            (StyleProperty::Top, px(-offset.y)),
            (StyleProperty::Left, px(-offset.x)),
            (StyleProperty::Width, "100%".to_string()),
            (StyleProperty::Height, "100%".to_string()),
            (StyleProperty::Overflow, "hidden".to_string()),
            (StyleProperty::TouchAction, "none".to_string()),
        ];
        for (property, value) in pinned {
            self.surface.set_style(property, Some(value));
        }

        Snapshot { offset, styles }
    }

    /// Put the snapshot back: styles first, then the scroll offset.
    fn thaw(&self, snapshot: &Snapshot) {
        for property in StyleProperty::ALL {
            let value = snapshot.styles.get(&property).cloned().flatten();
            self.surface.set_style(property, value);
        }
        self.surface.scroll_to(snapshot.offset);
    }
}

fn px(value: f64) -> String {
    if value == 0.0 {
        "0px".to_string()
    } else {
        format!("{value}px")
    }
}

/// An outstanding scroll lock. Released on [`release`](Self::release) or drop.
#[must_use = "dropping the guard releases the lock immediately"]
pub struct ScrollLock {
    manager: ScrollLockManager,
    released: bool,
}

impl fmt::Debug for ScrollLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollLock")
            .field("released", &self.released)
            .finish()
    }
}

impl ScrollLock {
    /// Release this lock now.
    pub fn release(mut self) {
        self.release_inner();
    }

    /// The manager this lock belongs to.
    pub fn manager(&self) -> &ScrollLockManager {
        &self.manager
    }

    fn release_inner(&mut self) {
        if !self.released {
            self.released = true;
            self.manager.release_one();
        }
    }
}

impl Drop for ScrollLock {
    fn drop(&mut self) {
        self.release_inner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lantern_core::testing::MemoryDocument;
    use proptest::prelude::*;

    fn setup() -> (Rc<MemoryDocument>, ScrollLockManager) {
        let doc = Rc::new(MemoryDocument::new());
        let manager = ScrollLockManager::new(doc.clone());
        (doc, manager)
    }

    #[test]
    fn starts_unlocked() {
        let (_doc, manager) = setup();
        assert_eq!(manager.lock_count(), 0);
        assert!(!manager.is_locked());
        assert!(manager.saved_offset().is_none());
    }

    #[test]
    fn acquire_pins_page_at_offset() {
        let (doc, manager) = setup();
        doc.set_scroll(ScrollOffset::new(0.0, 480.0));

        let lock = manager.acquire();
        assert!(manager.is_locked());
        assert_eq!(doc.style(StyleProperty::Position).as_deref(), Some("fixed"));
        assert_eq!(doc.style(StyleProperty::Top).as_deref(), Some("-480px"));
        assert_eq!(doc.style(StyleProperty::Left).as_deref(), Some("0px"));
        assert_eq!(doc.style(StyleProperty::TouchAction).as_deref(), Some("none"));
        assert_eq!(manager.saved_offset(), Some(ScrollOffset::new(0.0, 480.0)));

        lock.release();
        assert!(!manager.is_locked());
    }

    #[test]
    fn release_restores_styles_and_offset() {
        let (doc, manager) = setup();
        doc.set_style(StyleProperty::Overflow, Some("auto".into()));
        doc.set_scroll(ScrollOffset::new(0.0, 1200.0));

        let lock = manager.acquire();
        // The fixed body reports zero scroll while locked.
        doc.set_scroll(ScrollOffset::default());
        lock.release();

        assert_eq!(doc.style(StyleProperty::Overflow).as_deref(), Some("auto"));
        assert_eq!(doc.style(StyleProperty::Position), None);
        assert_eq!(doc.style(StyleProperty::Top), None);
        assert_eq!(doc.inline_style_count(), 1);
        assert_eq!(doc.scroll_offset(), ScrollOffset::new(0.0, 1200.0));
        assert_eq!(doc.scroll_to_calls(), 1);
    }

    #[test]
    fn nested_locks_restore_once() {
        let (doc, manager) = setup();
        doc.set_scroll(ScrollOffset::new(0.0, 250.0));

        let outer = manager.acquire();
        let inner = manager.acquire();
        assert_eq!(manager.lock_count(), 2);

        inner.release();
        assert_eq!(manager.lock_count(), 1);
        assert_eq!(doc.scroll_to_calls(), 0);
        assert_eq!(doc.style(StyleProperty::Position).as_deref(), Some("fixed"));

        outer.release();
        assert_eq!(manager.lock_count(), 0);
        assert_eq!(doc.scroll_to_calls(), 1);
        assert_eq!(doc.scroll_offset().y, 250.0);
    }

    #[test]
    fn out_of_order_release_keeps_page_frozen() {
        let (doc, manager) = setup();
        let first = manager.acquire();
        let second = manager.acquire();

        first.release();
        assert!(manager.is_locked());
        assert_eq!(doc.style(StyleProperty::Position).as_deref(), Some("fixed"));

        second.release();
        assert!(!manager.is_locked());
        assert_eq!(doc.style(StyleProperty::Position), None);
    }

    #[test]
    fn drop_releases() {
        let (_doc, manager) = setup();
        {
            let _lock = manager.acquire();
            assert_eq!(manager.lock_count(), 1);
        }
        assert_eq!(manager.lock_count(), 0);
    }

    #[test]
    fn clones_share_the_counter() {
        let (_doc, manager) = setup();
        let other = manager.clone();
        let _lock = other.acquire();
        assert_eq!(manager.lock_count(), 1);
        assert!(manager.same_manager(&other));
    }

    #[test]
    fn global_install_and_lookup() {
        let (_doc, manager) = setup();
        let previous = ScrollLockManager::install_global(manager.clone());
        let global = ScrollLockManager::global().expect("installed");
        assert!(global.same_manager(&manager));
        if let Some(prev) = previous {
            ScrollLockManager::install_global(prev);
        }
    }

    #[test]
    fn global_or_init_installs_once() {
        let doc = Rc::new(MemoryDocument::new());
        let first = ScrollLockManager::global_or_init(|| doc.clone() as Rc<dyn ScrollSurface>);
        let second = ScrollLockManager::global_or_init(|| Rc::new(MemoryDocument::new()) as Rc<dyn ScrollSurface>);
        assert!(first.same_manager(&second));

        let lock = second.acquire();
        assert_eq!(first.lock_count(), 1);
        drop(lock);
    }

    #[test]
    fn relock_after_full_release_takes_fresh_snapshot() {
        let (doc, manager) = setup();
        doc.set_scroll(ScrollOffset::new(0.0, 100.0));
        manager.acquire().release();

        doc.set_scroll(ScrollOffset::new(0.0, 900.0));
        let lock = manager.acquire();
        assert_eq!(manager.saved_offset(), Some(ScrollOffset::new(0.0, 900.0)));
        drop(lock);
        assert_eq!(doc.scroll_offset().y, 900.0);
    }

    proptest! {
        #[test]
        fn lock_count_tracks_outstanding_guards(ops in proptest::collection::vec(any::<(bool, u8)>(), 0..64)) {
            let (doc, manager) = setup();
            doc.set_scroll(ScrollOffset::new(0.0, 77.0));
            let mut held: Vec<ScrollLock> = Vec::new();

            for (acquire, pick) in ops {
                if acquire {
                    held.push(manager.acquire());
                } else if !held.is_empty() {
                    let idx = pick as usize % held.len();
                    held.swap_remove(idx).release();
                }
                prop_assert_eq!(manager.lock_count(), held.len());
                prop_assert_eq!(manager.is_locked(), !held.is_empty());
                prop_assert_eq!(
                    doc.style(StyleProperty::Position).is_some(),
                    !held.is_empty()
                );
            }

            held.clear();
            prop_assert_eq!(manager.lock_count(), 0);
            prop_assert_eq!(doc.style(StyleProperty::Position), None);
        }
    }
}
