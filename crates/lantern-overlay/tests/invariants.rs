#![forbid(unsafe_code)]

//! Property tests for focus containment, focus restoration, and lock
//! balance across arbitrary event sequences.

use std::rc::Rc;
use std::time::Duration;

use lantern_core::event::{
    Event, HitRegion, KeyCode, KeyEvent, Modifiers, PointerEvent, PointerEventKind, PointerSource,
};
use lantern_core::geometry::Size;
use lantern_core::host::{ElementId, ElementKind, FocusHost};
use lantern_core::testing::MemoryDocument;
use lantern_overlay::{CloseReason, OverlayConfig, OverlayEnv, OverlaySession, OverlayState};
use proptest::prelude::*;

const FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Clone)]
enum Step {
    Tab,
    BackTab,
    Toggle(usize),
    Tick,
    Grab,
    Pull(f64),
    Release,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => Just(Step::Tab),
        4 => Just(Step::BackTab),
        1 => (0usize..6).prop_map(Step::Toggle),
        2 => Just(Step::Tick),
        1 => Just(Step::Grab),
        1 => (0.0f64..90.0).prop_map(Step::Pull),
        1 => Just(Step::Release),
    ]
}

fn handle(kind: PointerEventKind, y: f64) -> Event {
    Event::Pointer(
        PointerEvent::new(kind, 40.0, y)
            .source(PointerSource::Touch)
            .region(HitRegion::DragHandle),
    )
}

fn settle(session: &mut OverlaySession) {
    for _ in 0..100 {
        if matches!(session.tick(FRAME), OverlayState::Open | OverlayState::Closed) {
            return;
        }
    }
}

proptest! {
    #[test]
    fn tab_never_leaves_open_overlay(
        inside in 1usize..6,
        compact in any::<bool>(),
        settle_first in any::<bool>(),
        steps in proptest::collection::vec(step(), 1..48),
    ) {
        let doc = Rc::new(MemoryDocument::new());
        if compact {
            doc.set_viewport(Size::new(390, 844));
        }
        let body = doc.body();
        let before = doc.append(body, ElementKind::Button);
        let panel = doc.append(body, ElementKind::Generic);
        let items: Vec<ElementId> = (0..inside)
            .map(|i| {
                let kind = if i % 2 == 0 { ElementKind::Button } else { ElementKind::Input };
                doc.append(panel, kind)
            })
            .collect();
        doc.append(body, ElementKind::Link { href: true });
        doc.focus(before);

        let env = OverlayEnv::for_document(&doc);
        let mut session = OverlaySession::new(&env, OverlayConfig::new().container(panel));
        session.open();
        if settle_first {
            settle(&mut session);
            prop_assert!(doc.contains(panel, doc.active_element().unwrap_or(body)));
        }

        let inside_panel = |active: Option<ElementId>| active.is_some_and(|a| doc.contains(panel, a));
        let mut disabled = vec![false; inside];
        let mut pull = 0.0;
        for step in steps {
            let prior = doc.active_element();
            let trapping = session.state().traps_focus();
            match step {
                Step::Tab | Step::BackTab => {
                    let backward = matches!(step, Step::BackTab);
                    let key = if backward {
                        KeyEvent::new(KeyCode::Tab).with_modifiers(Modifiers::SHIFT)
                    } else {
                        KeyEvent::new(KeyCode::Tab)
                    };
                    let out = session.handle_event(&Event::Key(key));
                    if !out.prevents_default() {
                        doc.tab(backward);
                    }
                    if trapping {
                        let active = doc.active_element();
                        if disabled.iter().any(|d| !d) {
                            prop_assert!(
                                inside_panel(active),
                                "{:?}: focus escaped to {:?}",
                                session.state(),
                                active
                            );
                        } else {
                            prop_assert!(inside_panel(active) || active == prior);
                        }
                    }
                }
                Step::Toggle(i) => {
                    let i = i % inside;
                    disabled[i] = !disabled[i];
                    doc.set_disabled(items[i], disabled[i]);
                    session.notify_content_changed();
                }
                Step::Tick => {
                    session.tick(FRAME);
                }
                Step::Grab => {
                    pull = 0.0;
                    session.handle_event(&handle(PointerEventKind::Down, 200.0));
                }
                Step::Pull(dy) => {
                    pull = dy;
                    session.handle_event(&handle(PointerEventKind::Move, 200.0 + dy));
                }
                Step::Release => {
                    session.handle_event(&handle(PointerEventKind::Up, 200.0 + pull));
                }
            }
            prop_assert!(session.state().traps_focus(), "pulls stay under the threshold");
            if matches!(session.state(), OverlayState::Open | OverlayState::Dragging) {
                let active = doc.active_element();
                prop_assert!(inside_panel(active), "focus escaped to {:?}", active);
            }
        }
    }

    #[test]
    fn close_restores_prior_focus(triggers in 1usize..8, pick in 0usize..8, escape in any::<bool>()) {
        let doc = Rc::new(MemoryDocument::new());
        let body = doc.body();
        let buttons: Vec<ElementId> =
            (0..triggers).map(|_| doc.append(body, ElementKind::Button)).collect();
        let panel = doc.append(body, ElementKind::Generic);
        doc.append(panel, ElementKind::Button);
        let prior = buttons[pick % triggers];
        doc.focus(prior);

        let env = OverlayEnv::for_document(&doc);
        let mut session = OverlaySession::new(&env, OverlayConfig::new().container(panel));
        session.open();
        settle(&mut session);
        prop_assert_ne!(doc.active_element(), Some(prior));

        if escape {
            session.handle_event(&Event::key(KeyCode::Escape));
        } else {
            session.request_close(CloseReason::CloseButton);
        }
        settle(&mut session);
        prop_assert_eq!(session.state(), OverlayState::Closed);
        prop_assert_eq!(doc.active_element(), Some(prior));
    }

    #[test]
    fn lock_count_matches_live_sessions(ops in proptest::collection::vec((0usize..3, 0u8..4), 0..40)) {
        let doc = Rc::new(MemoryDocument::new());
        let env = OverlayEnv::for_document(&doc);
        let mut sessions: Vec<OverlaySession> =
            (0..3).map(|_| OverlaySession::new(&env, OverlayConfig::new())).collect();

        for (idx, op) in ops {
            let s = &mut sessions[idx];
            match op {
                0 => s.open(),
                1 => {
                    s.request_close(CloseReason::Requested);
                }
                2 => s.unmount(),
                _ => {
                    for s in sessions.iter_mut() {
                        s.tick(Duration::from_millis(120));
                    }
                }
            }
            let live = sessions.iter().filter(|s| s.state() != OverlayState::Closed).count();
            prop_assert_eq!(env.scroll_locks.lock_count(), live);
            prop_assert_eq!(env.scroll_locks.is_locked(), live > 0);
        }

        drop(sessions);
        prop_assert_eq!(env.scroll_locks.lock_count(), 0);
        prop_assert_eq!(doc.inline_style_count(), 0);
    }
}
