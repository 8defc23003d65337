#![no_main]

use std::rc::Rc;
use std::time::Duration;

use arbitrary::Arbitrary;
use lantern_core::event::{
    Event, HitRegion, KeyCode, KeyEvent, Modifiers, PointerEvent, PointerEventKind, PointerSource,
};
use lantern_core::geometry::Size;
use lantern_core::host::ElementKind;
use lantern_core::testing::MemoryDocument;
use lantern_overlay::{
    CloseReason, LayoutMode, OverlayConfig, OverlayEnv, OverlaySession, OverlayState,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Open(bool),
    Close(bool),
    Unmount(bool),
    Key { second: bool, escape: bool, shift: bool },
    Pointer { second: bool, kind: u8, y: i16, region: u8, source: u8 },
    Resize { width: u16, height: u16 },
    Tick(u8),
    Busy(bool),
}

fn kind(k: u8) -> PointerEventKind {
    match k % 4 {
        0 => PointerEventKind::Down,
        1 => PointerEventKind::Move,
        2 => PointerEventKind::Up,
        _ => PointerEventKind::Cancel,
    }
}

fn region(r: u8) -> HitRegion {
    match r % 4 {
        0 => HitRegion::DragHandle,
        1 => HitRegion::Backdrop,
        2 => HitRegion::Panel,
        _ => HitRegion::Outside,
    }
}

fn source(s: u8) -> PointerSource {
    match s % 3 {
        0 => PointerSource::Touch,
        1 => PointerSource::Mouse,
        _ => PointerSource::Pen,
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let doc = Rc::new(MemoryDocument::new());
    doc.set_viewport(Size::new(390, 844));
    let body = doc.body();
    let panel = doc.append(body, ElementKind::Generic);
    doc.append(panel, ElementKind::Button);
    doc.append(panel, ElementKind::Input);

    let env = OverlayEnv::for_document(&doc);
    let mut sessions = [
        OverlaySession::new(&env, OverlayConfig::new().container(panel)),
        OverlaySession::new(&env, OverlayConfig::new()),
    ];

    for op in ops.into_iter().take(256) {
        match op {
            Op::Open(i) => sessions[usize::from(i)].open(),
            Op::Close(i) => {
                sessions[usize::from(i)].request_close(CloseReason::CloseButton);
            }
            Op::Unmount(i) => sessions[usize::from(i)].unmount(),
            Op::Key { second, escape, shift } => {
                let code = if escape { KeyCode::Escape } else { KeyCode::Tab };
                let mods = if shift { Modifiers::SHIFT } else { Modifiers::empty() };
                let event = Event::Key(KeyEvent::new(code).with_modifiers(mods));
                sessions[usize::from(second)].handle_event(&event);
            }
            Op::Pointer { second, kind: k, y, region: r, source: s } => {
                let event = Event::Pointer(
                    PointerEvent::new(kind(k), 0.0, f64::from(y))
                        .source(source(s))
                        .region(region(r)),
                );
                sessions[usize::from(second)].handle_event(&event);
            }
            Op::Resize { width, height } => {
                let event = Event::Resize(Size::new(u32::from(width), u32::from(height)));
                for s in sessions.iter_mut() {
                    s.handle_event(&event);
                }
            }
            Op::Tick(ms) => {
                for s in sessions.iter_mut() {
                    s.tick(Duration::from_millis(u64::from(ms)));
                }
            }
            Op::Busy(busy) => sessions[0].handle().set_busy(busy),
        }

        let live = sessions.iter().filter(|s| s.state() != OverlayState::Closed).count();
        assert_eq!(env.scroll_locks.lock_count(), live);
        for s in &sessions {
            if s.state() == OverlayState::Dragging {
                assert_eq!(s.layout_mode(), LayoutMode::Sheet);
            }
        }
    }

    drop(sessions);
    assert_eq!(env.scroll_locks.lock_count(), 0);
    assert_eq!(doc.inline_style_count(), 0);
});
