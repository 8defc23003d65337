#![forbid(unsafe_code)]

//! Host boundary, input events, and viewport primitives for Lantern.
//!
//! The overlay engine in `lantern-overlay` never touches a concrete
//! rendering technology. Everything it needs from the page is expressed by
//! the traits in [`host`], and everything it reacts to arrives as an
//! [`event::Event`].

pub mod clock;
pub mod event;
pub mod geometry;
pub mod host;
#[cfg(feature = "tracing-json")]
pub mod logging;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;
pub mod viewport;

pub use clock::FrameClock;
pub use event::{
    Event, HitRegion, KeyCode, KeyEvent, KeyEventKind, Modifiers, PointerEvent, PointerEventKind,
    PointerSource,
};
pub use geometry::{Point, ScrollOffset, Size};
pub use host::{
    ElementId, ElementKind, FocusCandidate, FocusHost, MediaQuery, ScrollSurface, StyleProperty,
};
pub use viewport::{Breakpoints, ViewportClass};
