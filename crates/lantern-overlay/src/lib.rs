#![forbid(unsafe_code)]

//! Overlay lifecycle engine: dialogs and bottom sheets.
//!
//! An [`OverlaySession`] owns one open/close lifecycle and coordinates:
//!
//! - [`ScrollLockManager`]: reference-counted page scroll freezing,
//! - [`FocusScope`]: focus capture, Tab containment, and restoration,
//! - [`GestureTracker`]: drag-to-dismiss for sheets,
//! - [`AnimationTimeline`]: phased, cancellable enter/exit motion.
//!
//! Hosts feed it [`Event`](lantern_core::Event)s and frame ticks and read
//! back [`OverlayState`] and [`VisualFrame`]. Several overlays open at once
//! are managed by an [`OverlayStack`].
//!
//! # Example
//!
//! ```ignore
//! let env = OverlayEnv::for_document(&document);
//! let mut session = OverlaySession::new(
//!     &env,
//!     presets::prayer_request()
//!         .container(panel)
//!         .close_button(close)
//!         .on_closed(|reason| tracing::info!(?reason, "prayer request closed")),
//! );
//! session.open();
//!
//! // Each animation frame:
//! session.tick(clock.frame());
//! render(session.visual_frame());
//! ```

pub mod animation;
pub mod auto_open;
pub mod config;
pub mod focus;
pub mod gesture;
pub mod presets;
pub mod scroll_lock;
pub mod session;
pub mod settings;
pub mod stack;

pub use animation::{
    AnimationPhase, AnimationSettings, AnimationTimeline, Completion, Direction, Easing, RunId,
    TimelineRequest, TweenTimeline, VisualFrame,
};
pub use auto_open::{AutoOpenPolicy, AutoOpenTimer, DayStamp, MemorySeenStore, SeenRecord, SeenStore};
pub use config::{CloseReason, Guards, LayoutMode, OverlayConfig};
pub use focus::{FocusScope, InitialFocus, TrapOutcome};
pub use gesture::{DragResolution, GestureTracker, SnapBack};
pub use scroll_lock::{ScrollLock, ScrollLockManager};
pub use session::{
    EventDisposition, OverlayEnv, OverlayHandle, OverlaySession, OverlayState, SessionId,
};
pub use settings::{EngineSettings, SettingsError};
pub use stack::OverlayStack;
