#![forbid(unsafe_code)]

//! Ready-made configurations for the site's dialogs.
//!
//! Each preset fixes the guards, layout, and reveal count its call site
//! needs; the caller adds the mounted elements (`container`,
//! `close_button`) and callbacks. Form presets ignore backdrop taps so a
//! stray tap does not throw away typed input.

use std::time::Duration;

use crate::auto_open::AutoOpenPolicy;
use crate::config::{Guards, LayoutMode, OverlayConfig};

fn form_guards() -> Guards {
    Guards::default().close_on_backdrop(false)
}

/// Prayer request form.
pub fn prayer_request() -> OverlayConfig {
    OverlayConfig::new()
        .title("Prayer Request")
        .guards(form_guards())
        .reveal_items(4)
}

/// Volunteer workforce registration form.
pub fn workforce_registration() -> OverlayConfig {
    OverlayConfig::new()
        .title("Join the Workforce")
        .guards(form_guards())
        .reveal_items(5)
}

/// Sign-up form for a named department.
pub fn department_signup(department: &str) -> OverlayConfig {
    OverlayConfig::new()
        .title(format!("Join {department}"))
        .guards(form_guards())
        .reveal_items(3)
}

/// QR code display. Always centered so the code stays square on phones.
pub fn qr_display() -> OverlayConfig {
    OverlayConfig::new()
        .title("Scan to Connect")
        .layout(LayoutMode::Dialog)
        .reveal_items(1)
}

/// Giving instructions (bank details and steps).
pub fn giving_instructions() -> OverlayConfig {
    OverlayConfig::new().title("Ways to Give").reveal_items(3)
}

/// Once-a-day timed prompt for the workforce registration form.
pub fn workforce_auto_open() -> AutoOpenPolicy {
    AutoOpenPolicy::new("workforce-registration", Duration::from_secs(5))
}
