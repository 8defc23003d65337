#![forbid(unsafe_code)]

//! Per-overlay configuration: layout, guards, focus targets, and callbacks.

use std::fmt;

use lantern_core::host::ElementId;
use lantern_core::viewport::ViewportClass;

/// How the panel is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "policy-config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "policy-config", serde(rename_all = "snake_case"))]
pub enum LayoutMode {
    /// Centered panel.
    #[default]
    Dialog,
    /// Edge-anchored panel that can be dragged away.
    Sheet,
}

impl LayoutMode {
    /// Pick a layout for `class`, honoring an explicit override.
    pub fn resolve(class: ViewportClass, override_mode: Option<LayoutMode>) -> Self {
        override_mode.unwrap_or(if class.is_compact() {
            Self::Sheet
        } else {
            Self::Dialog
        })
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dialog => "dialog",
            Self::Sheet => "sheet",
        }
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What asked the overlay to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseReason {
    CloseButton,
    Backdrop,
    Escape,
    /// A sheet dragged past the threshold.
    Drag,
    /// [`OverlayHandle::request_close`](crate::session::OverlayHandle::request_close)
    /// or a direct call from the owner.
    Requested,
}

/// Conditions under which the overlay may be dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guards {
    /// Block every close path.
    pub prevent_close: bool,
    /// Content is working (e.g. submitting); block every close path.
    pub is_busy: bool,
    pub close_on_escape: bool,
    pub close_on_backdrop: bool,
}

impl Default for Guards {
    fn default() -> Self {
        Self {
            prevent_close: false,
            is_busy: false,
            close_on_escape: true,
            close_on_backdrop: true,
        }
    }
}

impl Guards {
    #[must_use]
    pub fn prevent_close(mut self, value: bool) -> Self {
        self.prevent_close = value;
        self
    }

    #[must_use]
    pub fn busy(mut self, value: bool) -> Self {
        self.is_busy = value;
        self
    }

    #[must_use]
    pub fn close_on_escape(mut self, value: bool) -> Self {
        self.close_on_escape = value;
        self
    }

    #[must_use]
    pub fn close_on_backdrop(mut self, value: bool) -> Self {
        self.close_on_backdrop = value;
        self
    }

    /// Neither `prevent_close` nor `is_busy` is set.
    #[inline]
    pub fn is_dismissible(&self) -> bool {
        !self.prevent_close && !self.is_busy
    }

    /// Whether a close for `reason` may proceed.
    pub fn permits(&self, reason: CloseReason) -> bool {
        if !self.is_dismissible() {
            return false;
        }
        match reason {
            CloseReason::Escape => self.close_on_escape,
            CloseReason::Backdrop => self.close_on_backdrop,
            CloseReason::CloseButton | CloseReason::Drag | CloseReason::Requested => true,
        }
    }
}

pub type OpenedCallback = Box<dyn FnMut()>;
pub type ClosedCallback = Box<dyn FnMut(CloseReason)>;

/// Configuration for one [`OverlaySession`](crate::session::OverlaySession).
///
/// # Example
///
/// ```ignore
/// let config = OverlayConfig::new()
///     .title("Prayer Request")
///     .container(panel_id)
///     .close_button(close_id)
///     .guards(Guards::default().close_on_backdrop(false))
///     .on_closed(|reason| log_close(reason));
/// ```
#[derive(Default)]
pub struct OverlayConfig {
    pub title: Option<String>,
    /// Root element of the mounted panel; focus is trapped inside it.
    pub container: Option<ElementId>,
    pub layout_override: Option<LayoutMode>,
    pub guards: Guards,
    /// Element to focus once the overlay is open.
    pub initial_focus: Option<ElementId>,
    pub close_button: Option<ElementId>,
    /// Number of content nodes that reveal with a stagger.
    pub reveal_items: usize,
    pub(crate) on_opened: Option<OpenedCallback>,
    pub(crate) on_closed: Option<ClosedCallback>,
}

impl fmt::Debug for OverlayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayConfig")
            .field("title", &self.title)
            .field("container", &self.container)
            .field("layout_override", &self.layout_override)
            .field("guards", &self.guards)
            .field("initial_focus", &self.initial_focus)
            .field("close_button", &self.close_button)
            .field("reveal_items", &self.reveal_items)
            .field("on_opened", &self.on_opened.is_some())
            .field("on_closed", &self.on_closed.is_some())
            .finish()
    }
}

impl OverlayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn container(mut self, id: ElementId) -> Self {
        self.container = Some(id);
        self
    }

    #[must_use]
    pub fn layout(mut self, mode: LayoutMode) -> Self {
        self.layout_override = Some(mode);
        self
    }

    #[must_use]
    pub fn guards(mut self, guards: Guards) -> Self {
        self.guards = guards;
        self
    }

    #[must_use]
    pub fn initial_focus(mut self, id: ElementId) -> Self {
        self.initial_focus = Some(id);
        self
    }

    #[must_use]
    pub fn close_button(mut self, id: ElementId) -> Self {
        self.close_button = Some(id);
        self
    }

    #[must_use]
    pub fn reveal_items(mut self, count: usize) -> Self {
        self.reveal_items = count;
        self
    }

    /// Called on `Opening → Open`, after initial focus has moved.
    #[must_use]
    pub fn on_opened(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_opened = Some(Box::new(f));
        self
    }

    /// Called on `Closing → Closed`, after the scroll lock is released and
    /// focus is restored.
    #[must_use]
    pub fn on_closed(mut self, f: impl FnMut(CloseReason) + 'static) -> Self {
        self.on_closed = Some(Box::new(f));
        self
    }
}
