#![forbid(unsafe_code)]

//! Responsive viewport classification.

use crate::geometry::Size;

/// Coarse size class of the host surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ViewportClass {
    /// Phones and narrow windows.
    Compact,
    /// Tablets and small laptops.
    #[default]
    Medium,
    /// Everything wider.
    Wide,
}

impl ViewportClass {
    #[inline]
    pub const fn is_compact(self) -> bool {
        matches!(self, Self::Compact)
    }
}

/// Width breakpoints in logical pixels.
///
/// `width < compact_max` is [`ViewportClass::Compact`], `width < medium_max`
/// is [`ViewportClass::Medium`], and anything else is [`ViewportClass::Wide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Breakpoints {
    pub compact_max: u32,
    pub medium_max: u32,
}

impl Default for Breakpoints {
    fn default() -> Self {
        Self {
            compact_max: 640,
            medium_max: 1024,
        }
    }
}

impl Breakpoints {
    /// Create breakpoints; `medium_max` is raised to `compact_max` if lower.
    pub fn new(compact_max: u32, medium_max: u32) -> Self {
        Self {
            compact_max,
            medium_max: medium_max.max(compact_max),
        }
    }

    /// Classify a surface size.
    pub fn classify(&self, size: Size) -> ViewportClass {
        if size.width < self.compact_max {
            ViewportClass::Compact
        } else if size.width < self.medium_max {
            ViewportClass::Medium
        } else {
            ViewportClass::Wide
        }
    }
}
