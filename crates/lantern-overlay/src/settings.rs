#![forbid(unsafe_code)]

//! Engine-wide tuning: drag threshold, snap-back, breakpoints, and timings.
//!
//! With the `policy-config` feature, settings load from TOML or JSON. Every
//! field is optional; durations are given in milliseconds.
//!
//! ```toml
//! drag_threshold = 120.0
//! snap_back_ms = 180
//!
//! [breakpoints]
//! compact_max = 600
//!
//! [animation]
//! enter_panel_sheet_ms = 450
//! exit_panel_ms = 220
//! ```

use std::fmt;
use std::time::Duration;

use lantern_core::viewport::Breakpoints;

use crate::animation::AnimationSettings;
use crate::gesture::{DEFAULT_DRAG_THRESHOLD, DEFAULT_SNAP_BACK};

/// Errors from loading or validating [`EngineSettings`].
#[derive(Debug)]
pub enum SettingsError {
    /// The settings file could not be read.
    Io(std::io::Error),
    /// The input was not valid TOML/JSON for this schema.
    Parse { format: &'static str, message: String },
    /// A value is out of range.
    Invalid(String),
    /// File extension is neither `.toml` nor `.json`.
    UnsupportedFormat(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read settings: {err}"),
            Self::Parse { format, message } => write!(f, "invalid {format} settings: {message}"),
            Self::Invalid(msg) => write!(f, "invalid settings: {msg}"),
            Self::UnsupportedFormat(ext) => write!(f, "unsupported settings format: {ext:?}"),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SettingsError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Tuning shared by every session created from one environment.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Drag distance past which a released sheet dismisses.
    pub drag_threshold: f64,
    /// Duration of the tween back to rest after a short drag.
    pub snap_back: Duration,
    pub breakpoints: Breakpoints,
    pub animation: AnimationSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            drag_threshold: DEFAULT_DRAG_THRESHOLD,
            snap_back: DEFAULT_SNAP_BACK,
            breakpoints: Breakpoints::default(),
            animation: AnimationSettings::default(),
        }
    }
}

impl EngineSettings {
    /// Check value ranges.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.drag_threshold.is_finite() || self.drag_threshold <= 0.0 {
            return Err(SettingsError::Invalid(format!(
                "drag_threshold must be a positive number, got {}",
                self.drag_threshold
            )));
        }
        let scale = self.animation.dialog_min_scale;
        if !(scale > 0.0 && scale <= 1.0) {
            return Err(SettingsError::Invalid(format!(
                "dialog_min_scale must be in (0, 1], got {scale}"
            )));
        }
        let offset = self.animation.dialog_offset;
        if !offset.is_finite() || offset < 0.0 {
            return Err(SettingsError::Invalid(format!(
                "dialog_offset must be non-negative, got {offset}"
            )));
        }
        if self.breakpoints.compact_max > self.breakpoints.medium_max {
            return Err(SettingsError::Invalid(format!(
                "breakpoints out of order: compact_max {} > medium_max {}",
                self.breakpoints.compact_max, self.breakpoints.medium_max
            )));
        }
        Ok(())
    }
}

#[cfg(feature = "policy-config")]
mod file {
    use std::time::Duration;

    use lantern_core::viewport::Breakpoints;
    use serde::Deserialize;

    use super::EngineSettings;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default, deny_unknown_fields)]
    pub(super) struct SettingsFile {
        drag_threshold: Option<f64>,
        snap_back_ms: Option<u64>,
        breakpoints: Option<Breakpoints>,
        animation: AnimationFile,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default, deny_unknown_fields)]
    struct AnimationFile {
        enter_backdrop_ms: Option<u64>,
        enter_panel_sheet_ms: Option<u64>,
        enter_panel_dialog_ms: Option<u64>,
        enter_content_delay_ms: Option<u64>,
        enter_stagger_ms: Option<u64>,
        enter_item_ms: Option<u64>,
        exit_backdrop_ms: Option<u64>,
        exit_panel_ms: Option<u64>,
        exit_item_ms: Option<u64>,
        dialog_min_scale: Option<f64>,
        dialog_offset: Option<f64>,
    }

    fn ms(slot: &mut Duration, value: Option<u64>) {
        if let Some(v) = value {
            *slot = Duration::from_millis(v);
        }
    }

    impl SettingsFile {
        pub(super) fn into_settings(self) -> EngineSettings {
            let mut s = EngineSettings::default();
            if let Some(t) = self.drag_threshold {
                s.drag_threshold = t;
            }
            ms(&mut s.snap_back, self.snap_back_ms);
            if let Some(b) = self.breakpoints {
                s.breakpoints = b;
            }

            let a = self.animation;
            let anim = &mut s.animation;
            ms(&mut anim.enter_backdrop, a.enter_backdrop_ms);
            ms(&mut anim.enter_panel_sheet, a.enter_panel_sheet_ms);
            ms(&mut anim.enter_panel_dialog, a.enter_panel_dialog_ms);
            ms(&mut anim.enter_content_delay, a.enter_content_delay_ms);
            ms(&mut anim.enter_stagger, a.enter_stagger_ms);
            ms(&mut anim.enter_item, a.enter_item_ms);
            ms(&mut anim.exit_backdrop, a.exit_backdrop_ms);
            ms(&mut anim.exit_panel, a.exit_panel_ms);
            ms(&mut anim.exit_item, a.exit_item_ms);
            if let Some(v) = a.dialog_min_scale {
                anim.dialog_min_scale = v;
            }
            if let Some(v) = a.dialog_offset {
                anim.dialog_offset = v;
            }
            s
        }
    }
}

#[cfg(feature = "policy-config")]
impl EngineSettings {
    /// Parse TOML settings and validate them.
    pub fn from_toml(input: &str) -> Result<Self, SettingsError> {
        let file: file::SettingsFile = toml::from_str(input).map_err(|e| SettingsError::Parse {
            format: "toml",
            message: e.to_string(),
        })?;
        let settings = file.into_settings();
        settings.validate()?;
        Ok(settings)
    }

    /// Parse JSON settings and validate them.
    pub fn from_json(input: &str) -> Result<Self, SettingsError> {
        let file: file::SettingsFile =
            serde_json::from_str(input).map_err(|e| SettingsError::Parse {
                format: "json",
                message: e.to_string(),
            })?;
        let settings = file.into_settings();
        settings.validate()?;
        Ok(settings)
    }

    /// Load from a `.toml` or `.json` file.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let parse: fn(&str) -> Result<Self, SettingsError> = match ext.as_str() {
            "toml" => Self::from_toml,
            "json" => Self::from_json,
            _ => return Err(SettingsError::UnsupportedFormat(ext)),
        };
        let settings = parse(&std::fs::read_to_string(path)?)?;
        tracing::debug!(path = %path.display(), "engine settings loaded");
        Ok(settings)
    }
}
