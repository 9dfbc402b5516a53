//! Visual configuration for the overlay.
//!
//! The widget only drives the *dynamic* styles (heights, offsets, opacity,
//! thumb color); the fixed chrome — track placement, widths, rounding, the
//! fade transition — is applied by the host when it creates the overlay
//! elements.  The reference chrome values live here so hosts agree on them.

/// Track strip width, in the host's pixel unit.
pub const TRACK_WIDTH: f64 = 6.0;

/// Minimum thumb height the host should enforce, so a huge content region
/// still leaves something grabbable.
pub const THUMB_MIN_HEIGHT: f64 = 20.0;

/// User-tunable style knobs.  Everything else is chrome.
#[derive(Debug, Clone)]
pub struct StyleOptions {
    /// Opacity applied to the track when visible and to the thumb on hover.
    /// Clamped to `[0, 1]` at construction.
    pub opacity: f64,
    /// Thumb fill color, passed through to the host verbatim.
    pub track_color: String,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            opacity: 0.8,
            track_color: "#ccc".to_string(),
        }
    }
}

impl StyleOptions {
    /// Return a copy with `opacity` forced into `[0, 1]`.
    pub(crate) fn clamped(mut self) -> Self {
        self.opacity = self.opacity.clamp(0.0, 1.0);
        self
    }
}
