//! Thumb/content synchronization math.
//!
//! Pure state over measured heights: no host access, no I/O.  The widget
//! layer reads the fields back after each operation and writes them through
//! the host as styles.  All values are in the host's pixel unit.
//!
//! The thumb-height curve is deliberately not the naive proportional
//! formula: content that barely overflows would otherwise produce a thumb
//! filling nearly the whole track, and deep content a sliver too small to
//! grab.  The curve caps at 3/4 of the track and scales by 4/5 of the
//! container below that, rounding up.  These constants are part of the
//! widget's observable behavior; don't "fix" them.

/// Visibility state of the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Container fully shows the content; track hidden, no mapping applied.
    Hidden,
    /// Content overflows; track visible, thumb and content synchronized.
    Active,
}

/// Geometry state for one widget.
#[derive(Debug, Clone)]
pub struct Geometry {
    /// Last-recorded container height.
    container_h: f64,
    /// Last-recorded content height.
    content_h: f64,
    /// Track height — always the full container height.
    track_h: f64,
    thumb_h: f64,
    /// Thumb offset from the track top, `∈ [0, track_max_travel]`.
    thumb_top: f64,
    /// Content offset — 0 or negative, per the linear mapping.
    content_top: f64,
    phase: Phase,
}

impl Geometry {
    pub fn new(container_h: f64, content_h: f64) -> Self {
        Self {
            container_h,
            content_h,
            track_h: container_h,
            thumb_h: 0.0,
            thumb_top: 0.0,
            content_top: 0.0,
            phase: Phase::Hidden,
        }
    }

    // ── accessors ────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn thumb_top(&self) -> f64 {
        self.thumb_top
    }

    pub fn thumb_height(&self) -> f64 {
        self.thumb_h
    }

    pub fn content_top(&self) -> f64 {
        self.content_top
    }

    pub fn container_height(&self) -> f64 {
        self.container_h
    }

    pub fn content_height(&self) -> f64 {
        self.content_h
    }

    /// Distance the thumb can travel along the track.
    pub fn track_max_travel(&self) -> f64 {
        (self.track_h - self.thumb_h).max(0.0)
    }

    // ── operations ───────────────────────────────────────────

    /// Re-measure and re-derive visibility from scratch: content offset
    /// back to 0, phase from the height comparison, thumb height recomputed
    /// when Active.  Used at `init` and on phase transitions.
    pub fn refresh(&mut self, container_h: f64, content_h: f64) {
        self.container_h = container_h;
        self.track_h = container_h;
        self.content_h = content_h;
        self.content_top = 0.0;
        self.apply_visibility();
    }

    fn apply_visibility(&mut self) {
        if self.container_h >= self.content_h {
            self.phase = Phase::Hidden;
        } else {
            self.phase = Phase::Active;
            self.recompute_thumb();
        }
    }

    /// Move the thumb to `target` (clamped into the valid travel range) and
    /// drag the content offset along the linear mapping.  Returns the
    /// clamped position.
    pub fn move_to(&mut self, target: f64) -> f64 {
        let max = self.track_max_travel();
        let clamped = target.clamp(0.0, max);
        self.thumb_top = clamped;

        let travel = self.content_h - self.container_h;
        // With no travel the mapping is undefined; leave the offset alone
        // rather than dividing by zero.
        if max > 0.0 {
            self.content_top = -travel * clamped / max;
        }
        clamped
    }

    /// Absorb newly measured heights.  Returns `false` when nothing
    /// actually changed.  On a phase transition this is a full [`refresh`];
    /// while staying Active it recomputes the thumb and, if the content
    /// shrank past the current offset, pins the scroll to the bottom.
    ///
    /// [`refresh`]: Self::refresh
    pub fn reconcile(&mut self, container_h: f64, content_h: f64) -> bool {
        // Exact comparison on purpose: these are recorded measurements, and
        // any real change reports a different number.
        if self.container_h == container_h && self.content_h == content_h {
            return false;
        }
        self.container_h = container_h;
        self.track_h = container_h;
        self.content_h = content_h;

        let target = if container_h < content_h {
            Phase::Active
        } else {
            Phase::Hidden
        };
        if self.phase != target {
            self.content_top = 0.0;
            self.apply_visibility();
            return true;
        }

        if self.phase == Phase::Active {
            // Thumb first so the pin below clamps against the fresh range.
            self.recompute_thumb();
            if self.content_h < -self.content_top + self.container_h {
                let max = self.track_max_travel();
                self.move_to(max);
            }
        }
        true
    }

    /// Recompute the thumb height from the current measurements and keep
    /// the thumb position inside the new travel range.
    fn recompute_thumb(&mut self) {
        self.thumb_h = thumb_height(self.track_h, self.container_h, self.content_h);
        self.thumb_top = self.thumb_top.min(self.track_max_travel());
    }
}

/// The hand-tuned thumb-height curve.
fn thumb_height(track_h: f64, container_h: f64, content_h: f64) -> f64 {
    let overflow = content_h - container_h;
    if overflow <= 0.0 {
        // Transient: still marked visible while the content no longer
        // overflows.  The floor keeps the thumb well-formed until the next
        // reconcile hides the track.
        return track_h * 3.0 / 4.0;
    }
    let visible_ratio = track_h / overflow;
    if visible_ratio > 1.0 {
        track_h * 3.0 / 4.0
    } else {
        (container_h * 4.0 / 5.0 * visible_ratio).ceil()
    }
}
