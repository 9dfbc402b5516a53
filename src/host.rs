//! The host platform seam.
//!
//! The widget never touches a real element tree.  Everything it needs from
//! the platform — element lookup, content-box measurement, style writes,
//! native event subscription, mutation watching — goes through the [`Host`]
//! trait, consumed as `Rc<dyn Host>`.  The crate ships one implementation,
//! [`mem::MemoryHost`], used by the test suite and available to downstream
//! test suites; the terminal demo provides another.
//!
//! Raw events cross this seam in whatever sign/unit convention the backend
//! uses; the event bridge normalizes them before handlers run.

pub mod mem;

// ───────────────────────────────────────── handles ───────────

/// Opaque handle for one element in the host's tree.  Minted by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub u64);

/// Handle for one attached native listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeHandle(pub u64);

/// Handle for one mutation watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchHandle(pub u64);

/// What a native listener can be attached to.
///
/// `Document` is the whole input surface (drags continue outside the widget);
/// `Viewport` is the resizable outer surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Element(ElementId),
    Document,
    Viewport,
}

/// Native event kinds the widget subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PointerDown,
    PointerMove,
    PointerUp,
    PointerEnter,
    PointerLeave,
    Wheel,
    Resize,
}

/// The two overlay elements the widget injects into the container.
///
/// The host applies the fixed chrome on creation: the track sits along the
/// container's right edge ([`crate::style::TRACK_WIDTH`] wide, full container
/// height, transparent background); the thumb is the same width with a
/// minimum height of [`crate::style::THUMB_MIN_HEIGHT`], rounded corners,
/// initial opacity 0 and a short fade transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPart {
    Track,
    Thumb,
}

// ───────────────────────────────────────── raw events ────────

/// Wheel displacement as reported by the backend, before normalization.
///
/// `Pixels` is positive-up.  `Lines` follows the legacy line-scroll
/// convention: positive means scroll *down*, one line ≈ 40 px.  The bridge
/// folds both into a positive-up pixel delta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WheelDelta {
    Pixels(f64),
    Lines(f64),
}

/// A native event as the host saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    /// Element the event originated on, when the backend knows it.
    pub target: Option<ElementId>,
    /// Pointer vertical position.  Any consistent coordinate space works —
    /// drag math only ever subtracts positions from each other.
    pub pointer_y: f64,
    /// Wheel displacement, for `Wheel` events.
    pub wheel: Option<WheelDelta>,
}

impl RawEvent {
    /// Pointer event at vertical position `y`.
    pub fn pointer(target: Option<ElementId>, y: f64) -> Self {
        Self {
            target,
            pointer_y: y,
            wheel: None,
        }
    }

    /// Wheel event at vertical position `y`.
    pub fn wheel(target: Option<ElementId>, y: f64, delta: WheelDelta) -> Self {
        Self {
            target,
            pointer_y: y,
            wheel: Some(delta),
        }
    }

    /// Event with no pointer payload (viewport resize).
    pub fn bare() -> Self {
        Self {
            target: None,
            pointer_y: 0.0,
            wheel: None,
        }
    }
}

/// What the dispatch asked the host to do with the native event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dispatch {
    /// Suppress the platform's default action (native scrolling, selection).
    pub default_suppressed: bool,
    /// Stop the event from propagating further in the host tree.
    pub propagation_stopped: bool,
}

/// Callback the bridge hands to [`Host::attach`].  Invoked once per native
/// event; the returned [`Dispatch`] tells the host which suppressions the
/// registered handlers requested.
pub type NativeCallback = Box<dyn FnMut(&RawEvent) -> Dispatch>;

/// Callback invoked on every subtree/attribute/child mutation of the watched
/// element.
pub type WatchCallback = Box<dyn FnMut()>;

// ───────────────────────────────────────── trait ─────────────

/// Platform primitives the widget consumes.  Object-safe; all state behind
/// `&self` since the whole system is single-threaded and callback-driven.
pub trait Host {
    /// Resolve a user-facing element id to a handle.
    fn element_by_id(&self, id: &str) -> Option<ElementId>;

    /// Create one overlay element with its fixed chrome applied.
    fn create_overlay(&self, part: OverlayPart) -> ElementId;

    /// Insert `child` as the last child of `parent`.
    fn append_child(&self, parent: ElementId, child: ElementId);

    /// Content-box height of an element, in the host's pixel unit.
    fn height(&self, el: ElementId) -> f64;

    /// Style writes, in the host's pixel unit.
    fn set_height(&self, el: ElementId, px: f64);
    fn set_top(&self, el: ElementId, px: f64);
    fn set_opacity(&self, el: ElementId, value: f64);
    fn set_color(&self, el: ElementId, color: &str);

    /// Attach one native listener.  The host must call `callback` for every
    /// `kind` event on `target` and honor the returned [`Dispatch`].
    fn attach(&self, target: Target, kind: EventKind, callback: NativeCallback) -> NativeHandle;

    /// Detach a previously attached listener.  Unknown handles are ignored.
    fn detach(&self, handle: NativeHandle);

    /// Watch one element subtree for mutations.
    fn watch(&self, el: ElementId, callback: WatchCallback) -> WatchHandle;

    /// Stop a mutation watch.  Unknown handles are ignored.
    fn unwatch(&self, handle: WatchHandle);
}
