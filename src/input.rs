//! Pointer and wheel input → geometry mutations.
//!
//! Drag protocol: pointer-down on the thumb captures the grab offset, then
//! installs document-scoped move/up handlers for the duration of the drag.  The handlers live in a per-widget [`DragSession`];
//! one process-wide slot holds the active session, so starting a drag on any
//! widget silently preempts a drag in progress elsewhere — single-pointer
//! hardware makes that the right default, and there is no queueing.
//!
//! Wheel protocol: a fixed step of [`WHEEL_STEP`] px per event, default
//! scrolling suppressed.  Hover raises the thumb opacity entering the
//! container and clears it on leave, independent of drag state.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::bridge::{Event, EventBridge, HandlerToken};
use crate::geometry::Phase;
use crate::host::{EventKind, Target};
use crate::widget::Core;

/// Thumb displacement per wheel event, px.
pub(crate) const WHEEL_STEP: f64 = 10.0;

// ───────────────────────────────────────── active drag slot ──

/// The document-scoped handlers owned by one in-progress drag.
struct DragSession {
    owner: u64,
    bridge: EventBridge,
    move_token: HandlerToken,
    up_token: HandlerToken,
}

impl DragSession {
    fn release(self) {
        for token in [self.move_token, self.up_token] {
            if let Err(err) = self.bridge.unsubscribe(token) {
                tracing::debug!(?err, "drag handler already removed");
            }
        }
    }
}

thread_local! {
    /// The single active drag.  All input runs on the host's main execution
    /// context, so a thread-local is the whole story.
    static ACTIVE_DRAG: RefCell<Option<DragSession>> = const { RefCell::new(None) };
}

/// Install a new active session, preempting any drag in progress.
fn begin_drag(session: DragSession) {
    tracing::debug!(owner = session.owner, "drag started");
    if let Some(previous) = ACTIVE_DRAG.with(|slot| slot.borrow_mut().replace(session)) {
        tracing::debug!(owner = previous.owner, "drag preempted");
        previous.release();
    }
}

/// End the active drag, whichever widget owns it.
fn end_drag() {
    if let Some(session) = ACTIVE_DRAG.with(|slot| slot.borrow_mut().take()) {
        tracing::debug!(owner = session.owner, "drag ended");
        session.release();
    }
}

/// End the active drag only if `owner` holds it.  Used by widget teardown so
/// disposing one widget never cancels another widget's drag.
pub(crate) fn end_drag_owned_by(owner: u64) {
    let session = ACTIVE_DRAG.with(|slot| {
        let mut slot = slot.borrow_mut();
        match slot.as_ref() {
            Some(session) if session.owner == owner => slot.take(),
            _ => None,
        }
    });
    if let Some(session) = session {
        session.release();
    }
}

// ───────────────────────────────────────── wiring ────────────

/// Subscribe the widget's input handlers: thumb drag, wheel over container
/// and track, hover over the container.  Tokens land in `core.input_tokens`
/// so teardown can release them.
pub(crate) fn wire(core: &Rc<RefCell<Core>>) {
    let (bridge, container, track, thumb) = {
        let c = core.borrow();
        (c.bridge.clone(), c.container, c.track, c.thumb)
    };
    let weak = Rc::downgrade(core);
    let mut tokens = Vec::new();
    let mut keep = |result: crate::Result<HandlerToken>| match result {
        Ok(token) => tokens.push(token),
        Err(err) => tracing::warn!(?err, "input wiring failed"),
    };

    keep(bridge.subscribe(
        Target::Element(thumb),
        EventKind::PointerDown,
        on_pointer_down(weak.clone()),
    ));
    keep(bridge.subscribe(
        Target::Element(container),
        EventKind::Wheel,
        on_wheel(weak.clone()),
    ));
    keep(bridge.subscribe(Target::Element(track), EventKind::Wheel, on_wheel(weak.clone())));
    keep(bridge.subscribe(
        Target::Element(container),
        EventKind::PointerEnter,
        on_hover(weak.clone(), true),
    ));
    keep(bridge.subscribe(
        Target::Element(container),
        EventKind::PointerLeave,
        on_hover(weak, false),
    ));

    core.borrow_mut().input_tokens = tokens;
}

fn on_pointer_down(weak: Weak<RefCell<Core>>) -> impl FnMut(&Event) {
    move |event| {
        let Some(core) = weak.upgrade() else { return };

        let (owner, bridge) = {
            let mut c = core.borrow_mut();
            if c.geometry.phase() != Phase::Active {
                return;
            }
            c.drag_anchor_offset = event.pointer_y() - c.geometry.thumb_top();
            (c.id, c.bridge.clone())
        };

        let move_weak = weak.clone();
        let move_token = bridge.subscribe(Target::Document, EventKind::PointerMove, move |event| {
            if let Some(core) = move_weak.upgrade() {
                let mut c = core.borrow_mut();
                let target = event.pointer_y() - c.drag_anchor_offset;
                c.apply_move(target);
            }
            // Keep the platform from starting a selection mid-drag.
            event.suppress_default();
        });
        let up_token =
            bridge.subscribe(Target::Document, EventKind::PointerUp, move |_| end_drag());

        match (move_token, up_token) {
            (Ok(move_token), Ok(up_token)) => begin_drag(DragSession {
                owner,
                bridge,
                move_token,
                up_token,
            }),
            (move_token, up_token) => {
                // Partial wiring is worse than none; roll back what took.
                for token in [move_token, up_token].into_iter().flatten() {
                    let _ = bridge.unsubscribe(token);
                }
            }
        }
    }
}

fn on_wheel(weak: Weak<RefCell<Core>>) -> impl FnMut(&Event) {
    move |event| {
        let Some(core) = weak.upgrade() else { return };
        let Some(delta) = event.wheel_delta() else { return };

        let mut c = core.borrow_mut();
        if c.geometry.phase() != Phase::Active {
            return;
        }
        // A wheel mid-drag re-anchors the pointer to the displaced thumb.
        c.drag_anchor_offset = event.pointer_y() - c.geometry.thumb_top();

        let step = if delta > 0.0 { -WHEEL_STEP } else { WHEEL_STEP };
        let target = c.geometry.thumb_top() + step;
        c.apply_move(target);
        event.suppress_default();
    }
}

fn on_hover(weak: Weak<RefCell<Core>>, entering: bool) -> impl FnMut(&Event) {
    move |_event| {
        let Some(core) = weak.upgrade() else { return };
        let c = core.borrow();
        let opacity = if entering { c.style.opacity } else { 0.0 };
        c.host.set_opacity(c.thumb, opacity);
    }
}
