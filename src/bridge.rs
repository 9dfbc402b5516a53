//! Uniform event subscription over the host's native listener primitive.
//!
//! The bridge keeps one registry entry per (target, event-kind) pair.  The
//! first subscription for a pair attaches a single native listener; every
//! logical handler for that pair then runs through one dispatch trampoline,
//! in registration order, against a normalized [`Event`].  Subscription
//! returns an opaque [`HandlerToken`]; unsubscribing the last handler for a
//! pair detaches the native listener again.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::host::{Dispatch, ElementId, EventKind, Host, NativeHandle, RawEvent, Target, WheelDelta};

/// Pixel equivalent of one legacy wheel line.
const LINE_PX: f64 = 40.0;

// ───────────────────────────────────────── normalized event ──

/// A native event with uniform field access, handed to every handler.
///
/// Wheel deltas are always positive-up pixels here, whatever convention the
/// backend reported.  Suppression requests are collected on the event and
/// reported back to the host after dispatch.
pub struct Event {
    target: Option<ElementId>,
    pointer_y: f64,
    wheel: Option<f64>,
    default_suppressed: Cell<bool>,
    propagation_stopped: Cell<bool>,
}

impl Event {
    fn from_raw(raw: &RawEvent) -> Self {
        let wheel = raw.wheel.map(|delta| match delta {
            WheelDelta::Pixels(px) => px,
            // Line deltas are positive-down; flip and scale.
            WheelDelta::Lines(lines) => -lines * LINE_PX,
        });
        Self {
            target: raw.target,
            pointer_y: raw.pointer_y,
            wheel,
            default_suppressed: Cell::new(false),
            propagation_stopped: Cell::new(false),
        }
    }

    /// Element the event originated on, when known.
    pub fn target(&self) -> Option<ElementId> {
        self.target
    }

    /// Pointer vertical position.
    pub fn pointer_y(&self) -> f64 {
        self.pointer_y
    }

    /// Normalized wheel delta in pixels, positive = scroll up.
    pub fn wheel_delta(&self) -> Option<f64> {
        self.wheel
    }

    /// Ask the host to suppress the platform's default action.
    pub fn suppress_default(&self) {
        self.default_suppressed.set(true);
    }

    /// Ask the host to stop further propagation.
    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    fn flags(&self) -> Dispatch {
        Dispatch {
            default_suppressed: self.default_suppressed.get(),
            propagation_stopped: self.propagation_stopped.get(),
        }
    }
}

// ───────────────────────────────────────── registry ──────────

/// Opaque proof of one registration, required to unsubscribe it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerToken {
    target: Target,
    kind: EventKind,
    id: u64,
}

type Handler = Rc<RefCell<dyn FnMut(&Event)>>;

struct Slot {
    native: NativeHandle,
    /// (registration id, handler), in registration order.
    handlers: Vec<(u64, Handler)>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    slots: HashMap<(Target, EventKind), Slot>,
}

/// The bridge itself.  Cheap to clone; clones share one registry.
#[derive(Clone)]
pub struct EventBridge {
    host: Rc<dyn Host>,
    registry: Rc<RefCell<Registry>>,
}

impl EventBridge {
    pub fn new(host: Rc<dyn Host>) -> Self {
        Self {
            host,
            registry: Rc::new(RefCell::new(Registry::default())),
        }
    }

    /// Register `handler` for `kind` events on `target`.
    ///
    /// The first handler for the pair attaches the one native listener;
    /// later handlers reuse it and run after earlier ones.
    pub fn subscribe(
        &self,
        target: Target,
        kind: EventKind,
        handler: impl FnMut(&Event) + 'static,
    ) -> Result<HandlerToken> {
        let key = (target, kind);

        let is_new = !self.registry.borrow().slots.contains_key(&key);
        if is_new {
            let registry = Rc::clone(&self.registry);
            let native = self.host.attach(
                target,
                kind,
                Box::new(move |raw| {
                    let event = Event::from_raw(raw);
                    run_dispatch(&registry, key, &event);
                    event.flags()
                }),
            );
            tracing::trace!(?target, ?kind, "native listener attached");
            self.registry.borrow_mut().slots.insert(
                key,
                Slot {
                    native,
                    handlers: Vec::new(),
                },
            );
        }

        let mut registry = self.registry.borrow_mut();
        registry.next_id += 1;
        let id = registry.next_id;
        if let Some(slot) = registry.slots.get_mut(&key) {
            let handler: Handler = Rc::new(RefCell::new(handler));
            slot.handlers.push((id, handler));
        }
        Ok(HandlerToken { target, kind, id })
    }

    /// Remove the registration behind `token`.  Removing the last handler
    /// for a pair detaches the native listener.
    pub fn unsubscribe(&self, token: HandlerToken) -> Result<()> {
        let key = (token.target, token.kind);
        let detached = {
            let mut registry = self.registry.borrow_mut();
            let Some(slot) = registry.slots.get_mut(&key) else {
                return Err(Error::HandlerNotFound);
            };
            let before = slot.handlers.len();
            slot.handlers.retain(|(id, _)| *id != token.id);
            if slot.handlers.len() == before {
                return Err(Error::HandlerNotFound);
            }
            if slot.handlers.is_empty() {
                registry.slots.remove(&key).map(|slot| slot.native)
            } else {
                None
            }
        };
        if let Some(native) = detached {
            self.host.detach(native);
            tracing::trace!(target = ?token.target, kind = ?token.kind, "native listener detached");
        }
        Ok(())
    }
}

/// Invoke every handler registered for `key`, in registration order.
///
/// Handlers may subscribe or unsubscribe during dispatch, so the handler
/// list is snapshotted first and each entry is re-checked against the live
/// registry before it runs: removed handlers don't fire, late additions wait
/// for the next event.
fn run_dispatch(registry: &Rc<RefCell<Registry>>, key: (Target, EventKind), event: &Event) {
    let snapshot: Vec<(u64, Handler)> = match registry.borrow().slots.get(&key) {
        Some(slot) => slot
            .handlers
            .iter()
            .map(|(id, handler)| (*id, Rc::clone(handler)))
            .collect(),
        None => return,
    };

    for (id, handler) in snapshot {
        let still_registered = registry
            .borrow()
            .slots
            .get(&key)
            .is_some_and(|slot| slot.handlers.iter().any(|(hid, _)| *hid == id));
        if !still_registered {
            continue;
        }
        // Propagation suppression is a message to the host tree, not to the
        // remaining handlers of this pair — they all still run.
        (&mut *handler.borrow_mut())(event);
    }
}
