//! In-memory [`Host`] for headless use.
//!
//! Elements live in a flat map keyed by handle; attached listeners and
//! mutation watches are plain callback registries.  Besides the `Host`
//! surface it exposes test drivers: [`MemoryHost::fire`] injects a native
//! event, [`MemoryHost::set_height`] changes a measurement, and
//! [`MemoryHost::mutate`] fires the mutation watchers of an element.  The
//! crate's own widget tests run on it; downstream test suites can too.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::{
    Dispatch, ElementId, EventKind, Host, NativeCallback, NativeHandle, OverlayPart, RawEvent,
    Target, WatchCallback, WatchHandle,
};

/// Recorded state of one element.
#[derive(Debug, Clone, Default)]
pub struct MemElement {
    pub height: f64,
    pub top: f64,
    pub opacity: f64,
    pub color: String,
    pub children: Vec<ElementId>,
    pub parent: Option<ElementId>,
    /// Set for overlay elements created through [`Host::create_overlay`].
    pub part: Option<OverlayPart>,
}

struct NativeEntry {
    target: Target,
    kind: EventKind,
    // Rc so `fire` can run a callback without holding the registry borrow —
    // handlers may attach/detach listeners while they run.
    callback: Rc<RefCell<NativeCallback>>,
}

struct WatchEntry {
    el: ElementId,
    callback: Rc<RefCell<WatchCallback>>,
}

#[derive(Default)]
struct MemInner {
    next: u64,
    elements: HashMap<ElementId, MemElement>,
    named: HashMap<String, ElementId>,
    natives: HashMap<NativeHandle, NativeEntry>,
    watches: HashMap<WatchHandle, WatchEntry>,
}

impl MemInner {
    fn mint(&mut self) -> u64 {
        self.next += 1;
        self.next
    }
}

/// In-memory host.  Cheap to clone; clones share the same element tree.
#[derive(Clone, Default)]
pub struct MemoryHost {
    inner: Rc<RefCell<MemInner>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named element with an initial measured height and return
    /// its handle.
    pub fn insert(&self, id: &str, height: f64) -> ElementId {
        let mut inner = self.inner.borrow_mut();
        let el = ElementId(inner.mint());
        inner.elements.insert(
            el,
            MemElement {
                height,
                ..Default::default()
            },
        );
        inner.named.insert(id.to_string(), el);
        el
    }

    /// Inject one native event, as the platform would.  Returns the merged
    /// suppression flags the listeners requested.
    pub fn fire(&self, target: Target, kind: EventKind, raw: RawEvent) -> Dispatch {
        let callbacks: Vec<Rc<RefCell<NativeCallback>>> = self
            .inner
            .borrow()
            .natives
            .values()
            .filter(|entry| entry.target == target && entry.kind == kind)
            .map(|entry| Rc::clone(&entry.callback))
            .collect();

        let mut merged = Dispatch::default();
        for callback in callbacks {
            let dispatch = (&mut *callback.borrow_mut())(&raw);
            merged.default_suppressed |= dispatch.default_suppressed;
            merged.propagation_stopped |= dispatch.propagation_stopped;
        }
        merged
    }

    /// Fire the mutation watchers registered on `el`.
    pub fn mutate(&self, el: ElementId) {
        let callbacks: Vec<Rc<RefCell<WatchCallback>>> = self
            .inner
            .borrow()
            .watches
            .values()
            .filter(|entry| entry.el == el)
            .map(|entry| Rc::clone(&entry.callback))
            .collect();

        for callback in callbacks {
            (&mut *callback.borrow_mut())();
        }
    }

    // ── inspection ───────────────────────────────────────────

    pub fn top(&self, el: ElementId) -> f64 {
        self.read(el, |e| e.top)
    }

    pub fn opacity(&self, el: ElementId) -> f64 {
        self.read(el, |e| e.opacity)
    }

    pub fn color(&self, el: ElementId) -> String {
        self.read(el, |e| e.color.clone())
    }

    pub fn children(&self, el: ElementId) -> Vec<ElementId> {
        self.read(el, |e| e.children.clone())
    }

    /// Attached native listeners for one (target, kind) pair.
    pub fn listener_count(&self, target: Target, kind: EventKind) -> usize {
        self.inner
            .borrow()
            .natives
            .values()
            .filter(|entry| entry.target == target && entry.kind == kind)
            .count()
    }

    /// Active mutation watches on one element.
    pub fn watch_count(&self, el: ElementId) -> usize {
        self.inner
            .borrow()
            .watches
            .values()
            .filter(|entry| entry.el == el)
            .count()
    }

    fn read<T>(&self, el: ElementId, f: impl FnOnce(&MemElement) -> T) -> T {
        let inner = self.inner.borrow();
        let elem = inner
            .elements
            .get(&el)
            .unwrap_or_else(|| panic!("unknown element {el:?}"));
        f(elem)
    }

    fn write(&self, el: ElementId, f: impl FnOnce(&mut MemElement)) {
        let mut inner = self.inner.borrow_mut();
        if let Some(elem) = inner.elements.get_mut(&el) {
            f(elem);
        }
    }
}

impl Host for MemoryHost {
    fn element_by_id(&self, id: &str) -> Option<ElementId> {
        self.inner.borrow().named.get(id).copied()
    }

    fn create_overlay(&self, part: OverlayPart) -> ElementId {
        let mut inner = self.inner.borrow_mut();
        let el = ElementId(inner.mint());
        inner.elements.insert(
            el,
            MemElement {
                // Track chrome is visible-when-styled; the thumb starts
                // transparent and is revealed on hover.
                opacity: match part {
                    OverlayPart::Track => 1.0,
                    OverlayPart::Thumb => 0.0,
                },
                part: Some(part),
                ..Default::default()
            },
        );
        el
    }

    fn append_child(&self, parent: ElementId, child: ElementId) {
        let mut inner = self.inner.borrow_mut();
        if let Some(elem) = inner.elements.get_mut(&child) {
            elem.parent = Some(parent);
        }
        if let Some(elem) = inner.elements.get_mut(&parent) {
            elem.children.push(child);
        }
    }

    fn height(&self, el: ElementId) -> f64 {
        self.read(el, |e| e.height)
    }

    fn set_height(&self, el: ElementId, px: f64) {
        self.write(el, |e| e.height = px);
    }

    fn set_top(&self, el: ElementId, px: f64) {
        self.write(el, |e| e.top = px);
    }

    fn set_opacity(&self, el: ElementId, value: f64) {
        self.write(el, |e| e.opacity = value);
    }

    fn set_color(&self, el: ElementId, color: &str) {
        self.write(el, |e| e.color = color.to_string());
    }

    fn attach(&self, target: Target, kind: EventKind, callback: NativeCallback) -> NativeHandle {
        let mut inner = self.inner.borrow_mut();
        let handle = NativeHandle(inner.mint());
        inner.natives.insert(
            handle,
            NativeEntry {
                target,
                kind,
                callback: Rc::new(RefCell::new(callback)),
            },
        );
        handle
    }

    fn detach(&self, handle: NativeHandle) {
        self.inner.borrow_mut().natives.remove(&handle);
    }

    fn watch(&self, el: ElementId, callback: WatchCallback) -> WatchHandle {
        let mut inner = self.inner.borrow_mut();
        let handle = WatchHandle(inner.mint());
        inner.watches.insert(
            handle,
            WatchEntry {
                el,
                callback: Rc::new(RefCell::new(callback)),
            },
        );
        handle
    }

    fn unwatch(&self, handle: WatchHandle) {
        self.inner.borrow_mut().watches.remove(&handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_lookup_and_measurement() {
        let host = MemoryHost::new();
        let pane = host.insert("pane", 120.0);
        assert_eq!(host.element_by_id("pane"), Some(pane));
        assert_eq!(host.element_by_id("nope"), None);
        assert_eq!(host.height(pane), 120.0);

        host.set_height(pane, 80.0);
        assert_eq!(host.height(pane), 80.0);
    }

    #[test]
    fn fire_reaches_matching_listeners_only() {
        let host = MemoryHost::new();
        let el = host.insert("el", 10.0);
        let hits = Rc::new(RefCell::new(0));

        let h = Rc::clone(&hits);
        host.attach(
            Target::Element(el),
            EventKind::PointerDown,
            Box::new(move |_| {
                *h.borrow_mut() += 1;
                Dispatch::default()
            }),
        );

        host.fire(Target::Element(el), EventKind::PointerDown, RawEvent::pointer(Some(el), 3.0));
        host.fire(Target::Element(el), EventKind::PointerUp, RawEvent::pointer(Some(el), 3.0));
        host.fire(Target::Document, EventKind::PointerDown, RawEvent::pointer(None, 3.0));
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn listener_may_detach_itself_mid_fire() {
        let host = MemoryHost::new();
        let slot: Rc<RefCell<Option<NativeHandle>>> = Rc::new(RefCell::new(None));

        let host2 = host.clone();
        let slot2 = Rc::clone(&slot);
        let handle = host.attach(
            Target::Document,
            EventKind::PointerUp,
            Box::new(move |_| {
                if let Some(h) = slot2.borrow_mut().take() {
                    host2.detach(h);
                }
                Dispatch::default()
            }),
        );
        *slot.borrow_mut() = Some(handle);

        host.fire(Target::Document, EventKind::PointerUp, RawEvent::bare());
        assert_eq!(host.listener_count(Target::Document, EventKind::PointerUp), 0);
    }
}
