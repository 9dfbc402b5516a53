//! Widget lifecycle: construction, (re-)initialization, disposal.
//!
//! `ScrollBar::create` resolves the container/content pair, injects the
//! track+thumb overlay, and runs [`ScrollBar::init`].  `init` is re-entrant:
//! it tears down whatever wiring exists before installing fresh watchers,
//! so calling it again never stacks duplicate listeners.
//! [`ScrollBar::dispose`] (also run on `Drop`) releases every acquisition
//! in one call: input handlers, mutation watch, resize subscription,
//! pending debounce timer, and an in-flight drag owned by this widget.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::bridge::{EventBridge, HandlerToken};
use crate::error::{Error, Result};
use crate::geometry::{Geometry, Phase};
use crate::host::{ElementId, Host, OverlayPart};
use crate::input;
use crate::observe::{ChangeObserver, ChangeSignal, DEFAULT_QUIET_WINDOW};
use crate::style::StyleOptions;

static NEXT_WIDGET_ID: AtomicU64 = AtomicU64::new(1);

/// Shared mutable state of one widget.  Event handlers reach it through a
/// `Weak` and it reaches the platform through `host`, so the only strong
/// cycle-free owner is the [`ScrollBar`] handle.
pub(crate) struct Core {
    pub(crate) id: u64,
    pub(crate) host: Rc<dyn Host>,
    pub(crate) bridge: EventBridge,
    pub(crate) container: ElementId,
    pub(crate) content: ElementId,
    pub(crate) track: ElementId,
    pub(crate) thumb: ElementId,
    pub(crate) style: StyleOptions,
    pub(crate) geometry: Geometry,
    /// Pointer-to-thumb-top offset captured at drag/wheel start.  The
    /// travel range is *not* captured alongside it: clamping always reads
    /// the latest range, so a resize mid-drag can't scroll out of bounds.
    pub(crate) drag_anchor_offset: f64,
    pub(crate) input_tokens: Vec<HandlerToken>,
    pub(crate) observer: Option<ChangeObserver>,
}

impl Core {
    /// Move the thumb and write both offsets through the host.
    pub(crate) fn apply_move(&mut self, target: f64) {
        self.geometry.move_to(target);
        self.host.set_top(self.thumb, self.geometry.thumb_top());
        self.host.set_top(self.content, self.geometry.content_top());
    }

    /// Write the full visual state: track opacity per phase, thumb height
    /// and position, content offset.
    fn sync_visual_state(&self) {
        let track_opacity = match self.geometry.phase() {
            Phase::Active => self.style.opacity,
            Phase::Hidden => 0.0,
        };
        self.host.set_opacity(self.track, track_opacity);
        self.host.set_height(self.thumb, self.geometry.thumb_height());
        self.host.set_top(self.thumb, self.geometry.thumb_top());
        self.host.set_top(self.content, self.geometry.content_top());
    }
}

/// One overlay scrollbar bound to a (container, content) pair.
///
/// Dropping the handle disposes the widget.
pub struct ScrollBar {
    core: Rc<RefCell<Core>>,
}

impl ScrollBar {
    /// Build a widget over the elements behind `container_id`/`content_id`
    /// and initialize it.  Fails fast with [`Error::ElementNotFound`] when
    /// either id does not resolve.
    pub fn create(
        host: Rc<dyn Host>,
        container_id: &str,
        content_id: &str,
        style: StyleOptions,
    ) -> Result<Self> {
        let container = host
            .element_by_id(container_id)
            .ok_or_else(|| Error::ElementNotFound {
                id: container_id.to_string(),
            })?;
        let content = host
            .element_by_id(content_id)
            .ok_or_else(|| Error::ElementNotFound {
                id: content_id.to_string(),
            })?;

        let style = style.clamped();
        let track = host.create_overlay(OverlayPart::Track);
        let thumb = host.create_overlay(OverlayPart::Thumb);
        host.append_child(track, thumb);
        host.append_child(container, track);
        host.set_color(thumb, &style.track_color);

        let geometry = Geometry::new(host.height(container), host.height(content));
        let id = NEXT_WIDGET_ID.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            id,
            container = container_id,
            content = content_id,
            "scrollbar created"
        );

        let bridge = EventBridge::new(Rc::clone(&host));
        let mut widget = Self {
            core: Rc::new(RefCell::new(Core {
                id,
                host,
                bridge,
                container,
                content,
                track,
                thumb,
                style,
                geometry,
                drag_anchor_offset: 0.0,
                input_tokens: Vec::new(),
                observer: None,
            })),
        };
        widget.init()?;
        Ok(widget)
    }

    /// (Re-)initialize: tear down existing wiring, install the debounced
    /// change watchers, and derive the initial visibility.  Safe to call
    /// any number of times.
    pub fn init(&mut self) -> Result<()> {
        self.teardown();

        let (host, bridge, content) = {
            let c = self.core.borrow();
            (Rc::clone(&c.host), c.bridge.clone(), c.content)
        };
        let weak = Rc::downgrade(&self.core);
        let observer = ChangeObserver::install(
            host,
            bridge,
            content,
            DEFAULT_QUIET_WINDOW,
            move |signal| {
                if let Some(core) = weak.upgrade() {
                    reconcile(&core, signal);
                }
            },
        )?;
        self.core.borrow_mut().observer = Some(observer);

        refresh(&self.core);
        Ok(())
    }

    /// Release everything this widget holds: input handlers, the mutation
    /// watch, the resize subscription, any pending debounce timer and any
    /// drag it owns.  Also runs on `Drop`; idempotent.
    pub fn dispose(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        let (tokens, bridge, id) = {
            let mut c = self.core.borrow_mut();
            if let Some(mut observer) = c.observer.take() {
                observer.remove();
            }
            (std::mem::take(&mut c.input_tokens), c.bridge.clone(), c.id)
        };
        input::end_drag_owned_by(id);
        for token in tokens {
            if let Err(err) = bridge.unsubscribe(token) {
                tracing::debug!(?err, "input handler already removed");
            }
        }
    }

    // ── introspection ────────────────────────────────────────

    pub fn is_active(&self) -> bool {
        self.core.borrow().geometry.phase() == Phase::Active
    }

    pub fn thumb_top(&self) -> f64 {
        self.core.borrow().geometry.thumb_top()
    }

    pub fn thumb_height(&self) -> f64 {
        self.core.borrow().geometry.thumb_height()
    }

    pub fn content_top(&self) -> f64 {
        self.core.borrow().geometry.content_top()
    }

    /// Overlay element handles, for hosts that render from element state.
    pub fn track(&self) -> ElementId {
        self.core.borrow().track
    }

    pub fn thumb(&self) -> ElementId {
        self.core.borrow().thumb
    }
}

impl Drop for ScrollBar {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Full visibility derivation from fresh measurements: content offset back
/// to 0, phase from the height comparison, input wired when Active.
fn refresh(core: &Rc<RefCell<Core>>) {
    let (container_h, content_h) = measure(core);
    let need_wiring = {
        let mut c = core.borrow_mut();
        c.geometry.refresh(container_h, content_h);
        c.sync_visual_state();
        c.geometry.phase() == Phase::Active && c.input_tokens.is_empty()
    };
    if need_wiring {
        input::wire(core);
    }
}

/// Debounced change-observer callback: absorb new measurements, sync the
/// visuals, and wire input if the widget just became scrollable (content
/// arriving after construction is the common case).
fn reconcile(core: &Rc<RefCell<Core>>, signal: ChangeSignal) {
    let (container_h, content_h) = measure(core);
    let need_wiring = {
        let mut c = core.borrow_mut();
        let before = c.geometry.phase();
        if !c.geometry.reconcile(container_h, content_h) {
            return;
        }
        let after = c.geometry.phase();
        if before != after {
            tracing::debug!(id = c.id, ?signal, ?after, "visibility changed");
        }
        c.sync_visual_state();
        after == Phase::Active && c.input_tokens.is_empty()
    };
    if need_wiring {
        input::wire(core);
    }
}

fn measure(core: &Rc<RefCell<Core>>) -> (f64, f64) {
    let c = core.borrow();
    (c.host.height(c.container), c.host.height(c.content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mem::MemoryHost;
    use crate::host::{EventKind, RawEvent, Target, WheelDelta};
    use std::time::Duration;
    use tokio::task::LocalSet;
    use tokio::time::sleep;

    /// Container 100 high, content 300 high → active, thumb 40, travel 60.
    fn overflowing() -> (MemoryHost, ScrollBar) {
        let host = MemoryHost::new();
        host.insert("pane", 100.0);
        host.insert("body", 300.0);
        let widget = ScrollBar::create(
            Rc::new(host.clone()),
            "pane",
            "body",
            StyleOptions::default(),
        )
        .unwrap();
        (host, widget)
    }

    #[test]
    fn create_fails_fast_on_unknown_ids() {
        let host = MemoryHost::new();
        host.insert("pane", 100.0);
        let result = ScrollBar::create(
            Rc::new(host.clone()),
            "pane",
            "missing",
            StyleOptions::default(),
        );
        assert!(matches!(
            result,
            Err(Error::ElementNotFound { id }) if id == "missing"
        ));
    }

    #[test]
    fn construction_injects_the_overlay_and_styles_it() {
        let (host, widget) = overflowing();
        let container = host.element_by_id("pane").unwrap();

        assert_eq!(host.children(container), vec![widget.track()]);
        assert_eq!(host.children(widget.track()), vec![widget.thumb()]);
        assert_eq!(host.color(widget.thumb()), "#ccc");

        // Active from the start: track at configured opacity, thumb sized.
        assert!(widget.is_active());
        assert_eq!(host.opacity(widget.track()), 0.8);
        assert_eq!(widget.thumb_height(), 40.0);
    }

    #[test]
    fn fitting_content_starts_hidden_with_no_input_wiring() {
        let host = MemoryHost::new();
        let pane = host.insert("pane", 300.0);
        host.insert("body", 100.0);
        let widget = ScrollBar::create(
            Rc::new(host.clone()),
            "pane",
            "body",
            StyleOptions::default(),
        )
        .unwrap();

        assert!(!widget.is_active());
        assert_eq!(host.opacity(widget.track()), 0.0);
        assert_eq!(
            host.listener_count(Target::Element(widget.thumb()), EventKind::PointerDown),
            0
        );
        assert_eq!(host.listener_count(Target::Element(pane), EventKind::Wheel), 0);
    }

    #[test]
    fn drag_moves_thumb_and_content() {
        let (host, widget) = overflowing();
        let thumb = widget.thumb();

        // Grab the thumb 5 px below its top, drag down 30 px.
        host.fire(
            Target::Element(thumb),
            EventKind::PointerDown,
            RawEvent::pointer(Some(thumb), 5.0),
        );
        let dispatch = host.fire(
            Target::Document,
            EventKind::PointerMove,
            RawEvent::pointer(None, 35.0),
        );
        assert!(dispatch.default_suppressed);
        assert_eq!(widget.thumb_top(), 30.0);
        assert!((widget.content_top() - (-100.0)).abs() < 1e-9);
        assert_eq!(host.top(thumb), 30.0);

        // Release: the document-scoped handlers are gone, further moves are
        // ignored.
        host.fire(Target::Document, EventKind::PointerUp, RawEvent::bare());
        assert_eq!(host.listener_count(Target::Document, EventKind::PointerMove), 0);
        assert_eq!(host.listener_count(Target::Document, EventKind::PointerUp), 0);
        host.fire(
            Target::Document,
            EventKind::PointerMove,
            RawEvent::pointer(None, 90.0),
        );
        assert_eq!(widget.thumb_top(), 30.0);
    }

    #[test]
    fn drag_clamps_at_the_track_ends() {
        let (host, widget) = overflowing();
        let thumb = widget.thumb();

        host.fire(
            Target::Element(thumb),
            EventKind::PointerDown,
            RawEvent::pointer(Some(thumb), 0.0),
        );
        host.fire(
            Target::Document,
            EventKind::PointerMove,
            RawEvent::pointer(None, 500.0),
        );
        assert_eq!(widget.thumb_top(), 60.0, "clamped to max travel");
        host.fire(
            Target::Document,
            EventKind::PointerMove,
            RawEvent::pointer(None, -500.0),
        );
        assert_eq!(widget.thumb_top(), 0.0);
    }

    #[test]
    fn a_new_drag_preempts_the_active_one() {
        let (host_a, widget_a) = overflowing();
        let host_b = MemoryHost::new();
        host_b.insert("pane", 100.0);
        host_b.insert("body", 300.0);
        let widget_b = ScrollBar::create(
            Rc::new(host_b.clone()),
            "pane",
            "body",
            StyleOptions::default(),
        )
        .unwrap();

        host_a.fire(
            Target::Element(widget_a.thumb()),
            EventKind::PointerDown,
            RawEvent::pointer(Some(widget_a.thumb()), 0.0),
        );
        // Second widget grabs the pointer: the first session's document
        // handlers are released.
        host_b.fire(
            Target::Element(widget_b.thumb()),
            EventKind::PointerDown,
            RawEvent::pointer(Some(widget_b.thumb()), 0.0),
        );
        assert_eq!(host_a.listener_count(Target::Document, EventKind::PointerMove), 0);
        assert_eq!(host_b.listener_count(Target::Document, EventKind::PointerMove), 1);

        host_a.fire(
            Target::Document,
            EventKind::PointerMove,
            RawEvent::pointer(None, 40.0),
        );
        assert_eq!(widget_a.thumb_top(), 0.0, "preempted drag no longer moves");

        host_b.fire(
            Target::Document,
            EventKind::PointerMove,
            RawEvent::pointer(None, 40.0),
        );
        assert_eq!(widget_b.thumb_top(), 40.0);
    }

    #[test]
    fn wheel_steps_by_ten_and_suppresses_default() {
        let (host, widget) = overflowing();
        let container = host.element_by_id("pane").unwrap();

        let down = RawEvent::wheel(Some(container), 0.0, WheelDelta::Lines(1.0));
        let dispatch = host.fire(Target::Element(container), EventKind::Wheel, down.clone());
        assert!(dispatch.default_suppressed);
        assert_eq!(widget.thumb_top(), 10.0);

        host.fire(Target::Element(container), EventKind::Wheel, down);
        assert_eq!(widget.thumb_top(), 20.0);

        let up = RawEvent::wheel(Some(container), 0.0, WheelDelta::Pixels(120.0));
        host.fire(Target::Element(container), EventKind::Wheel, up);
        assert_eq!(widget.thumb_top(), 10.0);

        // Wheel over the track works the same way.
        host.fire(
            Target::Element(widget.track()),
            EventKind::Wheel,
            RawEvent::wheel(Some(widget.track()), 0.0, WheelDelta::Lines(1.0)),
        );
        assert_eq!(widget.thumb_top(), 20.0);
    }

    #[test]
    fn hover_toggles_thumb_opacity() {
        let (host, widget) = overflowing();
        let container = host.element_by_id("pane").unwrap();

        assert_eq!(host.opacity(widget.thumb()), 0.0);
        host.fire(
            Target::Element(container),
            EventKind::PointerEnter,
            RawEvent::pointer(Some(container), 0.0),
        );
        assert_eq!(host.opacity(widget.thumb()), 0.8);
        host.fire(
            Target::Element(container),
            EventKind::PointerLeave,
            RawEvent::pointer(Some(container), 0.0),
        );
        assert_eq!(host.opacity(widget.thumb()), 0.0);
    }

    #[test]
    fn reinit_never_duplicates_native_listeners() {
        let (host, mut widget) = overflowing();
        let container = host.element_by_id("pane").unwrap();
        let body = host.element_by_id("body").unwrap();

        widget.init().unwrap();
        widget.init().unwrap();

        assert_eq!(host.listener_count(Target::Viewport, EventKind::Resize), 1);
        assert_eq!(
            host.listener_count(Target::Element(widget.thumb()), EventKind::PointerDown),
            1
        );
        assert_eq!(host.listener_count(Target::Element(container), EventKind::Wheel), 1);
        assert_eq!(host.listener_count(Target::Element(widget.track()), EventKind::Wheel), 1);
        assert_eq!(host.watch_count(body), 1);
    }

    #[test]
    fn dispose_releases_every_acquisition() {
        let (host, widget) = overflowing();
        let container = host.element_by_id("pane").unwrap();
        let body = host.element_by_id("body").unwrap();
        let thumb = widget.thumb();

        // Dispose mid-drag: the document handlers go too.
        host.fire(
            Target::Element(thumb),
            EventKind::PointerDown,
            RawEvent::pointer(Some(thumb), 0.0),
        );
        widget.dispose();

        assert_eq!(host.listener_count(Target::Viewport, EventKind::Resize), 0);
        assert_eq!(host.listener_count(Target::Element(thumb), EventKind::PointerDown), 0);
        assert_eq!(host.listener_count(Target::Element(container), EventKind::Wheel), 0);
        assert_eq!(host.listener_count(Target::Document, EventKind::PointerMove), 0);
        assert_eq!(host.listener_count(Target::Document, EventKind::PointerUp), 0);
        assert_eq!(host.watch_count(body), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn content_growth_activates_after_the_quiet_window() {
        LocalSet::new()
            .run_until(async {
                let host = MemoryHost::new();
                host.insert("pane", 100.0);
                let body = host.insert("body", 0.0);
                let widget = ScrollBar::create(
                    Rc::new(host.clone()),
                    "pane",
                    "body",
                    StyleOptions::default(),
                )
                .unwrap();
                assert!(!widget.is_active(), "empty content starts hidden");

                // Content streams in.
                host.set_height(body, 300.0);
                host.mutate(body);
                sleep(Duration::from_millis(490)).await;
                assert!(!widget.is_active(), "still inside the quiet window");

                sleep(Duration::from_millis(20)).await;
                assert!(widget.is_active());
                assert_eq!(widget.thumb_height(), 40.0);
                assert_eq!(host.opacity(widget.track()), 0.8);
                // Late activation wired the input handlers.
                assert_eq!(
                    host.listener_count(Target::Element(widget.thumb()), EventKind::PointerDown),
                    1
                );
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn content_shrink_pins_to_bottom_on_reconcile() {
        LocalSet::new()
            .run_until(async {
                let (host, widget) = overflowing();
                let body = host.element_by_id("body").unwrap();
                let thumb = widget.thumb();

                // Scroll down to content offset -80.
                host.fire(
                    Target::Element(thumb),
                    EventKind::PointerDown,
                    RawEvent::pointer(Some(thumb), 0.0),
                );
                host.fire(
                    Target::Document,
                    EventKind::PointerMove,
                    RawEvent::pointer(None, 24.0),
                );
                host.fire(Target::Document, EventKind::PointerUp, RawEvent::bare());
                assert!((widget.content_top() - (-80.0)).abs() < 1e-9);

                host.set_height(body, 150.0);
                host.mutate(body);
                sleep(Duration::from_millis(510)).await;

                assert!(widget.is_active());
                assert_eq!(widget.thumb_top(), 25.0, "pinned to max travel");
                assert!((widget.content_top() - (-50.0)).abs() < 1e-9);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn viewport_resize_can_hide_the_widget() {
        LocalSet::new()
            .run_until(async {
                let (host, widget) = overflowing();
                let pane = host.element_by_id("pane").unwrap();

                host.set_height(pane, 400.0);
                host.fire(Target::Viewport, EventKind::Resize, RawEvent::bare());
                sleep(Duration::from_millis(510)).await;

                assert!(!widget.is_active());
                assert_eq!(host.opacity(widget.track()), 0.0);
                assert_eq!(widget.content_top(), 0.0);
            })
            .await;
    }
}
