//! Size-change detection.
//!
//! Two signal sources — a mutation watch on the content element and the
//! host's viewport resize event — feed one debounced reconcile callback.
//! Rapid bursts (content streaming in, a window being resized by drag)
//! collapse into a single reconciliation per quiescence window.
//! [`ChangeObserver::remove`] stops the watch, the resize subscription and
//! any pending timer together; `Drop` does the same.

use std::rc::Rc;
use std::time::Duration;

use crate::bridge::{EventBridge, HandlerToken};
use crate::debounce::Debouncer;
use crate::host::{ElementId, EventKind, Host, Target, WatchHandle};

/// Quiescence window applied when the caller doesn't pick one.
pub const DEFAULT_QUIET_WINDOW: Duration = Duration::from_millis(500);

/// Which source noticed the change.  Reconciliation doesn't depend on it,
/// but it is handed through for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSignal {
    /// Subtree/attribute/child mutation on the content element.
    Mutation,
    /// The host viewport was resized.
    ViewportResize,
}

/// Paired acquisition of a mutation watch and a resize subscription.
pub struct ChangeObserver {
    host: Rc<dyn Host>,
    bridge: EventBridge,
    watch: Option<WatchHandle>,
    resize: Option<HandlerToken>,
    debounce: Debouncer<ChangeSignal>,
}

impl ChangeObserver {
    /// Start watching `content` mutations and viewport resizes, invoking
    /// `on_change` once per quiescence window with the last signal seen.
    pub fn install(
        host: Rc<dyn Host>,
        bridge: EventBridge,
        content: ElementId,
        window: Duration,
        on_change: impl FnMut(ChangeSignal) + 'static,
    ) -> crate::Result<Self> {
        let debounce = Debouncer::new(window, on_change);

        let mutation_sink = debounce.clone();
        let watch = host.watch(
            content,
            Box::new(move || mutation_sink.signal(ChangeSignal::Mutation)),
        );

        let resize_sink = debounce.clone();
        let resize = bridge.subscribe(Target::Viewport, EventKind::Resize, move |_| {
            resize_sink.signal(ChangeSignal::ViewportResize);
        })?;

        tracing::debug!(?content, ?window, "change observer installed");
        Ok(Self {
            host,
            bridge,
            watch: Some(watch),
            resize: Some(resize),
            debounce,
        })
    }

    /// Stop both signal sources and drop any pending timer.  Idempotent.
    pub fn remove(&mut self) {
        if let Some(watch) = self.watch.take() {
            self.host.unwatch(watch);
        }
        if let Some(token) = self.resize.take() {
            if let Err(err) = self.bridge.unsubscribe(token) {
                tracing::debug!(?err, "resize subscription already gone");
            }
        }
        self.debounce.cancel();
    }
}

impl Drop for ChangeObserver {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mem::MemoryHost;
    use crate::host::RawEvent;
    use std::cell::RefCell;
    use tokio::task::LocalSet;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn both_sources_feed_one_debounced_callback() {
        LocalSet::new()
            .run_until(async {
                let host = MemoryHost::new();
                let content = host.insert("body", 100.0);
                let bridge = EventBridge::new(Rc::new(host.clone()));

                let seen: Rc<RefCell<Vec<ChangeSignal>>> = Rc::new(RefCell::new(Vec::new()));
                let sink = Rc::clone(&seen);
                let mut observer = ChangeObserver::install(
                    Rc::new(host.clone()),
                    bridge,
                    content,
                    DEFAULT_QUIET_WINDOW,
                    move |signal| sink.borrow_mut().push(signal),
                )
                .unwrap();

                // A mutation burst followed by a resize: one callback, with
                // the resize (last signal) as payload.
                host.mutate(content);
                host.mutate(content);
                host.fire(Target::Viewport, EventKind::Resize, RawEvent::bare());
                sleep(DEFAULT_QUIET_WINDOW + Duration::from_millis(10)).await;

                assert_eq!(*seen.borrow(), vec![ChangeSignal::ViewportResize]);
                observer.remove();
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn remove_stops_both_sources() {
        LocalSet::new()
            .run_until(async {
                let host = MemoryHost::new();
                let content = host.insert("body", 100.0);
                let bridge = EventBridge::new(Rc::new(host.clone()));

                let count = Rc::new(RefCell::new(0));
                let sink = Rc::clone(&count);
                let mut observer = ChangeObserver::install(
                    Rc::new(host.clone()),
                    bridge,
                    content,
                    DEFAULT_QUIET_WINDOW,
                    move |_| *sink.borrow_mut() += 1,
                )
                .unwrap();

                host.mutate(content);
                observer.remove();

                // Pending timer was cancelled, sources are disconnected.
                sleep(DEFAULT_QUIET_WINDOW * 2).await;
                host.mutate(content);
                host.fire(Target::Viewport, EventKind::Resize, RawEvent::bare());
                sleep(DEFAULT_QUIET_WINDOW * 2).await;

                assert_eq!(*count.borrow(), 0);
                assert_eq!(host.watch_count(content), 0);
                assert_eq!(host.listener_count(Target::Viewport, EventKind::Resize), 0);
            })
            .await;
    }
}
