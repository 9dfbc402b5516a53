//! Trailing-edge debouncer for change signals.
//!
//! Rapid repeated signals collapse into a single callback invocation that
//! fires one quiescence window after the *last* signal, carrying that
//! signal's payload.  There is at most one pending timer; every new signal
//! aborts and replaces it.  Timers are tokio tasks spawned with
//! [`tokio::task::spawn_local`], so a current-thread runtime with a
//! [`tokio::task::LocalSet`] must be running.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tokio::task::JoinHandle;

struct Inner<T> {
    window: Duration,
    callback: RefCell<Box<dyn FnMut(T)>>,
    pending: RefCell<Option<JoinHandle<()>>>,
}

/// Debounced wrapper around one callback.  Cheap to clone; clones share the
/// same pending timer.
pub struct Debouncer<T: 'static> {
    inner: Rc<Inner<T>>,
}

impl<T: 'static> Clone for Debouncer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Debouncer<T> {
    pub fn new(window: Duration, callback: impl FnMut(T) + 'static) -> Self {
        Self {
            inner: Rc::new(Inner {
                window,
                callback: RefCell::new(Box::new(callback)),
                pending: RefCell::new(None),
            }),
        }
    }

    /// Record a signal.  Resets the quiescence timer; `payload` replaces any
    /// payload from earlier, still-pending signals.
    pub fn signal(&self, payload: T) {
        if let Some(pending) = self.inner.pending.borrow_mut().take() {
            pending.abort();
        }

        let inner = Rc::clone(&self.inner);
        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(inner.window).await;
            inner.pending.borrow_mut().take();
            tracing::trace!("quiescence window elapsed");
            (&mut *inner.callback.borrow_mut())(payload);
        });
        *self.inner.pending.borrow_mut() = Some(handle);
    }

    /// Drop any pending timer without invoking the callback.
    pub fn cancel(&self) {
        if let Some(pending) = self.inner.pending.borrow_mut().take() {
            pending.abort();
        }
    }
}
