//! Host-agnostic overlay scrollbar.
//!
//! A track+thumb pair injected into a fixed-size container, shown only while
//! the content overflows, and kept in sync with the scroll proportion.
//! Pointer drags and wheel events translate into content displacement; a
//! debounced observer follows content mutations and viewport resizes.
//!
//! The platform sits behind the [`Host`] trait — element lookup,
//! measurement, style writes, native events, mutation watching.  The crate
//! ships [`MemoryHost`] for headless use; see `demos/terminal.rs` for a live
//! terminal host.
//!
//! Timers (the change-observer debounce) are tokio tasks spawned with
//! `spawn_local`, so widgets must be created inside a current-thread runtime
//! running a [`tokio::task::LocalSet`].
//!
//! ```no_run
//! use std::rc::Rc;
//! use slimrail::{MemoryHost, ScrollBar, StyleOptions};
//!
//! # fn demo() -> slimrail::Result<()> {
//! let host = MemoryHost::new();
//! host.insert("pane", 100.0);
//! host.insert("body", 300.0);
//! let widget = ScrollBar::create(Rc::new(host), "pane", "body", StyleOptions::default())?;
//! assert!(widget.is_active());
//! # Ok(())
//! # }
//! ```

mod bridge;
mod debounce;
mod error;
mod geometry;
mod host;
mod input;
mod observe;
mod style;
mod widget;

pub use bridge::{Event, EventBridge, HandlerToken};
pub use debounce::Debouncer;
pub use error::{Error, Result};
pub use geometry::{Geometry, Phase};
pub use host::mem::{MemElement, MemoryHost};
pub use host::{
    Dispatch, ElementId, EventKind, Host, NativeCallback, NativeHandle, OverlayPart, RawEvent,
    Target, WatchCallback, WatchHandle, WheelDelta,
};
pub use observe::{ChangeObserver, ChangeSignal, DEFAULT_QUIET_WINDOW};
pub use style::{StyleOptions, THUMB_MIN_HEIGHT, TRACK_WIDTH};
pub use widget::ScrollBar;
