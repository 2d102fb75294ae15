//! Foreign-toplevel focus tracking for wlroots compositors
//!
//! This crate watches which top-level window holds input focus on
//! compositors implementing `zwlr_foreign_toplevel_manager_v1` (Sway,
//! Hyprland, Wayfire, River, labwc, and other wlroots-based
//! compositors). It enables a panel or status program to:
//!
//! - Display the focused application's identity (app id and title)
//! - React to focus changes through a synchronous callback
//! - Stay responsive by pumping the connection from its own
//!   readiness-based event loop, without blocking
//!
//! ## Architecture
//!
//! - [`ToplevelTracker`]: owns the connection, the bound manager, and
//!   the per-window registry; exposes the pump and teardown
//! - [`FocusSnapshot`]: the immutable value delivered on focus gain
//! - [`TrackerError`]: error types for connection and pump failures
//!
//! ## Protocol
//!
//! The compositor advertises a manager global that emits one handle per
//! toplevel. Each handle streams `title`, `app_id`, and `state` events
//! (terminated by `done` markers) and a final `closed`. Focus is the
//! `activated` flag inside the state set; the tracker notifies exactly
//! when a handle's flag goes from unset to set.
//!
//! ## Integration
//!
//! ```ignore
//! let mut tracker = ToplevelTracker::connect()?;
//! tracker.set_focus_callback(|snapshot| {
//!     println!("focused: {:?}", snapshot.app_id);
//! });
//!
//! // Host loop: wait for tracker.fd() to become readable, then
//! tracker.read_events()?;
//! tracker.dispatch_pending()?;
//! ```

mod error;
mod handlers;
mod registry;
mod tracker;
mod types;

pub use error::TrackerError;
pub use tracker::ToplevelTracker;
pub use types::{FocusCallback, FocusSnapshot, ToplevelInfo};
