//! Internal types for toplevel tracking data
//!
//! This module defines the values handed to the host, decoupled from the
//! wire-protocol types in `wayland-protocols-wlr`. This provides:
//!
//! - Stability: hosts are insulated from protocol-crate changes
//! - Clarity: only the fields a panel actually needs are exposed
//! - Safety: snapshots are owned values with no reference back into the
//!   live registry

use crate::registry::ToplevelRecord;

/// Snapshot delivered to the focus callback
///
/// Captured at the moment a toplevel gains the `activated` state. The
/// snapshot is immutable and independent of the registry; it stays valid
/// after the originating window changes or closes.
///
/// # Example
///
/// ```ignore
/// tracker.set_focus_callback(|snapshot: &FocusSnapshot| {
///     println!(
///         "focused: {} ({})",
///         snapshot.app_id.as_deref().unwrap_or("?"),
///         snapshot.title.as_deref().unwrap_or("?"),
///     );
/// });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusSnapshot {
    /// The application identifier (e.g., "firefox", "Alacritty")
    ///
    /// `None` if the compositor has not (yet) sent an `app_id` for this
    /// window. Some clients never set one.
    pub app_id: Option<String>,

    /// The window title
    ///
    /// `None` if no `title` event has been received for this window.
    pub title: Option<String>,

    /// Whether the window holds input focus
    ///
    /// Always `true` for callback deliveries; notifications fire only on
    /// focus gain.
    pub focused: bool,
}

/// Read-only view of one tracked toplevel
///
/// Returned by the tracker's query methods. Like [`FocusSnapshot`], this
/// is an owned copy of the registry record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToplevelInfo {
    /// The application identifier, if one has been announced
    pub app_id: Option<String>,

    /// The window title, if one has been announced
    pub title: Option<String>,

    /// Whether the most recent state set for this window contained
    /// `activated`
    pub activated: bool,
}

impl From<&ToplevelRecord> for ToplevelInfo {
    fn from(record: &ToplevelRecord) -> Self {
        Self {
            app_id: record.app_id.clone(),
            title: record.title.clone(),
            activated: record.activated,
        }
    }
}

/// Registered focus-change handler
///
/// A boxed closure so hosts can capture their own state. The tracker holds
/// at most one: registering a new callback replaces the previous one.
pub type FocusCallback = Box<dyn FnMut(&FocusSnapshot)>;
