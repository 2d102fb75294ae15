//! Wayland dispatch glue for the foreign-toplevel protocol
//!
//! Translates `zwlr_foreign_toplevel_manager_v1` and
//! `zwlr_foreign_toplevel_handle_v1` events into registry operations and
//! fires the host callback on focus gain. Events are routed to records by
//! the handle's protocol id, which replaces the per-handle listener of
//! libwayland-style clients.

use std::collections::HashMap;

use tracing::{debug, trace};
use wayland_client::globals::GlobalListContents;
use wayland_client::protocol::wl_registry;
use wayland_client::{Connection, Dispatch, Proxy, QueueHandle};
use wayland_protocols_wlr::foreign_toplevel::v1::client::{
    zwlr_foreign_toplevel_handle_v1::{self, ZwlrForeignToplevelHandleV1},
    zwlr_foreign_toplevel_manager_v1::{self, ZwlrForeignToplevelManagerV1},
};

use crate::registry::{decode_state_flags, ToplevelKey, ToplevelRegistry};
use crate::types::{FocusCallback, FocusSnapshot};

/// Dispatch target owned by the tracker
///
/// Holds the registry, the live handle proxies (for destruction on close
/// and teardown), the manager proxy, and the registered callback.
pub(crate) struct TrackerState {
    pub(crate) registry: ToplevelRegistry,
    pub(crate) handles: HashMap<ToplevelKey, ZwlrForeignToplevelHandleV1>,
    pub(crate) manager: Option<ZwlrForeignToplevelManagerV1>,
    pub(crate) callback: Option<FocusCallback>,
    pub(crate) last_focus: Option<FocusSnapshot>,
}

impl TrackerState {
    pub(crate) fn new() -> Self {
        Self {
            registry: ToplevelRegistry::default(),
            handles: HashMap::new(),
            manager: None,
            callback: None,
            last_focus: None,
        }
    }

    /// Deliver a focus snapshot to the registered callback
    ///
    /// Invoked synchronously from event dispatch. The snapshot is also
    /// retained as the last notified focus state.
    pub(crate) fn notify(&mut self, snapshot: FocusSnapshot) {
        self.last_focus = Some(snapshot.clone());
        if let Some(callback) = self.callback.as_mut() {
            callback(&snapshot);
        }
    }
}

// Registry events are consumed by the global list during connect; nothing
// to do at dispatch time.
impl Dispatch<wl_registry::WlRegistry, GlobalListContents> for TrackerState {
    fn event(
        _state: &mut Self,
        _proxy: &wl_registry::WlRegistry,
        _event: wl_registry::Event,
        _data: &GlobalListContents,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<ZwlrForeignToplevelManagerV1, ()> for TrackerState {
    fn event(
        state: &mut Self,
        _proxy: &ZwlrForeignToplevelManagerV1,
        event: zwlr_foreign_toplevel_manager_v1::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        use zwlr_foreign_toplevel_manager_v1::Event;

        match event {
            Event::Toplevel { toplevel } => {
                let key = toplevel.id().protocol_id();
                trace!(key, "new toplevel handle");
                state.registry.insert(key);
                state.handles.insert(key, toplevel);
            }
            Event::Finished => {
                // The compositor is withdrawing the manager at runtime;
                // the proxy is dead from here on.
                debug!("toplevel manager finished, releasing manager proxy");
                state.manager = None;
            }
            _ => {}
        }
    }

    wayland_client::event_created_child!(TrackerState, ZwlrForeignToplevelManagerV1, [
        zwlr_foreign_toplevel_manager_v1::EVT_TOPLEVEL_OPCODE => (ZwlrForeignToplevelHandleV1, ())
    ]);
}

impl Dispatch<ZwlrForeignToplevelHandleV1, ()> for TrackerState {
    fn event(
        state: &mut Self,
        proxy: &ZwlrForeignToplevelHandleV1,
        event: zwlr_foreign_toplevel_handle_v1::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        use zwlr_foreign_toplevel_handle_v1::Event;

        let key = proxy.id().protocol_id();

        match event {
            Event::Title { title } => {
                trace!(key, %title, "toplevel title");
                state.registry.set_title(key, title);
            }
            Event::AppId { app_id } => {
                trace!(key, %app_id, "toplevel app id");
                state.registry.set_app_id(key, app_id);
            }
            Event::State { state: flags } => {
                let flags = decode_state_flags(&flags);
                if let Some(snapshot) = state.registry.apply_state(key, &flags) {
                    debug!(
                        key,
                        app_id = snapshot.app_id.as_deref().unwrap_or(""),
                        "toplevel gained focus"
                    );
                    state.notify(snapshot);
                }
            }
            Event::Done => {
                // Batch-completion marker. Focus notifications fire
                // eagerly on the state event, not here.
                trace!(key, "toplevel property batch complete");
            }
            Event::Closed => {
                trace!(key, "toplevel closed");
                state.registry.remove(key);
                if let Some(handle) = state.handles.remove(&key) {
                    handle.destroy();
                }
            }
            // Output membership and parenting carry no focus information.
            Event::OutputEnter { .. } | Event::OutputLeave { .. } | Event::Parent { .. } => {}
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn snapshot(app_id: &str, title: &str) -> FocusSnapshot {
        FocusSnapshot {
            app_id: Some(app_id.to_string()),
            title: Some(title.to_string()),
            focused: true,
        }
    }

    #[test]
    fn notify_invokes_the_callback_with_the_snapshot() {
        let delivered: Rc<RefCell<Vec<FocusSnapshot>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&delivered);

        let mut state = TrackerState::new();
        state.callback = Some(Box::new(move |snapshot| {
            sink.borrow_mut().push(snapshot.clone());
        }));

        state.notify(snapshot("org.example.editor", "Editor"));

        let delivered = delivered.borrow();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].app_id.as_deref(), Some("org.example.editor"));
        assert!(delivered[0].focused);
    }

    #[test]
    fn notify_records_the_last_focus_without_a_callback() {
        let mut state = TrackerState::new();

        state.notify(snapshot("org.example.editor", "Editor"));

        assert_eq!(
            state.last_focus.as_ref().and_then(|s| s.title.as_deref()),
            Some("Editor")
        );
    }

    #[test]
    fn registering_a_callback_replaces_the_previous_one() {
        let first_calls = Rc::new(RefCell::new(0u32));
        let second_calls = Rc::new(RefCell::new(0u32));

        let mut state = TrackerState::new();

        let counter = Rc::clone(&first_calls);
        state.callback = Some(Box::new(move |_| *counter.borrow_mut() += 1));
        let counter = Rc::clone(&second_calls);
        state.callback = Some(Box::new(move |_| *counter.borrow_mut() += 1));

        state.notify(snapshot("org.example.editor", "Editor"));

        assert_eq!(*first_calls.borrow(), 0);
        assert_eq!(*second_calls.borrow(), 1);
    }

    #[test]
    fn last_focus_tracks_the_most_recent_notification() {
        let mut state = TrackerState::new();

        state.notify(snapshot("org.example.editor", "Editor"));
        state.notify(snapshot("org.example.terminal", "Terminal"));

        assert_eq!(
            state
                .last_focus
                .as_ref()
                .and_then(|s| s.app_id.as_deref()),
            Some("org.example.terminal")
        );
    }
}
