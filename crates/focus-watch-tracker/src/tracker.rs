//! The tracker context object
//!
//! [`ToplevelTracker`] owns the display connection, the bound manager,
//! and the registry, and exposes the narrow host-facing surface: connect,
//! callback registration, descriptor access, the non-blocking pump, and
//! teardown. One tracker per connection; independent instances may
//! coexist in one process.

use std::os::fd::{AsFd, BorrowedFd};

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use tracing::{debug, trace};
use wayland_client::backend::WaylandError;
use wayland_client::globals::{registry_queue_init, GlobalList};
use wayland_client::{Connection, EventQueue, Proxy};
use wayland_protocols_wlr::foreign_toplevel::v1::client::zwlr_foreign_toplevel_manager_v1::ZwlrForeignToplevelManagerV1;

use crate::error::TrackerError;
use crate::handlers::TrackerState;
use crate::types::{FocusSnapshot, ToplevelInfo};

/// Highest manager version this client negotiates
const MANAGER_VERSION_MAX: u32 = 3;

/// Tracks foreign toplevels over one Wayland connection
///
/// Drive it from a readiness-based loop: register [`fd`](Self::fd) for
/// read readiness, call [`read_events`](Self::read_events) when it fires,
/// and [`dispatch_pending`](Self::dispatch_pending) at idle moments.
/// None of the pump methods block.
pub struct ToplevelTracker {
    // Field order is teardown order: records and proxies first, then the
    // event queue, then the registry globals and the connection itself.
    state: TrackerState,
    queue: EventQueue<TrackerState>,
    _globals: GlobalList,
    conn: Connection,
}

impl ToplevelTracker {
    /// Connect to the compositor and bind the foreign-toplevel manager
    ///
    /// Performs two synchronous round-trips: one to enumerate the
    /// advertised globals, and one so toplevels that existed before this
    /// client connected are announced before `connect` returns.
    ///
    /// On any error every acquired resource is released before
    /// returning; no half-bound connection is ever left open.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Connect` if no compositor is reachable and
    /// `TrackerError::ManagerUnavailable` if the compositor does not
    /// advertise `zwlr_foreign_toplevel_manager_v1` at version 1..=3.
    pub fn connect() -> Result<Self, TrackerError> {
        let conn = Connection::connect_to_env()?;
        let (globals, mut queue) = registry_queue_init::<TrackerState>(&conn)?;
        let qh = queue.handle();

        let manager: ZwlrForeignToplevelManagerV1 = globals
            .bind(&qh, 1..=MANAGER_VERSION_MAX, ())
            .map_err(TrackerError::ManagerUnavailable)?;
        debug!(
            version = manager.version(),
            "bound zwlr_foreign_toplevel_manager_v1"
        );

        let mut state = TrackerState::new();
        state.manager = Some(manager);

        // Initial burst: pre-existing toplevels and their properties.
        queue.roundtrip(&mut state)?;
        debug!(
            toplevels = state.registry.len(),
            "initial toplevel enumeration complete"
        );

        Ok(Self {
            state,
            queue,
            _globals: globals,
            conn,
        })
    }

    /// Register the focus-change callback
    ///
    /// The callback runs synchronously during event dispatch, once per
    /// focus-gain transition. At most one callback is held; registering
    /// again replaces the previous one. The callback must not call back
    /// into the tracker before returning, or event ordering guarantees
    /// break.
    pub fn set_focus_callback(&mut self, callback: impl FnMut(&FocusSnapshot) + 'static) {
        self.state.callback = Some(Box::new(callback));
    }

    /// The connection's readiness descriptor
    ///
    /// Register it for read readiness with the host event loop; do not
    /// read from it directly.
    pub fn fd(&self) -> BorrowedFd<'_> {
        self.conn.as_fd()
    }

    /// Dispatch protocol messages already buffered client-side
    ///
    /// Performs no socket reads. Queued outgoing requests are flushed
    /// afterwards. Safe to call at any idle moment; returns the number of
    /// events dispatched.
    pub fn dispatch_pending(&mut self) -> Result<usize, TrackerError> {
        let dispatched = self.queue.dispatch_pending(&mut self.state)?;
        self.queue.flush()?;
        Ok(dispatched)
    }

    /// Read and dispatch new events without blocking
    ///
    /// Runs the balanced prepare/read/cancel sequence: prepare a read
    /// (dispatching any already-buffered events first so none are
    /// skipped), flush outgoing requests, then check the descriptor with
    /// a zero-timeout poll. If data is ready the read is performed and
    /// dispatched; otherwise the prepared read is cancelled. Safe to call
    /// speculatively; with nothing pending it degrades to a flush.
    pub fn read_events(&mut self) -> Result<(), TrackerError> {
        let guard = loop {
            match self.queue.prepare_read() {
                Some(guard) => break guard,
                // Buffered events must drain before the socket is read.
                None => {
                    self.queue.dispatch_pending(&mut self.state)?;
                }
            }
        };

        self.queue.flush()?;

        let ready = {
            let mut fds = [PollFd::new(self.conn.as_fd(), PollFlags::POLLIN)];
            match poll(&mut fds, PollTimeout::ZERO) {
                Ok(n) => n > 0,
                Err(Errno::EINTR) => false,
                // Dropping the guard on the error path cancels the
                // prepared read.
                Err(errno) => return Err(TrackerError::Poll(errno.into())),
            }
        };

        if ready {
            match guard.read() {
                Ok(count) => trace!(events = count, "read wayland events"),
                // Lost the race for the socket; nothing to dispatch.
                Err(WaylandError::Io(err))
                    if err.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(err) => return Err(err.into()),
            }
            self.queue.dispatch_pending(&mut self.state)?;
        }
        // Not ready: the guard drops here, cancelling the prepared read.

        Ok(())
    }

    /// The snapshot most recently delivered to the callback
    pub fn last_focus(&self) -> Option<&FocusSnapshot> {
        self.state.last_focus.as_ref()
    }

    /// Some currently activated toplevel, if any
    pub fn active_window(&self) -> Option<ToplevelInfo> {
        self.state.registry.active_window()
    }

    /// All toplevels currently known to the tracker
    pub fn toplevels(&self) -> Vec<ToplevelInfo> {
        self.state.registry.toplevels()
    }

    /// Whether the manager capability is still bound
    ///
    /// Becomes `false` if the compositor withdraws the extension at
    /// runtime (the manager `finished` event).
    pub fn manager_alive(&self) -> bool {
        self.state.manager.is_some()
    }

    /// Release every owned protocol resource
    ///
    /// Destroys all handle proxies, stops the manager, and flushes the
    /// destructor requests. Idempotent; called automatically on drop.
    /// The connection itself closes when the tracker is dropped.
    pub fn close(&mut self) {
        for (_, handle) in self.state.handles.drain() {
            handle.destroy();
        }
        self.state.registry.clear();
        if let Some(manager) = self.state.manager.take() {
            manager.stop();
        }
        let _ = self.queue.flush();
    }
}

impl Drop for ToplevelTracker {
    fn drop(&mut self) {
        self.close();
    }
}
