//! Error types for toplevel tracking

use thiserror::Error;
use wayland_client::backend::WaylandError;
use wayland_client::globals::{BindError, GlobalError};
use wayland_client::{ConnectError, DispatchError};

/// Errors that can occur while tracking foreign toplevels
#[derive(Debug, Error)]
pub enum TrackerError {
    /// No Wayland compositor is reachable
    #[error("failed to connect to the Wayland compositor: {0}")]
    Connect(#[from] ConnectError),

    /// Enumerating the compositor's globals failed
    #[error("failed to enumerate compositor globals: {0}")]
    Globals(#[from] GlobalError),

    /// The compositor does not advertise the foreign-toplevel manager
    /// at a supported version
    #[error("compositor does not expose zwlr_foreign_toplevel_manager_v1: {0}")]
    ManagerUnavailable(#[source] BindError),

    /// Dispatching buffered protocol events failed
    #[error("failed to dispatch Wayland events: {0}")]
    Dispatch(#[from] DispatchError),

    /// The Wayland backend reported a transport fault
    #[error("Wayland backend error: {0}")]
    Backend(#[from] WaylandError),

    /// The zero-timeout readiness check on the descriptor failed
    #[error("readiness poll on the Wayland descriptor failed: {0}")]
    Poll(#[source] std::io::Error),
}
