//! focus-watch daemon
//!
//! Connects to the compositor, subscribes to foreign-toplevel focus
//! changes, and logs the focused window. Demonstrates the intended host
//! integration: a plain poll(2) loop waiting on the tracker's
//! descriptor, with the tracker's non-blocking pump doing the rest.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use focus_watch_tracker::{ToplevelTracker, TrackerError};

/// Default number of connection retry attempts
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Initial delay between retry attempts (100ms)
const INITIAL_RETRY_DELAY_MS: u64 = 100;

/// Maximum delay between retry attempts (1 second)
const MAX_RETRY_DELAY_MS: u64 = 1000;

#[derive(Parser, Debug)]
#[command(name = "focus-watchd")]
#[command(about = "Focus tracking daemon for wlroots compositors")]
struct Args {
    /// Maximum connection attempts before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    max_retries: u32,

    /// Exit after the first focus notification (for scripting)
    #[arg(long)]
    once: bool,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    loop {
        let mut tracker = connect_with_retry(args.max_retries)?;

        if let Some(window) = tracker.active_window() {
            info!(
                app_id = window.app_id.as_deref().unwrap_or(""),
                title = window.title.as_deref().unwrap_or(""),
                "currently focused"
            );
        }

        let notified = Arc::new(AtomicBool::new(false));
        let notified_flag = Arc::clone(&notified);
        tracker.set_focus_callback(move |snapshot| {
            info!(
                app_id = snapshot.app_id.as_deref().unwrap_or(""),
                title = snapshot.title.as_deref().unwrap_or(""),
                "focus changed"
            );
            notified_flag.store(true, Ordering::Relaxed);
        });

        match run(&mut tracker, args.once, &notified) {
            Ok(()) => return Ok(()),
            Err(err) => {
                // Compositor restarts surface as descriptor errors; drop
                // the dead tracker and start over.
                warn!("connection to compositor lost: {err:#}, reconnecting...");
                drop(tracker);
            }
        }
    }
}

/// Attempt to connect with retry logic and exponential backoff
///
/// A missing manager capability fails immediately: retrying will not make
/// the compositor grow the protocol. Connection failures are retried,
/// which covers the daemon starting before the compositor's socket is up.
fn connect_with_retry(max_retries: u32) -> Result<ToplevelTracker> {
    let mut attempt = 0;
    let mut delay_ms = INITIAL_RETRY_DELAY_MS;

    loop {
        attempt += 1;

        match ToplevelTracker::connect() {
            Ok(tracker) => {
                if attempt > 1 {
                    info!("connected to compositor after {} attempt(s)", attempt);
                }
                return Ok(tracker);
            }
            Err(err @ TrackerError::ManagerUnavailable(_)) => {
                return Err(err).context("compositor lacks foreign-toplevel support");
            }
            Err(err) => {
                if attempt > max_retries {
                    return Err(err)
                        .with_context(|| format!("giving up after {attempt} attempts"));
                }

                warn!(
                    attempt = attempt,
                    max_retries = max_retries,
                    delay_ms = delay_ms,
                    "compositor connection failed, retrying..."
                );

                sleep(Duration::from_millis(delay_ms));
                delay_ms = (delay_ms * 2).min(MAX_RETRY_DELAY_MS);
            }
        }
    }
}

/// Block on the tracker's descriptor and pump events as they arrive
fn run(tracker: &mut ToplevelTracker, once: bool, notified: &AtomicBool) -> Result<()> {
    loop {
        let revents = {
            let mut fds = [PollFd::new(tracker.fd(), PollFlags::POLLIN)];
            poll(&mut fds, PollTimeout::NONE).context("poll on the Wayland descriptor failed")?;
            fds[0].revents().unwrap_or(PollFlags::empty())
        };

        if revents.intersects(PollFlags::POLLERR | PollFlags::POLLHUP) {
            bail!("Wayland descriptor reported an error condition");
        }

        tracker.read_events()?;
        tracker.dispatch_pending()?;

        if !tracker.manager_alive() {
            bail!("compositor withdrew the foreign-toplevel manager");
        }

        if once && notified.load(Ordering::Relaxed) {
            return Ok(());
        }
    }
}
