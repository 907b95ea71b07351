//! Ctrl+C handling for cooperative cancellation.
//!
//! A [`CancelHandler`] wraps the `Arc<AtomicBool>` that the walker and the
//! hash coordinator poll between files. The first Ctrl+C sets it; work in
//! flight finishes, nothing new starts, and the partial result is reported
//! with exit code 130.
//!
//! ```rust,no_run
//! use picdupe::duplicates::CoordinatorConfig;
//! use picdupe::signal::install_handler;
//!
//! let handler = install_handler();
//! let config = CoordinatorConfig::default().with_shutdown_flag(handler.flag());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelHandler {
    flag: Arc<AtomicBool>,
}

impl CancelHandler {
    /// Create a handler with no cancellation requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clear the flag so the handler can be reused.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// The flag to hand to workers.
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

static GLOBAL_HANDLER: OnceLock<CancelHandler> = OnceLock::new();

/// Install the process-wide Ctrl+C hook and return its handler.
///
/// Only one hook can exist per process. Later calls return the same
/// handler with its flag reset. If the hook cannot be registered (another
/// library owns it), the returned handler still works for manual
/// cancellation.
pub fn install_handler() -> CancelHandler {
    let handler = GLOBAL_HANDLER.get_or_init(|| {
        let handler = CancelHandler::new();
        let flag = handler.flag();
        let hooked = ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\nInterrupted. Finishing files in progress...");
            let _ = stderr.flush();
        });
        if let Err(e) = hooked {
            log::debug!("Ctrl+C hook not installed ({}), cancellation is manual only", e);
        }
        handler
    });
    handler.reset();
    handler.clone()
}
