//! Ctrl+C handling.
//!
//! A single `Arc<AtomicBool>` is set when the user interrupts. The engine
//! checks it per file while hashing and sampling and stops before
//! clustering; the disposer checks it before every file and reports the
//! rest as skipped. The process then exits with code 130.
//!
//! ```rust,no_run
//! use mediadupe::duplicates::FinderConfig;
//! use mediadupe::signal::install_handler;
//!
//! let handler = install_handler();
//! let config = FinderConfig::default().with_shutdown_flag(handler.get_flag());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a handler with the flag cleared.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether shutdown was requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Set the flag.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clone of the flag for the engine and disposer.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Clear the flag.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    fn reset_and_clone(&self) -> Self {
        self.reset();
        self.clone()
    }
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install the Ctrl+C hook once per process and return its handler.
///
/// Later calls return the same handler with the flag cleared. If another
/// hook is already registered, an unhooked handler is returned; manual
/// [`ShutdownHandler::request_shutdown`] still works.
pub fn install_handler() -> ShutdownHandler {
    GLOBAL_HANDLER
        .get_or_init(|| {
            let handler = ShutdownHandler::new();
            let flag = handler.get_flag();
            let hooked = ctrlc::set_handler(move || {
                flag.store(true, Ordering::SeqCst);
                let _ = writeln!(std::io::stderr(), "\nInterrupted. Finishing current file...");
                log::info!("Shutdown signal received");
            });
            if let Err(e) = hooked {
                log::debug!("Ctrl+C hook not installed: {}", e);
            }
            handler
        })
        .reset_and_clone()
}
