//! File actions module.
//!
//! Disposal of the losers chosen by [`crate::duplicates::WinnerSelector`]:
//! - Deletion or quarantine-move
//! - Dry-run reporting
//! - Per-file confirmation
//! - Size verification against the scan snapshot
//!
//! ```no_run
//! use mediadupe::actions::{DisposeConfig, Disposer};
//! use std::path::PathBuf;
//! # let plan = mediadupe::actions::DisposalPlan::default();
//!
//! let config = DisposeConfig::default()
//!     .with_force(true)
//!     .with_quarantine_root(Some(PathBuf::from("/backup/dupes")))
//!     .with_scan_root(Some(PathBuf::from("/videos")));
//! let result = Disposer::new(config).dispose(&plan);
//! println!("{}", result.summary());
//! ```

pub mod dispose;

pub use dispose::{
    quarantine_destination, ActionKind, ActionOutcome, AlwaysConfirm, Confirm, DisposalAction,
    DisposalPlan, DisposalResult, DisposeConfig, DisposeError, Disposer, NeverConfirm,
    StdinConfirm,
};
