//! Lifecycle management for long-running watch mode.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGINT (Ctrl-C) → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     latched flag → watch loop stops re-planning → watcher dropped → exit
//! ```
//!
//! # Design Decisions
//! - One-shot commands (validate, plan, synth) never touch this module
//! - Shutdown is cooperative: the loop finishes the plan it is writing

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownListener};
