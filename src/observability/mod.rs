//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (info per phase, debug per registered method)
//!
//! Consumers:
//!     → logging.rs subscriber (stderr, filtered by RUST_LOG or config)
//! ```
//!
//! # Design Decisions
//! - The library only emits events; installing a subscriber is the binary's job
//! - Logs go to stderr so `synth` can write the template to stdout

pub mod logging;
