//! Storage grant subsystem.
//!
//! # Data Flow
//! ```text
//! Materialization output:
//!     (HandlerRef, HttpMethod) pairs, one per realized method
//!     → resolver.rs (max-reduce per handler)
//!     → + manual overrides (raise only, conflicts rejected)
//!     → GrantMap (handler name → GrantRequirement)
//!
//! Apply phase (external):
//!     GrantRequirement → Provisioner::apply_grant
//! ```
//!
//! # Design Decisions
//! - Least privilege: a handler with no pairs gets no entry at all
//! - Levels only ever go up (None < Read < ReadWrite)
//! - Resolution is a pure reduction: order of pairs does not matter

pub mod resolver;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::provision::HandlerRef;

pub use resolver::{resolve_grants, resolve_with_overrides};

/// Storage permission level, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GrantLevel {
    #[default]
    None,
    Read,
    ReadWrite,
}

impl fmt::Display for GrantLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::None => "none",
            Self::Read => "read",
            Self::ReadWrite => "read_write",
        })
    }
}

/// Resolved permission for one handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantRequirement {
    pub handler: HandlerRef,
    pub level: GrantLevel,
}

/// A manual grant supplied from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantOverride {
    /// Handler name the override applies to.
    pub handler: String,

    /// Level the handler must hold at minimum.
    pub level: GrantLevel,
}

/// Resolved grants keyed by handler name.
pub type GrantMap = BTreeMap<String, GrantRequirement>;
