//! Local customization of built-in formulas.
//!
//! An override is a copy of a built-in formula placed in the town's or a
//! rig's `.beads/formulas/` directory, where it shadows the built-in. The
//! copy starts with a managed header recording the SHA-256 of the built-in
//! it was taken from, so later changes to the built-in can be detected and
//! merged in with the help of an AI agent.
//!
//! Files in those directories with no built-in counterpart are custom
//! formulas.

pub mod agent;
pub mod doctor;
pub mod manager;
pub mod report;
pub mod scan;
pub mod update;

use std::path::PathBuf;

use thiserror::Error;

pub use manager::{ModifyTarget, OverrideManager, ResetOutcome, ResetTarget};
pub use scan::{Level, Override, OverrideChain};
pub use update::{MergeAgent, UpdateCheck, UpdateOptions, UpdateOutcome};

/// Errors from override operations.
#[derive(Debug, Error)]
pub enum OverrideError {
    #[error("formula '{0}' not found in embedded formulas")]
    NotBuiltin(String),

    #[error("formula '{0}' not found anywhere")]
    NotFound(String),

    #[error("Override already exists at {}. Use 'gt formula reset {name}' to remove it first.", .path.display())]
    AlreadyExists { name: String, path: PathBuf },

    #[error(
        "Both town and rig ({rig}) overrides exist for '{name}'.\n\nUse --rig={rig} to remove the rig override, or remove the town override first."
    )]
    Ambiguous { name: String, rig: String },

    #[error("No override found for '{name}' at {level} level. Already using embedded version.")]
    NoOverrideAt { name: String, level: String },

    #[error("No override found for '{name}' at {level} level.")]
    NoCustomAt { name: String, level: String },

    #[error("No override found for '{0}'. Nothing to update.\n\nUse 'gt formula modify {0}' to create an override first.")]
    NothingToUpdate(String),

    #[error(
        "no AI agent found.\n\nInstall one of: claude, opencode, gemini, codex\nOr set $GT_DEFAULT_AGENT to your preferred agent."
    )]
    NoAgent,

    #[error("agent '{0}' not found on PATH")]
    AgentNotOnPath(String),

    #[error("agent '{agent}' command '{command}' not found on PATH")]
    AgentCommandNotOnPath { agent: String, command: String },

    #[error(
        "agent merge failed: {reason}\n\nYou can manually merge by comparing:\n  Embedded: gt formula show {name}\n  Override: {}",
        .path.display()
    )]
    AgentFailed {
        name: String,
        path: PathBuf,
        reason: String,
    },

    #[error(
        "agent returned empty output. Manual merge may be required.\n\nCompare:\n  Embedded: gt formula show {name}\n  Override: {}",
        .path.display()
    )]
    AgentEmpty { name: String, path: PathBuf },

    #[error("failed to remove some formulas:\n{details}")]
    RemoveFailed { removed: Vec<PathBuf>, details: String },

    #[error(transparent)]
    Formula(#[from] gt_formula::FormulaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OverrideError>;
