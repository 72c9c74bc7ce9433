//! Health checks for the formula setup.
//!
//! Older installs copied every built-in into the town and rig formulas
//! directories. Copies that still match the built-in byte for byte do
//! nothing but hide future built-in changes, so they can be removed.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, warn};

use crate::manager::OverrideManager;
use crate::{OverrideError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Warning,
}

impl CheckStatus {
    /// `[OK]` / `[WARN]` tag for plain output.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Ok => "[OK]",
            Self::Warning => "[WARN]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub status: CheckStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<PathBuf>,
}

impl OverrideManager {
    /// Are any built-ins available at all?
    pub fn check_builtins(&self) -> CheckResult {
        let (status, message) = if self.builtins.is_empty() {
            (CheckStatus::Warning, "No embedded formulas found".to_string())
        } else {
            (CheckStatus::Ok, format!("{} embedded formulas available", self.builtins.len()))
        };
        CheckResult {
            name: "formulas",
            status,
            message,
            details: Vec::new(),
        }
    }

    /// Override files whose bytes equal their built-in exactly.
    pub fn legacy_copies(&self) -> Vec<PathBuf> {
        self.overrides()
            .into_iter()
            .filter(|o| {
                let Ok(local) = std::fs::read(&o.path) else {
                    debug!(path = %o.path.display(), "unreadable override skipped");
                    return false;
                };
                self.builtins
                    .get(&o.name)
                    .is_ok_and(|builtin| builtin.as_bytes() == local.as_slice())
            })
            .map(|o| o.path)
            .collect()
    }

    pub fn check_legacy(&self) -> CheckResult {
        let details = self.legacy_copies();
        let (status, message) = if details.is_empty() {
            (CheckStatus::Ok, "No legacy provisioned formulas found".to_string())
        } else {
            (
                CheckStatus::Warning,
                format!(
                    "Found {} legacy provisioned formulas that match embedded versions",
                    details.len()
                ),
            )
        };
        CheckResult {
            name: "legacy-formulas",
            status,
            message,
            details,
        }
    }
}

/// Delete `paths`, returning the ones removed.
///
/// Every path is attempted; failures are collected into one error.
pub fn remove_legacy(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    let mut failures = Vec::new();
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => removed.push(path.clone()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not remove legacy formula");
                failures.push(format!("  {}: {e}", path.display()));
            }
        }
    }
    if failures.is_empty() {
        Ok(removed)
    } else {
        Err(OverrideError::RemoveFailed {
            removed,
            details: failures.join("\n"),
        })
    }
}
