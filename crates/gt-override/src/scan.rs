//! Find overrides and custom formulas across the town and its rigs.

use std::fmt;
use std::path::{Path, PathBuf};

use gt_formula::resolve::formulas_dir;
use gt_formula::types::FORMULA_SUFFIX;
use serde::Serialize;
use tracing::debug;

use crate::manager::OverrideManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Town,
    Rig,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Town => f.write_str("town"),
            Self::Rig => f.write_str("rig"),
        }
    }
}

/// A formula file in a town or rig formulas directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Override {
    pub name: String,
    pub path: PathBuf,
    pub level: Level,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rig: Option<String>,
    /// True for an override of a built-in, false for a custom formula.
    pub shadows_builtin: bool,
}

impl Override {
    /// `rig override (gastown)` or `town override`.
    pub fn label(&self) -> String {
        match &self.rig {
            Some(rig) => format!("rig override ({rig})"),
            None => "town override".to_string(),
        }
    }
}

/// Every file that could stand in for one formula name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverrideChain {
    pub name: String,
    pub builtin: bool,
    pub town: Option<Override>,
    pub rigs: Vec<Override>,
}

impl OverrideChain {
    /// The file that wins resolution: the first rig override, else the
    /// town one.
    pub fn active(&self) -> Option<&Override> {
        self.rigs.first().or(self.town.as_ref())
    }

    pub fn has_overrides(&self) -> bool {
        self.town.is_some() || !self.rigs.is_empty()
    }
}

/// `*.formula.toml` stems in `dir`, sorted. A missing directory is empty.
fn formula_files(dir: &Path) -> Vec<(String, PathBuf)> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "skipping formulas directory");
            return Vec::new();
        }
    };
    let mut files: Vec<(String, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter_map(|entry| {
            let file_name = entry.file_name();
            let stem = file_name.to_str()?.strip_suffix(FORMULA_SUFFIX)?;
            (!stem.is_empty()).then(|| (stem.to_string(), entry.path()))
        })
        .collect();
    files.sort();
    files
}

impl OverrideManager {
    /// Town formulas directory followed by each rig's, with their rig name.
    fn tier_dirs(&self) -> Vec<(Option<String>, PathBuf)> {
        let mut dirs = vec![(None, formulas_dir(&self.town_root))];
        dirs.extend(
            self.rigs
                .rig_dirs()
                .map(|(rig, dir)| (Some(rig.to_string()), formulas_dir(&dir))),
        );
        dirs
    }

    /// Every formula file at town or rig level, town first, then rigs in
    /// sorted order.
    pub fn scan_all(&self) -> Vec<Override> {
        let mut found = Vec::new();
        for (rig, dir) in self.tier_dirs() {
            for (name, path) in formula_files(&dir) {
                found.push(Override {
                    shadows_builtin: self.builtins.exists(&name),
                    level: if rig.is_some() { Level::Rig } else { Level::Town },
                    rig: rig.clone(),
                    name,
                    path,
                });
            }
        }
        found
    }

    /// Files that shadow a built-in.
    pub fn overrides(&self) -> Vec<Override> {
        self.scan_all().into_iter().filter(|o| o.shadows_builtin).collect()
    }

    /// Files with no built-in counterpart.
    pub fn custom_formulas(&self) -> Vec<Override> {
        self.scan_all().into_iter().filter(|o| !o.shadows_builtin).collect()
    }

    /// Files named `name`, town first.
    pub fn overrides_for(&self, name: &str) -> Vec<Override> {
        let file = format!("{name}{FORMULA_SUFFIX}");
        self.tier_dirs()
            .into_iter()
            .filter_map(|(rig, dir)| {
                let path = dir.join(&file);
                path.is_file().then(|| Override {
                    name: name.to_string(),
                    path,
                    level: if rig.is_some() { Level::Rig } else { Level::Town },
                    rig,
                    shadows_builtin: self.builtins.exists(name),
                })
            })
            .collect()
    }

    /// The built-in and the override files for `name`.
    pub fn chain(&self, name: &str) -> OverrideChain {
        let mut town = None;
        let mut rigs = Vec::new();
        for o in self.overrides_for(name) {
            match o.level {
                Level::Town => town = Some(o),
                Level::Rig => rigs.push(o),
            }
        }
        OverrideChain {
            name: name.to_string(),
            builtin: self.builtins.exists(name),
            town,
            rigs,
        }
    }
}
