//! Copy-for-edit and reset.

use std::path::{Path, PathBuf};

use gt_config::RigRegistry;
use gt_formula::BuiltinSet;
use gt_formula::resolve::formulas_dir;
use gt_formula::types::FORMULA_SUFFIX;
use tracing::{debug, info};

use crate::{OverrideError, Result};

/// Override bookkeeping for one town.
pub struct OverrideManager {
    pub(crate) town_root: PathBuf,
    pub(crate) rigs: RigRegistry,
    pub(crate) builtins: BuiltinSet,
}

/// Where `modify` puts the copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModifyTarget {
    /// `<town>/.beads/formulas`.
    Town,
    /// `<town>/<rig>/.beads/formulas`.
    Rig(String),
    /// `<path>/.beads/formulas` for an explicitly named town.
    TownPath(PathBuf),
}

/// Which override `reset` removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetTarget {
    Town,
    Rig(String),
}

impl ResetTarget {
    pub fn level_label(&self) -> String {
        match self {
            Self::Town => "town".to_string(),
            Self::Rig(rig) => format!("rig '{rig}'"),
        }
    }
}

/// What `reset` removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetOutcome {
    pub path: PathBuf,
    pub level: String,
    /// Whether a built-in of the same name takes over.
    pub builtin_restored: bool,
}

impl OverrideManager {
    pub fn new(town_root: impl Into<PathBuf>, builtins: BuiltinSet) -> Self {
        let town_root = town_root.into();
        let rigs = RigRegistry::load(&town_root);
        Self {
            town_root,
            rigs,
            builtins,
        }
    }

    pub fn town_root(&self) -> &Path {
        &self.town_root
    }

    pub fn builtins(&self) -> &BuiltinSet {
        &self.builtins
    }

    pub fn rigs(&self) -> &RigRegistry {
        &self.rigs
    }

    pub(crate) fn override_file(dir: &Path, name: &str) -> PathBuf {
        formulas_dir(dir).join(format!("{name}{FORMULA_SUFFIX}"))
    }

    /// Copy built-in `name` into the target's formulas directory.
    pub fn modify(&self, name: &str, target: &ModifyTarget) -> Result<PathBuf> {
        if !self.builtins.exists(name) {
            return Err(OverrideError::NotBuiltin(name.to_string()));
        }
        let root = match target {
            ModifyTarget::Town => self.town_root.clone(),
            ModifyTarget::Rig(rig) => self.town_root.join(rig),
            ModifyTarget::TownPath(path) => path.clone(),
        };
        let dest = Self::override_file(&root, name);
        if dest.exists() {
            return Err(OverrideError::AlreadyExists {
                name: name.to_string(),
                path: dest,
            });
        }

        let path = self.builtins.copy_to(name, &formulas_dir(&root))?;
        info!(name, path = %path.display(), "created formula override");
        Ok(path)
    }

    /// Delete the override at `target`.
    ///
    /// Resetting the town override while some rig also overrides `name` is
    /// refused; the rig must be named explicitly.
    pub fn reset(&self, name: &str, target: &ResetTarget) -> Result<ResetOutcome> {
        let path = match target {
            ResetTarget::Rig(rig) => Self::override_file(&self.town_root.join(rig), name),
            ResetTarget::Town => {
                let town_file = Self::override_file(&self.town_root, name);
                if town_file.exists() {
                    let rig_with_override = self
                        .rigs
                        .rig_dirs()
                        .find(|(_, dir)| Self::override_file(dir, name).exists());
                    if let Some((rig, _)) = rig_with_override {
                        return Err(OverrideError::Ambiguous {
                            name: name.to_string(),
                            rig: rig.to_string(),
                        });
                    }
                }
                town_file
            }
        };

        let level = target.level_label();
        let builtin_restored = self.builtins.exists(name);
        if !path.exists() {
            return Err(if builtin_restored {
                OverrideError::NoOverrideAt {
                    name: name.to_string(),
                    level,
                }
            } else {
                OverrideError::NoCustomAt {
                    name: name.to_string(),
                    level,
                }
            });
        }

        std::fs::remove_file(&path)?;
        debug!(name, path = %path.display(), "removed override");
        Ok(ResetOutcome {
            path,
            level,
            builtin_restored,
        })
    }
}

/// Printed after a successful `modify`.
pub const MODIFICATION_GUIDE: &str = "\
== Formula Modification Guide ==

Edit the copied file in place. Keep the three header lines at the top:
they record which built-in version the copy was taken from, so
'gt formula update' can merge later changes.

Top-level keys:
  formula = \"name\"           # must match the file name
  type = \"convoy\"            # task | workflow | convoy | patrol | aspect | expansion
  description = \"\"\"...\"\"\"

Convoy sections:
  [[legs]]                   # one parallel unit; needs an id
  [synthesis]                # runs after every leg
  [prompts] base = \"\"\"...\"\"\" # rendered into each leg's description
  [output]                   # directory, leg_pattern, synthesis

Resolution order:
  1. <rig>/.beads/formulas/       (rig override)
  2. <town>/.beads/formulas/      (town override)
  3. built-in                     (compiled into gt)

Commands:
  gt formula diff <name>     # compare with the built-in
  gt formula reset <name>    # delete the override
  gt formula update <name>   # merge a newer built-in into the override
";

#[cfg(test)]
mod tests {
    use super::*;
    use gt_formula::builtin::extract_base_hash;
    use tempfile::TempDir;

    fn town(rigs: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        let entries: Vec<String> = rigs.iter().map(|r| format!("\"{r}\": {{}}")).collect();
        std::fs::create_dir_all(dir.path().join("mayor")).unwrap();
        std::fs::write(
            dir.path().join("mayor").join("rigs.json"),
            format!("{{\"rigs\": {{{}}}}}", entries.join(", ")),
        )
        .unwrap();
        for r in rigs {
            std::fs::create_dir_all(dir.path().join(r)).unwrap();
        }
        dir
    }

    fn builtins() -> BuiltinSet {
        BuiltinSet::from_entries([("mol-polecat-work".to_string(), "formula = \"mol-polecat-work\"\n".to_string())])
    }

    #[test]
    fn modify_copies_with_header_and_refuses_second_copy() {
        let t = town(&[]);
        let mgr = OverrideManager::new(t.path(), builtins());

        let path = mgr.modify("mol-polecat-work", &ModifyTarget::Town).unwrap();
        assert_eq!(path, t.path().join(".beads/formulas/mol-polecat-work.formula.toml"));
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(extract_base_hash(&text), Some(mgr.builtins().hash("mol-polecat-work").unwrap()));

        let err = mgr.modify("mol-polecat-work", &ModifyTarget::Town).unwrap_err();
        assert!(matches!(err, OverrideError::AlreadyExists { .. }));
        assert!(err.to_string().contains("gt formula reset mol-polecat-work"));
    }

    #[test]
    fn modify_targets() {
        let t = town(&["gastown"]);
        let other = TempDir::new().unwrap();
        let mgr = OverrideManager::new(t.path(), builtins());

        let rig = mgr.modify("mol-polecat-work", &ModifyTarget::Rig("gastown".into())).unwrap();
        assert!(rig.starts_with(t.path().join("gastown/.beads/formulas")));

        let explicit = mgr
            .modify("mol-polecat-work", &ModifyTarget::TownPath(other.path().to_path_buf()))
            .unwrap();
        assert!(explicit.starts_with(other.path()));
    }

    #[test]
    fn modify_unknown_is_not_builtin() {
        let t = town(&[]);
        let mgr = OverrideManager::new(t.path(), builtins());
        assert!(matches!(
            mgr.modify("nope", &ModifyTarget::Town),
            Err(OverrideError::NotBuiltin(n)) if n == "nope"
        ));
    }

    #[test]
    fn reset_town_is_ambiguous_when_rig_also_overrides() {
        let t = town(&["gastown"]);
        let mgr = OverrideManager::new(t.path(), builtins());
        mgr.modify("mol-polecat-work", &ModifyTarget::Town).unwrap();
        let rig_copy = mgr.modify("mol-polecat-work", &ModifyTarget::Rig("gastown".into())).unwrap();

        let err = mgr.reset("mol-polecat-work", &ResetTarget::Town).unwrap_err();
        assert!(matches!(&err, OverrideError::Ambiguous { rig, .. } if rig == "gastown"));
        assert!(err.to_string().contains("Use --rig=gastown"));

        let out = mgr.reset("mol-polecat-work", &ResetTarget::Rig("gastown".into())).unwrap();
        assert_eq!(out.path, rig_copy);
        assert_eq!(out.level, "rig 'gastown'");
        assert!(out.builtin_restored);

        let out = mgr.reset("mol-polecat-work", &ResetTarget::Town).unwrap();
        assert_eq!(out.level, "town");
    }

    #[test]
    fn reset_missing_override() {
        let t = town(&[]);
        let mgr = OverrideManager::new(t.path(), builtins());

        let err = mgr.reset("mol-polecat-work", &ResetTarget::Town).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No override found for 'mol-polecat-work' at town level. Already using embedded version."
        );
        let err = mgr.reset("custom", &ResetTarget::Town).unwrap_err();
        assert_eq!(err.to_string(), "No override found for 'custom' at town level.");
    }

    #[test]
    fn reset_custom_formula_reports_it_is_gone() {
        let t = town(&[]);
        let dir = formulas_dir(t.path());
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("mine.formula.toml"), "formula = \"mine\"\n").unwrap();
        let mgr = OverrideManager::new(t.path(), builtins());

        let out = mgr.reset("mine", &ResetTarget::Town).unwrap();
        assert!(!out.builtin_restored);
        assert!(!out.path.exists());
    }
}
