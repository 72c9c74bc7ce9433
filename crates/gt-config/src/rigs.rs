//! The rig registry, `<town>/mayor/rigs.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::value::RawValue;
use tracing::debug;

#[derive(Deserialize)]
struct RegistryFile {
    #[serde(default)]
    rigs: BTreeMap<String, Box<RawValue>>,
}

/// Registered rigs of one town whose directories exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RigRegistry {
    town_root: PathBuf,
    names: Vec<String>,
}

impl RigRegistry {
    /// Read the registry. A missing or malformed file yields no rigs.
    pub fn load(town_root: &Path) -> Self {
        let path = town_root.join("mayor").join("rigs.json");
        let names = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<RegistryFile>(&text) {
                Ok(file) => file
                    .rigs
                    .into_keys()
                    .filter(|name| !name.is_empty() && town_root.join(name).is_dir())
                    .collect(),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "ignoring malformed rig registry");
                    Vec::new()
                }
            },
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no rig registry");
                Vec::new()
            }
        };
        Self {
            town_root: town_root.to_path_buf(),
            names,
        }
    }

    /// Rig names, sorted.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn rig_dir(&self, name: &str) -> PathBuf {
        self.town_root.join(name)
    }

    /// `(name, directory)` for every rig.
    pub fn rig_dirs(&self) -> impl Iterator<Item = (&str, PathBuf)> + '_ {
        self.names.iter().map(|n| (n.as_str(), self.rig_dir(n)))
    }

    /// The registered rig containing `cwd`, if any.
    pub fn current_rig(&self, cwd: &Path) -> Option<&str> {
        let town = self.town_root.canonicalize().ok()?;
        let cwd = cwd.canonicalize().ok()?;
        let first = cwd.strip_prefix(&town).ok()?.components().next()?;
        let first = first.as_os_str().to_str()?;
        self.names.iter().map(String::as_str).find(|n| *n == first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn town_with(rigs_json: &str, dirs: &[&str]) -> tempfile::TempDir {
        let town = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(town.path().join("mayor")).unwrap();
        std::fs::write(town.path().join("mayor").join("rigs.json"), rigs_json).unwrap();
        for d in dirs {
            std::fs::create_dir_all(town.path().join(d)).unwrap();
        }
        town
    }

    #[test]
    fn only_existing_rig_dirs_are_listed() {
        let town = town_with(
            r#"{"version": 1, "rigs": {"gastown": {"git_url": "x"}, "beads": {}, "ghost": {}}}"#,
            &["gastown", "beads"],
        );
        let reg = RigRegistry::load(town.path());
        assert_eq!(reg.names(), &["beads".to_string(), "gastown".to_string()]);
        assert!(reg.contains("gastown"));
        assert!(!reg.contains("ghost"));
    }

    #[test]
    fn malformed_or_missing_registry_is_empty() {
        let town = town_with("{not json", &[]);
        assert!(RigRegistry::load(town.path()).names().is_empty());

        let empty = tempfile::tempdir().unwrap();
        assert!(RigRegistry::load(empty.path()).names().is_empty());
    }

    #[test]
    fn current_rig_from_nested_cwd() {
        let town = town_with(r#"{"rigs": {"gastown": {}}}"#, &["gastown/src/deep", "loose"]);
        let reg = RigRegistry::load(town.path());
        assert_eq!(reg.current_rig(&town.path().join("gastown/src/deep")), Some("gastown"));
        assert_eq!(reg.current_rig(&town.path().join("loose")), None);
        assert_eq!(reg.current_rig(town.path()), None);
    }
}
