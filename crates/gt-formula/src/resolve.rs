//! Locate a formula by name across the search tiers.
//!
//! Search order, first match wins:
//! 1. `<cwd>/.beads/formulas/`
//! 2. `<town>/.beads/formulas/` (skipped when no town was discovered)
//! 3. the built-in set
//!
//! Within each directory the extensions in [`FORMULA_EXTENSIONS`] are tried
//! in order.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::builtin::BuiltinSet;
use crate::types::{FORMULA_EXTENSIONS, FormulaError, FormulaLocation, FormulaSource, Result};

/// Directory holding formulas under a project or town root.
pub fn formulas_dir(root: &Path) -> PathBuf {
    root.join(".beads").join("formulas")
}

pub struct Resolver {
    cwd: PathBuf,
    town_root: Option<PathBuf>,
    builtins: BuiltinSet,
}

impl Resolver {
    pub fn new(cwd: impl Into<PathBuf>, town_root: Option<PathBuf>, builtins: BuiltinSet) -> Self {
        Self {
            cwd: cwd.into(),
            town_root,
            builtins,
        }
    }

    pub fn builtins(&self) -> &BuiltinSet {
        &self.builtins
    }

    /// Filesystem tiers that exist in this context, most specific first.
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![formulas_dir(&self.cwd)];
        if let Some(town) = &self.town_root {
            let town_dir = formulas_dir(town);
            if !dirs.contains(&town_dir) {
                dirs.push(town_dir);
            }
        }
        dirs
    }

    pub fn resolve(&self, name: &str) -> Result<FormulaLocation> {
        for dir in self.search_dirs() {
            for ext in FORMULA_EXTENSIONS {
                let candidate = dir.join(format!("{name}{ext}"));
                if candidate.is_file() {
                    debug!(name, path = %candidate.display(), "resolved formula file");
                    return Ok(FormulaLocation {
                        path: candidate,
                        source: FormulaSource::File,
                    });
                }
            }
        }

        if self.builtins.exists(name) {
            debug!(name, "resolved built-in formula");
            return Ok(FormulaLocation {
                path: PathBuf::from(name),
                source: FormulaSource::BuiltIn,
            });
        }

        Err(FormulaError::NotFound(name.to_string()))
    }

    /// Raw bytes behind a resolved location.
    pub fn read(&self, location: &FormulaLocation) -> Result<Vec<u8>> {
        match location.source {
            FormulaSource::BuiltIn => {
                let name = location.path.to_string_lossy();
                Ok(self.builtins.get(&name)?.as_bytes().to_vec())
            }
            FormulaSource::File => Ok(std::fs::read(&location.path)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn builtins() -> BuiltinSet {
        BuiltinSet::from_entries([
            ("shared".to_string(), "formula = \"shared\"\n".to_string()),
            ("only-builtin".to_string(), "formula = \"only-builtin\"\n".to_string()),
        ])
    }

    fn write(dir: &Path, file: &str, body: &str) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join(file);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn project_tier_shadows_builtin() {
        let cwd = TempDir::new().unwrap();
        let path = write(&formulas_dir(cwd.path()), "shared.formula.toml", "local");
        let r = Resolver::new(cwd.path(), None, builtins());

        let loc = r.resolve("shared").unwrap();
        assert_eq!(loc.path, path);
        assert!(!loc.is_builtin());
        assert_eq!(r.read(&loc).unwrap(), b"local");
    }

    #[test]
    fn town_tier_then_builtin() {
        let cwd = TempDir::new().unwrap();
        let town = TempDir::new().unwrap();
        let town_file = write(&formulas_dir(town.path()), "mine.formula.json", "{}");
        let r = Resolver::new(cwd.path(), Some(town.path().to_path_buf()), builtins());

        assert_eq!(r.resolve("mine").unwrap().path, town_file);

        let loc = r.resolve("only-builtin").unwrap();
        assert!(loc.is_builtin());
        assert_eq!(loc.path, PathBuf::from("only-builtin"));
        assert_eq!(r.read(&loc).unwrap(), b"formula = \"only-builtin\"\n");
    }

    #[test]
    fn toml_extension_wins_over_json() {
        let cwd = TempDir::new().unwrap();
        let dir = formulas_dir(cwd.path());
        write(&dir, "x.formula.json", "{}");
        let toml = write(&dir, "x.formula.toml", "");
        let r = Resolver::new(cwd.path(), None, builtins());
        assert_eq!(r.resolve("x").unwrap().path, toml);
    }

    #[test]
    fn missing_everywhere_is_not_found() {
        let cwd = TempDir::new().unwrap();
        let r = Resolver::new(cwd.path(), None, builtins());
        assert!(matches!(r.resolve("ghost"), Err(FormulaError::NotFound(n)) if n == "ghost"));
    }

    #[test]
    fn town_equal_to_cwd_is_searched_once() {
        let cwd = TempDir::new().unwrap();
        let r = Resolver::new(cwd.path(), Some(cwd.path().to_path_buf()), builtins());
        assert_eq!(r.search_dirs().len(), 1);
    }
}
