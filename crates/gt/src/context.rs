//! Runtime context for command execution.
//!
//! [`RuntimeContext`] holds what every handler needs: global flags, the
//! working directory, and the town root if one was discovered.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gt_config::RigRegistry;
use gt_formula::{BuiltinSet, FormulaDocument, FormulaLocation, Resolver, parser};
use gt_override::OverrideManager;
use tracing::debug;

use crate::cli::GlobalArgs;

/// Rig targeted when neither `--rig` nor the working directory names one.
pub const FALLBACK_RIG: &str = "gastown";

#[derive(Debug)]
pub struct RuntimeContext {
    /// Whether to produce JSON output.
    pub json: bool,

    pub verbose: bool,

    /// Suppress non-essential output.
    pub quiet: bool,

    pub cwd: PathBuf,

    /// `None` outside a town; commands that need one fail lazily.
    pub town_root: Option<PathBuf>,
}

impl RuntimeContext {
    pub fn from_global_args(global: &GlobalArgs) -> Result<Self> {
        let cwd = std::env::current_dir().context("reading current directory")?;
        let town_root = gt_config::find_town_root(&cwd);
        Ok(Self {
            json: global.json,
            verbose: global.verbose,
            quiet: global.quiet,
            cwd,
            town_root,
        })
    }

    /// The town root, or an error for commands that cannot work without it.
    pub fn require_town(&self) -> Result<&Path> {
        self.town_root
            .as_deref()
            .ok_or(gt_config::ConfigError::TownNotFound)
            .context("finding town root")
    }

    pub fn resolver(&self) -> Resolver {
        debug!(cwd = %self.cwd.display(), town = ?self.town_root, "formula resolver");
        Resolver::new(&self.cwd, self.town_root.clone(), BuiltinSet::bundled())
    }

    /// Resolve `name` and parse the formula it points at.
    pub fn load_formula(&self, name: &str) -> Result<(FormulaLocation, FormulaDocument)> {
        let resolver = self.resolver();
        let location = resolver.resolve(name).context("finding formula")?;
        let raw = read_formula(&resolver, &location)?;
        Ok((location, parser::parse(&raw)))
    }

    /// Override manager for `town_root`.
    pub fn override_manager_at(&self, town_root: &Path) -> OverrideManager {
        OverrideManager::new(town_root, BuiltinSet::bundled())
    }

    /// Override manager for the discovered town.
    pub fn override_manager(&self) -> Result<OverrideManager> {
        Ok(self.override_manager_at(self.require_town()?))
    }

    /// `--rig`, else the registered rig holding the cwd, else the fallback.
    pub fn target_rig(&self, flag: Option<&str>) -> String {
        if let Some(rig) = flag.filter(|r| !r.is_empty()) {
            return rig.to_string();
        }
        self.town_root
            .as_deref()
            .and_then(|town| RigRegistry::load(town).current_rig(&self.cwd).map(str::to_string))
            .unwrap_or_else(|| FALLBACK_RIG.to_string())
    }
}

/// Formula bytes; built-ins are labelled by name, files by path.
fn read_formula(resolver: &Resolver, location: &FormulaLocation) -> Result<Vec<u8>> {
    resolver
        .read(location)
        .with_context(|| format!("reading {}", location.path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(cwd: &Path, town: Option<&Path>) -> RuntimeContext {
        RuntimeContext {
            json: false,
            verbose: false,
            quiet: false,
            cwd: cwd.to_path_buf(),
            town_root: town.map(Path::to_path_buf),
        }
    }

    #[test]
    fn target_rig_prefers_flag_then_cwd_then_fallback() {
        let t = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(t.path().join("mayor")).unwrap();
        std::fs::write(t.path().join("mayor/rigs.json"), r#"{"rigs": {"beacon": {}}}"#).unwrap();
        let rig_src = t.path().join("beacon/src");
        std::fs::create_dir_all(&rig_src).unwrap();

        let inside = ctx(&rig_src, Some(t.path()));
        assert_eq!(inside.target_rig(Some("other")), "other");
        assert_eq!(inside.target_rig(None), "beacon");

        let outside = ctx(t.path(), Some(t.path()));
        assert_eq!(outside.target_rig(None), FALLBACK_RIG);
        assert_eq!(ctx(t.path(), None).target_rig(None), FALLBACK_RIG);
    }

    #[test]
    fn unreadable_formula_names_the_file() {
        let t = tempfile::tempdir().unwrap();
        let c = ctx(t.path(), None);
        let missing = t.path().join("gone.formula.toml");
        let location = FormulaLocation {
            path: missing.clone(),
            source: gt_formula::FormulaSource::File,
        };
        let err = read_formula(&c.resolver(), &location).unwrap_err();
        assert!(format!("{err:#}").starts_with(&format!("reading {}", missing.display())));
    }

    #[test]
    fn load_formula_parses_builtins() {
        let t = tempfile::tempdir().unwrap();
        let (location, doc) = ctx(t.path(), None).load_formula("code-review").unwrap();
        assert!(location.is_builtin());
        assert!(doc.is_convoy());
    }

    #[test]
    fn require_town_fails_outside_a_town() {
        let t = tempfile::tempdir().unwrap();
        let err = ctx(t.path(), None).require_town().unwrap_err();
        assert!(format!("{err:#}").starts_with("finding town root"));
    }
}
