//! `gt formula create <name>`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use gt_formula::resolve::formulas_dir;
use gt_formula::scaffold::ScaffoldKind;
use gt_formula::types::FORMULA_SUFFIX;
use gt_ui::styles::render_success;
use serde_json::json;

use crate::cli::FormulaCreateArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// The project formulas directory when `cwd` has a `.beads` directory,
/// else the user-level one under `home`.
fn destination_dir(cwd: &Path, home: Option<PathBuf>) -> Result<PathBuf> {
    if cwd.join(".beads").is_dir() {
        return Ok(formulas_dir(cwd));
    }
    let home = home.ok_or_else(|| anyhow!("cannot find home directory"))?;
    Ok(formulas_dir(&home))
}

pub fn run(ctx: &RuntimeContext, args: &FormulaCreateArgs) -> Result<()> {
    let kind: ScaffoldKind = args.formula_type.parse().map_err(|e: String| anyhow!(e))?;

    let dir = destination_dir(&ctx.cwd, gt_config::home_dir())?;
    let path = dir.join(format!("{}{FORMULA_SUFFIX}", args.name));
    if path.exists() {
        bail!("formula already exists: {}", path.display());
    }

    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    std::fs::write(&path, kind.render(&args.name))
        .with_context(|| format!("writing {}", path.display()))?;

    if ctx.json {
        output_json(&json!({
            "name": args.name,
            "type": kind.as_str(),
            "path": path,
        }));
        return Ok(());
    }

    println!("{}", render_success(&format!("Created formula: {}", path.display())));
    println!("\nNext steps:");
    println!("  1. Edit the formula: {}", path.display());
    println!("  2. View it:          gt formula show {}", args.name);
    println!("  3. Run it:           gt formula run {}", args.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_dir_wins_when_beads_exists() {
        let t = tempfile::tempdir().unwrap();
        std::fs::create_dir(t.path().join(".beads")).unwrap();
        let dir = destination_dir(t.path(), None).unwrap();
        assert_eq!(dir, t.path().join(".beads/formulas"));
    }

    #[test]
    fn falls_back_to_home() {
        let t = tempfile::tempdir().unwrap();
        let home = t.path().join("home");
        let dir = destination_dir(&t.path().join("proj"), Some(home.clone())).unwrap();
        assert_eq!(dir, home.join(".beads/formulas"));

        let err = destination_dir(&t.path().join("proj"), None).unwrap_err();
        assert_eq!(err.to_string(), "cannot find home directory");
    }
}
