//! `gt formula diff`: the override map and the per-formula comparison.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use gt_formula::builtin::{extract_base_hash, truncate_hash};
use gt_formula::diff::{COLUMN_WIDTH, DiffKind, LineDiff, MAX_SHOWN, line_differences, truncate_line};
use serde::Serialize;

use crate::manager::OverrideManager;
use crate::scan::{Level, Override, OverrideChain};
use crate::{OverrideError, Result};

const HEAVY_RULE: &str = "════════════════════";
const RULE: &str = "──────────────────────────────────────────────────────────────────────────────";

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Which built-ins are overridden, and which local formulas are custom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverrideSummary {
    pub builtin_count: usize,
    /// Chains of built-ins with at least one override, by name.
    pub overridden: Vec<OverrideChain>,
    pub custom: Vec<Override>,
}

impl OverrideSummary {
    pub fn using_builtin(&self) -> usize {
        self.builtin_count - self.overridden.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overridden.is_empty() && self.custom.is_empty()
    }
}

impl OverrideManager {
    pub fn summary(&self) -> OverrideSummary {
        let overridden = self
            .builtins
            .names()
            .into_iter()
            .map(|name| self.chain(name))
            .filter(OverrideChain::has_overrides)
            .collect();
        OverrideSummary {
            builtin_count: self.builtins.len(),
            overridden,
            custom: self.custom_formulas(),
        }
    }
}

fn custom_location(o: &Override) -> String {
    match (&o.level, &o.rig) {
        (Level::Rig, Some(rig)) => format!("rig ({rig})"),
        _ => o.level.to_string(),
    }
}

pub fn write_summary(summary: &OverrideSummary, out: &mut dyn Write) -> io::Result<()> {
    if summary.is_empty() {
        writeln!(out, "No formula overrides found.")?;
        writeln!(
            out,
            "All formulas using embedded defaults ({} formulas available).\n",
            summary.builtin_count
        )?;
        writeln!(out, "Run 'gt formula modify <name>' to customize a formula.")?;
        return Ok(());
    }

    writeln!(out, "Formula Override Map")?;
    writeln!(out, "{HEAVY_RULE}\n")?;
    writeln!(out, "                            RESOLUTION ORDER")?;
    writeln!(out, "      ┌─────────────────────────────────────────────────────┐")?;
    writeln!(out, "      │  Rig Override  →  Town Override  →  Embedded        │")?;
    writeln!(out, "      └─────────────────────────────────────────────────────┘\n")?;

    for chain in &summary.overridden {
        writeln!(out, "{}", chain.name)?;
        match (&chain.town, chain.rigs.first()) {
            (Some(town), Some(rig)) => {
                writeln!(out, "    embedded ─┬─► town override")?;
                writeln!(out, "              │   {}", town.path.display())?;
                writeln!(out, "              │")?;
                writeln!(out, "              └─► {} ──────────── ✓ active", rig.label())?;
                writeln!(out, "                  {}", rig.path.display())?;
            }
            (None, Some(rig)) => {
                writeln!(out, "    embedded ───► {} ──────────── ✓ active", rig.label())?;
                writeln!(out, "                  {}", rig.path.display())?;
            }
            (Some(town), None) => {
                writeln!(out, "    embedded ───► town override ─────────────────── ✓ active")?;
                writeln!(out, "                  {}", town.path.display())?;
            }
            (None, None) => {}
        }
        writeln!(out)?;
    }

    for custom in &summary.custom {
        writeln!(out, "{}", custom.name)?;
        writeln!(
            out,
            "    (not in embedded) ─► {} ──────────── custom",
            custom_location(custom)
        )?;
        writeln!(out, "                         {}", custom.path.display())?;
        writeln!(out)?;
    }

    writeln!(out, "{RULE}")?;
    writeln!(
        out,
        "Summary: {} using embedded, {} with override, {} custom",
        summary.using_builtin(),
        summary.overridden.len(),
        summary.custom.len()
    )?;
    writeln!(out, "Run 'gt formula diff <name>' for detailed diff")
}

// ---------------------------------------------------------------------------
// Detail
// ---------------------------------------------------------------------------

/// The override was copied from an older built-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleBase {
    pub base: String,
    pub current: String,
}

/// One pairwise comparison between adjacent tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffSection {
    pub title: String,
    pub left_label: String,
    pub right_label: String,
    pub differences: Vec<LineDiff>,
}

/// A formula that exists only locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomFile {
    pub path: PathBuf,
    pub lines: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverrideDetail {
    pub chain: OverrideChain,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_available: Option<StaleBase>,
    pub sections: Vec<DiffSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomFile>,
}

fn section(title: &str, left_label: &str, left: &str, right_label: &str, right: &str) -> DiffSection {
    DiffSection {
        title: title.to_string(),
        left_label: left_label.to_string(),
        right_label: right_label.to_string(),
        differences: line_differences(left, right),
    }
}

/// Override text with invalid UTF-8 replaced, so one damaged file still
/// diffs against the others.
fn read_lossy(path: &Path) -> std::io::Result<String> {
    std::fs::read(path).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

impl OverrideManager {
    /// Compare `name` across every tier that has it.
    pub fn detail(&self, name: &str) -> Result<OverrideDetail> {
        let chain = self.chain(name);
        if !chain.builtin && !chain.has_overrides() {
            return Err(OverrideError::NotFound(name.to_string()));
        }

        let builtin = if chain.builtin {
            Some(self.builtins.get(name)?)
        } else {
            None
        };
        let town = chain.town.as_ref().map(|o| read_lossy(&o.path)).transpose()?;
        let rig = chain.rigs.first().map(|o| read_lossy(&o.path)).transpose()?;

        let active_text = match chain.active().map(|o| o.level) {
            Some(Level::Rig) => rig.as_deref(),
            Some(Level::Town) => town.as_deref(),
            None => None,
        };
        let update_available = match (chain.builtin, active_text.and_then(extract_base_hash)) {
            (true, Some(base)) => {
                let current = self.builtins.hash(name)?;
                (base != current).then_some(StaleBase { base, current })
            }
            _ => None,
        };

        let mut sections = Vec::new();
        let mut custom = None;
        if let (Some(b), Some(t)) = (builtin, &town) {
            sections.push(section("Embedded → Town", "embedded", b, "town override", t));
        }
        match (builtin, &town, &rig) {
            (_, Some(t), Some(r)) => {
                sections.push(section("Town → Rig (active)", "town override", t, "rig override", r));
            }
            (Some(b), None, Some(r)) => {
                sections.push(section("Embedded → Rig (active)", "embedded", b, "rig override", r));
            }
            (None, _, _) => {
                if let Some(first) = chain.town.as_ref().or(chain.rigs.first()) {
                    let text = town.as_deref().or(rig.as_deref()).unwrap_or_default();
                    custom = Some(CustomFile {
                        path: first.path.clone(),
                        lines: text.matches('\n').count(),
                    });
                }
            }
            _ => {}
        }

        Ok(OverrideDetail {
            chain,
            update_available,
            sections,
            custom,
        })
    }
}

fn write_differences(section: &DiffSection, out: &mut dyn Write) -> io::Result<()> {
    if section.differences.is_empty() {
        return writeln!(out, "  (no differences)");
    }

    let side = COLUMN_WIDTH + 2;
    writeln!(out, "{RULE}")?;
    writeln!(out, "{:<side$} │ {}", section.left_label, section.right_label)?;
    writeln!(out, "{RULE}")?;
    for (shown, d) in section.differences.iter().enumerate() {
        if shown >= MAX_SHOWN {
            writeln!(out, "  ... ({} more differences)", section.differences.len() - shown)?;
            break;
        }
        let left = truncate_line(&d.left, COLUMN_WIDTH);
        let right = truncate_line(&d.right, COLUMN_WIDTH);
        match d.kind {
            DiffKind::Changed => writeln!(out, "{left:<side$} │ {right}")?,
            DiffKind::Removed => writeln!(out, "{left:<side$} │ (removed)")?,
            DiffKind::Added => writeln!(out, "{:<side$} │ {right}", "(added)")?,
        }
    }
    writeln!(out, "{RULE}")
}

pub fn write_detail(detail: &OverrideDetail, out: &mut dyn Write) -> io::Result<()> {
    let chain = &detail.chain;
    writeln!(out, "{}", chain.name)?;
    if chain.builtin {
        writeln!(out, "    ├─ embedded: (compiled in gt)")?;
    }
    if let Some(town) = &chain.town {
        writeln!(out, "    ├─ town:     {}", town.path.display())?;
    }
    for shadowed in chain.rigs.iter().skip(1) {
        writeln!(out, "    ├─ rig:      {} (shadowed)", shadowed.path.display())?;
    }
    if let Some(rig) = chain.rigs.first() {
        writeln!(out, "    └─ rig:      {}  ◄ active", rig.path.display())?;
    } else if chain.town.is_some() {
        writeln!(out, "    (town is active)")?;
    } else if chain.builtin {
        writeln!(out, "    (embedded is active - no overrides)")?;
    }
    writeln!(out)?;

    if !chain.has_overrides() {
        writeln!(out, "No overrides found for this formula.")?;
        return writeln!(out, "Use 'gt formula modify {}' to create an override.", chain.name);
    }

    if let Some(stale) = &detail.update_available {
        writeln!(
            out,
            "⚠ Update available: Embedded version has been updated since you created this override."
        )?;
        writeln!(out, "  Base:    sha256:{}", truncate_hash(&stale.base))?;
        writeln!(out, "  Current: sha256:{}", truncate_hash(&stale.current))?;
        writeln!(out, "  Run 'gt formula update {}' to merge changes.\n", chain.name)?;
    }

    for (i, section) in detail.sections.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "[{}]", section.title)?;
        write_differences(section, out)?;
    }

    if let Some(custom) = &detail.custom {
        writeln!(out, "Custom formula (not in embedded).")?;
        writeln!(out, "  {} lines at {}", custom.lines, custom.path.display())?;
    }
    Ok(())
}
