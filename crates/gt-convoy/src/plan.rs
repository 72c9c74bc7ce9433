//! Per-run values shared by the dry-run listing and real execution:
//! identifiers, template contexts, and output paths.

use std::io::Write;
use std::path::{Path, PathBuf};

use gt_formula::template::render_or_default;
use gt_formula::{FormulaDocument, Leg};
use serde::Serialize;
use serde_json::{Value, json};

use crate::collab::{PrInfo, PrSource};

/// Maximum length of a convoy record title.
pub const MAX_TITLE_LEN: usize = 80;

pub const CONVOY_PREFIX: &str = "hq-cv-";
pub const LEG_PREFIX: &str = "hq-leg-";
pub const SYNTHESIS_PREFIX: &str = "hq-syn-";

/// Description used for a synthesis step that declares none.
pub const DEFAULT_SYNTHESIS_DESCRIPTION: &str = "Synthesize findings from all legs into unified output";

/// Options for `gt formula run`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Pull request under review, if any.
    pub pr: Option<u32>,
    /// Rig the legs are dispatched to.
    pub rig: String,
    pub dry_run: bool,
}

/// `<name>: <description>`, cut to [`MAX_TITLE_LEN`] characters.
pub fn convoy_title(name: &str, description: &str) -> String {
    let title = format!("{name}: {description}");
    if title.chars().count() <= MAX_TITLE_LEN {
        return title;
    }
    let mut cut: String = title.chars().take(MAX_TITLE_LEN - 3).collect();
    cut.push_str("...");
    cut
}

pub fn convoy_description(name: &str, leg_count: usize, opts: &RunOptions) -> String {
    let mut desc = format!("Formula convoy: {name}\n\nLegs: {leg_count}\nRig: {}", opts.rig);
    if let Some(pr) = opts.pr {
        desc.push_str(&format!("\nPR: #{pr}"));
    }
    desc
}

/// Values fixed for one run of one formula.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub formula_name: String,
    pub review_id: String,
    pub pr: Option<u32>,
    pub pr_info: PrInfo,
    /// Rendered output directory; set whenever the formula has an output policy.
    pub output_dir: Option<PathBuf>,
}

impl RunContext {
    pub fn new(doc: &FormulaDocument, formula_name: &str, review_id: String, pr: Option<u32>, prs: &dyn PrSource) -> Self {
        let pr_info = pr.map(|n| prs.fetch(n)).unwrap_or_default();
        let output_dir = doc.output.as_ref().map(|out| {
            let ctx = json!({"review_id": review_id, "formula_name": formula_name});
            PathBuf::from(render_or_default(&out.directory, &ctx, &format!(".reviews/{review_id}")))
        });
        Self {
            formula_name: formula_name.to_string(),
            review_id,
            pr,
            pr_info,
            output_dir,
        }
    }

    pub fn target_description(&self) -> String {
        match self.pr {
            Some(n) => format!("PR #{n}"),
            None => "local files".to_string(),
        }
    }

    /// Template context for one leg, without output locations.
    fn base_leg_context(&self, leg: &Leg) -> Value {
        json!({
            "formula_name": self.formula_name,
            "target_description": self.target_description(),
            "review_id": self.review_id,
            "pr_number": self.pr.unwrap_or(0),
            "pr_title": self.pr_info.title,
            "leg": {
                "id": leg.id,
                "title": leg.title,
                "focus": leg.focus,
                "description": leg.description,
            },
            "changed_files": self.pr_info.changed_files,
            "files": [],
        })
    }

    /// Where a leg writes its findings. `None` without an output policy.
    pub fn leg_output_path(&self, doc: &FormulaDocument, leg: &Leg) -> Option<PathBuf> {
        let (out, dir) = doc.output.as_ref().zip(self.output_dir.as_ref())?;
        let file = render_or_default(
            &out.leg_pattern,
            &self.base_leg_context(leg),
            &format!("{}-findings.md", leg.id),
        );
        Some(dir.join(file))
    }

    pub fn synthesis_output_path(&self, doc: &FormulaDocument) -> Option<PathBuf> {
        let (out, dir) = doc.output.as_ref().zip(self.output_dir.as_ref())?;
        (!out.synthesis.is_empty()).then(|| dir.join(&out.synthesis))
    }

    /// Full template context for rendering a leg's base prompt.
    pub fn leg_context(&self, doc: &FormulaDocument, leg: &Leg) -> Value {
        let mut ctx = self.base_leg_context(leg);
        if let (Some(out), Some(dir), Some(map)) = (&doc.output, &self.output_dir, ctx.as_object_mut()) {
            let path = self.leg_output_path(doc, leg).unwrap_or_else(|| dir.clone());
            map.insert("output_path".into(), json!(path.display().to_string()));
            map.insert(
                "output".into(),
                json!({"directory": dir.display().to_string(), "synthesis": out.synthesis}),
            );
        }
        ctx
    }
}

// ---------------------------------------------------------------------------
// Dry run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedLeg {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedSynthesis {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
}

/// What a run would do, computed without touching the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvoyPlan {
    pub formula: String,
    #[serde(rename = "type")]
    pub formula_type: String,
    pub rig: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr: Option<u32>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pr_title: String,
    pub changed_files: usize,
    pub review_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    pub legs: Vec<PlannedLeg>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<PlannedSynthesis>,
}

/// Compute the dry-run plan. Legs and synthesis are only listed for
/// convoy documents.
pub fn plan(doc: &FormulaDocument, formula_name: &str, opts: &RunOptions, prs: &dyn PrSource) -> ConvoyPlan {
    let run = RunContext::new(doc, formula_name, gt_formula::idgen::short_id(), opts.pr, prs);
    let (legs, synthesis) = if doc.is_convoy() && !doc.legs.is_empty() {
        let legs = doc
            .legs
            .iter()
            .map(|leg| PlannedLeg {
                id: leg.id.clone(),
                title: leg.title.clone(),
                output_path: run.leg_output_path(doc, leg),
            })
            .collect();
        let synthesis = doc.synthesis.as_ref().map(|s| PlannedSynthesis {
            title: s.title.clone(),
            output_path: run.synthesis_output_path(doc),
        });
        (legs, synthesis)
    } else {
        (Vec::new(), None)
    };

    ConvoyPlan {
        formula: formula_name.to_string(),
        formula_type: doc.type_name().to_string(),
        rig: opts.rig.clone(),
        pr: opts.pr,
        pr_title: run.pr_info.title.clone(),
        changed_files: run.pr_info.changed_files.len(),
        review_id: run.review_id.clone(),
        output_dir: if legs.is_empty() { None } else { run.output_dir.clone() },
        legs,
        synthesis,
    }
}

/// Print a plan in the `[dry-run]` layout.
pub fn write_plan(plan: &ConvoyPlan, out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "[dry-run] Would execute formula:")?;
    writeln!(out, "  Formula: {}", plan.formula)?;
    writeln!(out, "  Type:    {}", plan.formula_type)?;
    writeln!(out, "  Rig:     {}", plan.rig)?;
    if let Some(pr) = plan.pr {
        writeln!(out, "  PR:      #{pr}")?;
    }
    if plan.legs.is_empty() {
        return Ok(());
    }

    if !plan.pr_title.is_empty() {
        writeln!(out, "  PR Title: {}", plan.pr_title)?;
    }
    if plan.changed_files > 0 {
        writeln!(out, "  Changed files: {}", plan.changed_files)?;
    }
    if let Some(dir) = &plan.output_dir {
        writeln!(out, "\n  Output directory: {}", dir.display())?;
    }

    writeln!(out, "\n  Legs ({} parallel):", plan.legs.len())?;
    for leg in &plan.legs {
        writeln!(out, "    • {}: {}", leg.id, leg.title)?;
        if let Some(path) = &leg.output_path {
            writeln!(out, "      → {}", path.display())?;
        }
    }
    if let Some(syn) = &plan.synthesis {
        writeln!(out, "\n  Synthesis:")?;
        writeln!(out, "    • {}", syn.title)?;
        if let Some(path) = &syn.output_path {
            writeln!(out, "      → {}", path.display())?;
        }
    }
    Ok(())
}

/// Create the output directory relative to `workdir`.
pub(crate) fn ensure_output_dir(workdir: &Path, dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(workdir.join(dir))
}
