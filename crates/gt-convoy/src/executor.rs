//! Convoy execution.
//!
//! One run walks these states, stopping early only when the convoy record
//! itself cannot be created:
//!
//! `Resolved → ConvoyCreated → LegsCreated → SynthesisCreated? → Dispatching → Reported`
//!
//! Every other failure is isolated to the leg or link it concerns and
//! surfaces as a warning.

use std::io::Write;
use std::path::PathBuf;

use gt_formula::idgen::short_id;
use gt_formula::template::render;
use gt_formula::{FormulaDocument, Leg};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::collab::{Dispatcher, NewRecord, PrSource, RecordKind, Relation, WorkStore};
use crate::graph::{ConvoyGraph, NodeRole};
use crate::plan::{
    CONVOY_PREFIX, ConvoyPlan, DEFAULT_SYNTHESIS_DESCRIPTION, LEG_PREFIX, RunContext, RunOptions,
    SYNTHESIS_PREFIX, convoy_description, convoy_title, ensure_output_dir, plan, write_plan,
};
use crate::{ConvoyError, Result};

/// Result of a dispatched convoy.
#[derive(Debug, Clone, Serialize)]
pub struct ConvoyReport {
    pub convoy_id: String,
    pub review_id: String,
    pub dispatched: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesis_id: Option<String>,
    pub graph: ConvoyGraph,
}

/// What `run` did.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    DryRun(ConvoyPlan),
    /// The formula is not a convoy; only guidance was printed.
    NotExecutable { formula_type: String },
    Dispatched(ConvoyReport),
}

pub struct ConvoyExecutor<'a> {
    store: &'a mut dyn WorkStore,
    dispatcher: &'a mut dyn Dispatcher,
    prs: &'a dyn PrSource,
    /// Relative output directories are created under this directory.
    workdir: PathBuf,
}

impl<'a> ConvoyExecutor<'a> {
    pub fn new(
        store: &'a mut dyn WorkStore,
        dispatcher: &'a mut dyn Dispatcher,
        prs: &'a dyn PrSource,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            prs,
            workdir: workdir.into(),
        }
    }

    /// Run `doc` as formula `name`, writing progress to `out`.
    pub fn run(
        &mut self,
        doc: &FormulaDocument,
        name: &str,
        opts: &RunOptions,
        out: &mut dyn Write,
    ) -> Result<RunOutcome> {
        if opts.dry_run {
            let plan = plan(doc, name, opts, self.prs);
            write_plan(&plan, out)?;
            return Ok(RunOutcome::DryRun(plan));
        }

        if !doc.is_convoy() {
            write_manual_steps(doc, name, &opts.rig, out)?;
            return Ok(RunOutcome::NotExecutable {
                formula_type: doc.type_name().to_string(),
            });
        }

        self.execute(doc, name, opts, out).map(RunOutcome::Dispatched)
    }

    fn execute(
        &mut self,
        doc: &FormulaDocument,
        name: &str,
        opts: &RunOptions,
        out: &mut dyn Write,
    ) -> Result<ConvoyReport> {
        writeln!(out, "🚚 Executing convoy formula: {name}\n")?;
        let mut graph = ConvoyGraph::default();

        // Convoy record. Failure here aborts the run.
        let convoy_id = format!("{CONVOY_PREFIX}{}", short_id());
        self.store
            .create(&NewRecord {
                kind: RecordKind::Convoy,
                id: convoy_id.clone(),
                title: convoy_title(name, &doc.description),
                description: convoy_description(name, doc.legs.len(), opts),
            })
            .map_err(ConvoyError::ConvoyCreation)?;
        graph.add_node(&convoy_id, NodeRole::Convoy);
        info!(convoy = %convoy_id, formula = name, "created convoy");
        writeln!(out, "✓ Created convoy: {convoy_id}")?;

        let run = RunContext::new(doc, name, short_id(), opts.pr, self.prs);
        if let Some(dir) = &run.output_dir {
            match ensure_output_dir(&self.workdir, dir) {
                Ok(()) => writeln!(out, "  📁 Output directory: {}", dir.display())?,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "cannot create output directory");
                    writeln!(out, "Warning: Failed to create output directory {}: {e}", dir.display())?;
                }
            }
        }

        // Legs.
        let mut created: Vec<(&Leg, String)> = Vec::with_capacity(doc.legs.len());
        for leg in &doc.legs {
            let record_id = format!("{LEG_PREFIX}{}", short_id());
            let description = leg_description(doc, leg, &run, out)?;
            let record = NewRecord {
                kind: RecordKind::Task,
                id: record_id.clone(),
                title: leg.title.clone(),
                description,
            };
            if let Err(e) = self.store.create(&record) {
                warn!(leg = %leg.id, error = %e, "leg record not created");
                writeln!(out, "Warning: Failed to create leg record for {}: {e}", leg.id)?;
                continue;
            }
            graph.add_node(&record_id, NodeRole::Leg { leg_id: leg.id.clone() });

            match self.store.link(&convoy_id, &record_id, Relation::Tracks) {
                Ok(()) => graph.add_edge(&convoy_id, &record_id, Relation::Tracks),
                Err(e) => {
                    warn!(leg = %leg.id, error = %e, "leg not tracked");
                    writeln!(out, "Warning: Failed to track leg {}: {e}", leg.id)?;
                }
            }
            writeln!(out, "  ○ Created leg: {} ({record_id})", leg.id)?;
            created.push((leg, record_id));
        }

        // Synthesis waits on every leg that exists.
        let synthesis_id = match &doc.synthesis {
            Some(syn) => {
                let record_id = format!("{SYNTHESIS_PREFIX}{}", short_id());
                let description = if syn.description.is_empty() {
                    DEFAULT_SYNTHESIS_DESCRIPTION.to_string()
                } else {
                    syn.description.clone()
                };
                let record = NewRecord {
                    kind: RecordKind::Task,
                    id: record_id.clone(),
                    title: syn.title.clone(),
                    description,
                };
                match self.store.create(&record) {
                    Ok(()) => {
                        graph.add_node(&record_id, NodeRole::Synthesis);
                        self.link_synthesis(&convoy_id, &record_id, &created, &mut graph, out)?;
                        writeln!(out, "  ★ Created synthesis: {record_id}")?;
                        Some(record_id)
                    }
                    Err(e) => {
                        warn!(error = %e, "synthesis record not created");
                        writeln!(out, "Warning: Failed to create synthesis record: {e}")?;
                        None
                    }
                }
            }
            None => None,
        };

        // Dispatch.
        writeln!(out, "\n→ Dispatching legs to {}...\n", opts.rig)?;
        let mut dispatched = 0;
        for (leg, record_id) in &created {
            match self.dispatcher.dispatch(record_id, &opts.rig, &leg.title, &leg.description) {
                Ok(()) => {
                    debug!(leg = %leg.id, record = %record_id, "dispatched");
                    dispatched += 1;
                }
                Err(e) => {
                    warn!(leg = %leg.id, error = %e, "dispatch failed");
                    writeln!(out, "Warning: Failed to sling leg {}: {e}", leg.id)?;
                    if let Err(ce) = self.store.comment(record_id, &format!("Failed to sling: {e}")) {
                        debug!(record = %record_id, error = %ce, "could not record dispatch failure");
                    }
                }
            }
        }

        let report = ConvoyReport {
            convoy_id,
            review_id: run.review_id,
            dispatched,
            total: doc.legs.len(),
            synthesis_id,
            graph,
        };
        write_report(&report, out)?;
        Ok(report)
    }

    fn link_synthesis(
        &mut self,
        convoy_id: &str,
        synthesis_id: &str,
        legs: &[(&Leg, String)],
        graph: &mut ConvoyGraph,
        out: &mut dyn Write,
    ) -> Result<()> {
        match self.store.link(convoy_id, synthesis_id, Relation::Tracks) {
            Ok(()) => graph.add_edge(convoy_id, synthesis_id, Relation::Tracks),
            Err(e) => {
                warn!(error = %e, "synthesis not tracked");
                writeln!(out, "Warning: Failed to track synthesis: {e}")?;
            }
        }
        for (leg, record_id) in legs {
            match self.store.link(synthesis_id, record_id, Relation::Blocks) {
                Ok(()) => graph.add_edge(synthesis_id, record_id, Relation::Blocks),
                Err(e) => {
                    warn!(leg = %leg.id, error = %e, "synthesis dependency not added");
                    writeln!(out, "Warning: Failed to make synthesis wait on {}: {e}", leg.id)?;
                }
            }
        }
        Ok(())
    }
}

/// The leg's description, with the rendered base prompt appended when the
/// formula has one. A prompt that fails to render is appended raw.
fn leg_description(
    doc: &FormulaDocument,
    leg: &Leg,
    run: &RunContext,
    out: &mut dyn Write,
) -> std::io::Result<String> {
    let Some(base) = doc.base_prompt() else {
        return Ok(leg.description.clone());
    };
    let prompt = match render(base, &run.leg_context(doc, leg)) {
        Ok(text) => text,
        Err(e) => {
            warn!(leg = %leg.id, error = %e, "prompt render failed, using raw prompt");
            writeln!(out, "Warning: Failed to render template for {}: {e}", leg.id)?;
            base.to_string()
        }
    };
    Ok(format!("{}\n\n---\nBase Prompt:\n{prompt}", leg.description))
}

fn write_manual_steps(doc: &FormulaDocument, name: &str, rig: &str, out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "Note: Formula type '{}' not yet supported for execution.", doc.type_name())?;
    writeln!(out, "Currently only 'convoy' formulas can be run.")?;
    writeln!(out, "\nTo run '{name}' manually:")?;
    writeln!(out, "  1. View formula:   gt formula show {name}")?;
    writeln!(out, "  2. Cook to proto:  bd cook {name}")?;
    writeln!(out, "  3. Pour molecule:  bd pour {name}")?;
    writeln!(out, "  4. Sling to rig:   gt sling <mol-id> {rig}")
}

fn write_report(report: &ConvoyReport, out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "\n✓ Convoy dispatched!")?;
    writeln!(out, "  Convoy:  {}", report.convoy_id)?;
    if report.dispatched == report.total {
        writeln!(out, "  Legs:    {} dispatched", report.dispatched)?;
    } else {
        writeln!(out, "  Legs:    {} dispatched (of {})", report.dispatched, report.total)?;
    }
    if let Some(syn) = &report.synthesis_id {
        writeln!(out, "  Synthesis: {syn} (blocked until legs complete)")?;
    }
    writeln!(out, "\n  Track progress: gt convoy status {}", report.convoy_id)
}
