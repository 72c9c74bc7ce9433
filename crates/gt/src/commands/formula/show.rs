//! `gt formula show <name>`.

use anyhow::Result;
use gt_formula::{FormulaDocument, FormulaLocation};
use gt_ui::styles::{BULLET, render_accent, render_bold, render_heading, render_muted};
use serde::Serialize;

use crate::cli::FormulaShowArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

#[derive(Serialize)]
struct ShowView<'a> {
    #[serde(flatten)]
    doc: &'a FormulaDocument,
    source: String,
}

fn source_label(location: &FormulaLocation) -> String {
    if location.is_builtin() {
        "embedded".to_string()
    } else {
        location.path.display().to_string()
    }
}

pub fn run(ctx: &RuntimeContext, args: &FormulaShowArgs) -> Result<()> {
    let (location, mut doc) = ctx.load_formula(&args.name)?;
    if doc.name.is_empty() {
        doc.name = args.name.clone();
    }

    if ctx.json {
        output_json(&ShowView {
            doc: &doc,
            source: source_label(&location),
        });
        return Ok(());
    }

    println!("{}", render_bold(&doc.name));
    println!("  Source: {}", render_muted(&source_label(&location)));
    if !doc.type_name().is_empty() {
        println!("  Type: {}", doc.type_name());
    }
    if !doc.description.is_empty() {
        println!("\n{}", doc.description.trim_end());
    }

    if !doc.legs.is_empty() {
        println!("\n{}", render_heading("Legs:"));
        for leg in &doc.legs {
            println!("  {BULLET} {}: {}", render_accent(&leg.id), leg.title);
            if !leg.focus.is_empty() {
                println!("    Focus: {}", leg.focus);
            }
        }
    }

    if let Some(synthesis) = &doc.synthesis {
        println!("\n{}", render_heading("Synthesis:"));
        println!("  {}", synthesis.title);
    }

    Ok(())
}
