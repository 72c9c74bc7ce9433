//! `gt formula list`.

use anyhow::Result;
use gt_formula::BuiltinSet;
use gt_override::{Level, Override};
use gt_ui::styles::{ICON_ACTIVE, RULE_LIGHT, render_heading, render_muted, render_warn};
use serde::Serialize;

use crate::context::RuntimeContext;
use crate::output::output_json;

#[derive(Debug, Serialize)]
struct BuiltinEntry {
    name: String,
    /// The file that wins over the built-in, if any.
    #[serde(rename = "override", skip_serializing_if = "Option::is_none")]
    active_override: Option<Override>,
}

#[derive(Debug, Serialize)]
struct FormulaListing {
    embedded: Vec<BuiltinEntry>,
    custom: Vec<Override>,
}

fn collect(ctx: &RuntimeContext) -> FormulaListing {
    let Some(town) = ctx.town_root.as_deref() else {
        let builtins = BuiltinSet::bundled();
        return FormulaListing {
            embedded: builtins
                .names()
                .into_iter()
                .map(|name| BuiltinEntry {
                    name: name.to_string(),
                    active_override: None,
                })
                .collect(),
            custom: Vec::new(),
        };
    };

    let mgr = ctx.override_manager_at(town);
    let embedded = mgr
        .builtins()
        .names()
        .into_iter()
        .map(|name| BuiltinEntry {
            name: name.to_string(),
            active_override: mgr.chain(name).active().cloned(),
        })
        .collect();
    FormulaListing {
        embedded,
        custom: mgr.custom_formulas(),
    }
}

pub fn run(ctx: &RuntimeContext) -> Result<()> {
    let listing = collect(ctx);
    if ctx.json {
        output_json(&listing);
        return Ok(());
    }

    println!("{}", render_heading(&format!("Embedded Formulas ({})", listing.embedded.len())));
    println!("{RULE_LIGHT}");
    for entry in &listing.embedded {
        match &entry.active_override {
            Some(o) => println!(
                "  {:<28} {}",
                entry.name,
                render_warn(&format!("{ICON_ACTIVE} {}", o.label()))
            ),
            None => println!("  {}", entry.name),
        }
    }

    if !listing.custom.is_empty() {
        println!();
        println!("{}", render_heading(&format!("Custom Formulas ({})", listing.custom.len())));
        println!("{RULE_LIGHT}");
        for custom in &listing.custom {
            let location = match (&custom.level, &custom.rig) {
                (Level::Rig, Some(rig)) => format!("(rig: {rig})"),
                _ => "(town)".to_string(),
            };
            println!("  {:<28} {}", custom.name, render_muted(&location));
        }
    }

    println!();
    println!("Run 'gt formula diff' to see differences.");
    println!("Run 'gt formula modify <name>' to customize a formula.");
    Ok(())
}
