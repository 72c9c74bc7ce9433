//! `gt formula doctor` -- built-in availability and legacy provisioned copies.

use anyhow::Result;
use gt_override::doctor::{CheckResult, CheckStatus, remove_legacy};
use gt_ui::styles::{render_muted, render_pass, render_warn};
use serde_json::json;

use crate::cli::FormulaDoctorArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

fn print_check(check: &CheckResult) {
    let tag = match check.status {
        CheckStatus::Ok => render_pass(check.status.tag()),
        CheckStatus::Warning => render_warn(check.status.tag()),
    };
    println!("{tag} {}: {}", check.name, check.message);
    for path in &check.details {
        println!("    {}", render_muted(&path.display().to_string()));
    }
}

pub fn run(ctx: &RuntimeContext, args: &FormulaDoctorArgs) -> Result<()> {
    let mgr = ctx.override_manager()?;
    let checks = [mgr.check_builtins(), mgr.check_legacy()];

    let removed = if args.fix {
        let legacy = &checks[1].details;
        if legacy.is_empty() {
            Vec::new()
        } else {
            remove_legacy(legacy)?
        }
    } else {
        Vec::new()
    };

    if ctx.json {
        output_json(&json!({ "checks": checks, "removed": removed }));
        return Ok(());
    }

    for check in &checks {
        print_check(check);
    }

    if !removed.is_empty() {
        println!("\nRemoved {} legacy provisioned formulas:", removed.len());
        for path in &removed {
            println!("  - {}", path.display());
        }
    } else if !args.fix && checks[1].status == CheckStatus::Warning {
        println!("\nRun 'gt formula doctor --fix' to remove legacy copies.");
    }
    Ok(())
}
