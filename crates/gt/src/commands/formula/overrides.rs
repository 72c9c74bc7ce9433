//! `gt formula modify|diff|reset|update` -- local overrides of built-ins.

use std::io::Write;

use anyhow::{Context, Result};
use gt_config::Settings;
use gt_override::agent::{AGENT_ENV, detect_agent, find_on_path};
use gt_override::manager::MODIFICATION_GUIDE;
use gt_override::report::{write_detail, write_summary};
use gt_override::update::{merge_update, write_update_status};
use gt_override::{ModifyTarget, OverrideError, ResetTarget, UpdateCheck, UpdateOptions, UpdateOutcome};
use serde_json::json;

use crate::cli::{FormulaDiffArgs, FormulaModifyArgs, FormulaResetArgs, FormulaUpdateArgs};
use crate::context::RuntimeContext;
use crate::output::{output_json, progress_writer};

// ---------------------------------------------------------------------------
// modify
// ---------------------------------------------------------------------------

pub fn modify(ctx: &RuntimeContext, args: &FormulaModifyArgs) -> Result<()> {
    let (mgr, target) = match (&args.town, &args.rig) {
        (Some(path), _) => (ctx.override_manager_at(path), ModifyTarget::TownPath(path.clone())),
        (None, Some(rig)) => (ctx.override_manager()?, ModifyTarget::Rig(rig.clone())),
        (None, None) => (ctx.override_manager()?, ModifyTarget::Town),
    };

    let path = match mgr.modify(&args.name, &target) {
        Ok(path) => path,
        Err(e @ OverrideError::NotBuiltin(_)) => {
            return Err(anyhow::anyhow!("{e}\n\nUse 'gt formula list' to see available formulas."));
        }
        Err(e) => return Err(e.into()),
    };

    if ctx.json {
        output_json(&json!({ "name": args.name, "path": path }));
        return Ok(());
    }
    println!("Formula copied to: {}\n", path.display());
    print!("{MODIFICATION_GUIDE}");
    Ok(())
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

pub fn diff(ctx: &RuntimeContext, args: &FormulaDiffArgs) -> Result<()> {
    let mgr = ctx.override_manager()?;
    let mut out = progress_writer(ctx);

    match args.name.as_deref() {
        None => {
            let summary = mgr.summary();
            if ctx.json {
                output_json(&summary);
            } else {
                write_summary(&summary, &mut out)?;
            }
        }
        Some(name) => {
            let detail = mgr.detail(name)?;
            if ctx.json {
                output_json(&detail);
            } else {
                write_detail(&detail, &mut out)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// reset
// ---------------------------------------------------------------------------

pub fn reset(ctx: &RuntimeContext, args: &FormulaResetArgs) -> Result<()> {
    let mgr = ctx.override_manager()?;
    let target = match &args.rig {
        Some(rig) => ResetTarget::Rig(rig.clone()),
        None => ResetTarget::Town,
    };
    let outcome = mgr.reset(&args.name, &target)?;

    if ctx.json {
        output_json(&json!({
            "name": args.name,
            "path": outcome.path,
            "level": outcome.level,
            "builtin_restored": outcome.builtin_restored,
        }));
        return Ok(());
    }

    println!("Removed override from {} level.", outcome.level);
    if outcome.builtin_restored {
        println!("Now using embedded version of '{}'.", args.name);
    } else {
        println!(
            "Formula '{}' is no longer available (was custom, not in embedded).",
            args.name
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// update
// ---------------------------------------------------------------------------

pub fn update(ctx: &RuntimeContext, args: &FormulaUpdateArgs) -> Result<()> {
    let mgr = ctx.override_manager()?;
    let mut out = progress_writer(ctx);
    writeln!(out, "Checking for updates to {}...\n", args.name)?;

    let pending = match mgr.check_update(&args.name)? {
        UpdateCheck::UpToDate { path } => {
            writeln!(out, "Override is based on the current embedded version. No update needed.")?;
            if ctx.json {
                output_json(&UpdateOutcome::UpToDate { path });
            }
            return Ok(());
        }
        UpdateCheck::Needed(pending) => pending,
    };
    write_update_status(&pending, &mut out)?;

    let settings = Settings::load_town(mgr.town_root()).context("loading settings")?;
    let env_choice = std::env::var(AGENT_ENV).ok();
    let mut agent = detect_agent(
        env_choice.as_deref(),
        settings.default_agent(),
        &|program: &str| find_on_path(program).is_some(),
    )?;

    let outcome = merge_update(&pending, &mut agent, UpdateOptions { apply: args.apply }, &mut out)?;
    out.flush()?;
    if ctx.json {
        output_json(&outcome);
    }
    Ok(())
}
