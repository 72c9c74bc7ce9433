//! `gt formula run [name]`.

use anyhow::{Context, Result, bail};
use gt_config::{RigRegistry, Settings};
use gt_convoy::backends::{BdStore, GhPrSource, SlingDispatcher};
use gt_convoy::{ConvoyExecutor, RunOptions};

use crate::cli::FormulaRunArgs;
use crate::context::RuntimeContext;
use crate::output::{output_json, progress_writer};

const NO_DEFAULT_FORMULA: &str = "no formula specified and no default formula configured

To set a default formula, add to your rig's settings/config.json:
  \"workflow\": {
    \"default_formula\": \"<formula-name>\"
  }";

/// The rig's `workflow.default_formula`, if any.
fn default_formula(ctx: &RuntimeContext, rig: &str) -> Result<Option<String>> {
    let Some(town) = ctx.town_root.as_deref() else {
        return Ok(None);
    };
    let rig_dir = RigRegistry::load(town).rig_dir(rig);
    let settings = Settings::load_rig(town, &rig_dir).context("loading settings")?;
    Ok(settings.default_formula().map(str::to_string))
}

pub fn run(ctx: &RuntimeContext, args: &FormulaRunArgs) -> Result<()> {
    let rig = ctx.target_rig(args.rig.as_deref());

    let name = match args.name.as_deref().filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => match default_formula(ctx, &rig)? {
            Some(name) => {
                if !ctx.quiet && !ctx.json {
                    println!("Note: Using default formula: {name}\n");
                }
                name
            }
            None => bail!(NO_DEFAULT_FORMULA),
        },
    };

    let (_, doc) = ctx.load_formula(&name)?;

    let opts = RunOptions {
        pr: args.pr,
        rig,
        dry_run: args.dry_run,
    };

    // Dry runs and non-convoy guidance need no town; dispatching does.
    let needs_town = !opts.dry_run && doc.is_convoy();
    let (beads_dir, workdir) = if needs_town {
        let town = ctx.require_town()?;
        (town.join(".beads"), town.to_path_buf())
    } else {
        let base = ctx.town_root.clone().unwrap_or_else(|| ctx.cwd.clone());
        (base.join(".beads"), base)
    };

    let mut store = BdStore::new(beads_dir);
    let mut dispatcher = SlingDispatcher::new();
    let prs = GhPrSource;
    let mut executor = ConvoyExecutor::new(&mut store, &mut dispatcher, &prs, workdir);

    let mut out = progress_writer(ctx);
    let outcome = executor
        .run(&doc, &name, &opts, &mut out)
        .with_context(|| format!("running formula '{name}'"))?;

    if ctx.json {
        output_json(&outcome);
    }
    Ok(())
}
