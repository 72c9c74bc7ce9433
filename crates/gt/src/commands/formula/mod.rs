//! `gt formula` -- list, inspect, run, and customize workflow formulas.

mod create;
mod doctor;
mod list;
mod overrides;
mod run;
mod show;

use anyhow::Result;

use crate::cli::{FormulaArgs, FormulaCommands};
use crate::context::RuntimeContext;

pub fn run(ctx: &RuntimeContext, args: &FormulaArgs) -> Result<()> {
    match &args.command {
        FormulaCommands::List => list::run(ctx),
        FormulaCommands::Show(a) => show::run(ctx, a),
        FormulaCommands::Run(a) => run::run(ctx, a),
        FormulaCommands::Create(a) => create::run(ctx, a),
        FormulaCommands::Modify(a) => overrides::modify(ctx, a),
        FormulaCommands::Diff(a) => overrides::diff(ctx, a),
        FormulaCommands::Reset(a) => overrides::reset(ctx, a),
        FormulaCommands::Update(a) => overrides::update(ctx, a),
        FormulaCommands::Doctor(a) => doctor::run(ctx, a),
    }
}
