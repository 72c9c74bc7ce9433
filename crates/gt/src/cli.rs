//! Clap CLI definitions for the `gt` command.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// gt -- Gas Town workspace tool.
#[derive(Parser, Debug)]
#[command(
    name = "gt",
    about = "Gas Town workspace tool",
    long_about = "Manage workflow formulas for a Gas Town workspace: list and inspect them, run convoy formulas across workers, and keep local overrides in sync with the built-in versions.",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Output in JSON format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug output.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output (errors only).
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Work with workflow formulas.
    #[command(alias = "formulas")]
    Formula(FormulaArgs),

    /// Print version information.
    Version,

    /// Generate shell completions.
    Completion(CompletionArgs),
}

// ---------------------------------------------------------------------------
// Formula
// ---------------------------------------------------------------------------

/// Arguments for `gt formula`.
#[derive(Args, Debug)]
pub struct FormulaArgs {
    #[command(subcommand)]
    pub command: FormulaCommands,
}

#[derive(Subcommand, Debug)]
pub enum FormulaCommands {
    /// List built-in formulas, their overrides, and custom formulas.
    List,

    /// Show formula details.
    Show(FormulaShowArgs),

    /// Run a formula (convoy formulas are dispatched to workers).
    Run(FormulaRunArgs),

    /// Create a new formula from a starter template.
    Create(FormulaCreateArgs),

    /// Copy a built-in formula for local editing.
    Modify(FormulaModifyArgs),

    /// Show overrides, or compare one formula across tiers.
    Diff(FormulaDiffArgs),

    /// Remove an override and go back to the built-in.
    Reset(FormulaResetArgs),

    /// Merge a newer built-in into an override with an AI agent.
    Update(FormulaUpdateArgs),

    /// Check built-in availability and stale provisioned copies.
    Doctor(FormulaDoctorArgs),
}

#[derive(Args, Debug)]
pub struct FormulaShowArgs {
    /// Formula name.
    pub name: String,
}

#[derive(Args, Debug)]
pub struct FormulaRunArgs {
    /// Formula name (default: the rig's workflow.default_formula).
    pub name: Option<String>,

    /// Pull request number to review.
    #[arg(long)]
    pub pr: Option<u32>,

    /// Target rig (default: the rig containing the current directory).
    #[arg(long)]
    pub rig: Option<String>,

    /// Show what would happen without creating or dispatching anything.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct FormulaCreateArgs {
    /// Formula name.
    pub name: String,

    /// Formula type: task, workflow, patrol, or convoy.
    #[arg(long = "type", default_value = "task")]
    pub formula_type: String,
}

#[derive(Args, Debug)]
pub struct FormulaModifyArgs {
    /// Built-in formula name.
    pub name: String,

    /// Copy into this rig instead of the town.
    #[arg(long, conflicts_with = "town")]
    pub rig: Option<String>,

    /// Copy into the town at this path.
    #[arg(long)]
    pub town: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct FormulaDiffArgs {
    /// Formula name; omit for the override map.
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct FormulaResetArgs {
    /// Formula name.
    pub name: String,

    /// Remove the override in this rig instead of the town.
    #[arg(long)]
    pub rig: Option<String>,
}

#[derive(Args, Debug)]
pub struct FormulaUpdateArgs {
    /// Formula name.
    pub name: String,

    /// Write the merge into the override (a .bak copy is kept).
    #[arg(long)]
    pub apply: bool,
}

#[derive(Args, Debug)]
pub struct FormulaDoctorArgs {
    /// Remove provisioned copies identical to the built-in.
    #[arg(long)]
    pub fix: bool,
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct CompletionArgs {
    #[command(subcommand)]
    pub command: CompletionCommands,
}

#[derive(Subcommand, Debug)]
pub enum CompletionCommands {
    /// Generate Bash completions.
    Bash,
    /// Generate Zsh completions.
    Zsh,
    /// Generate Fish completions.
    Fish,
    /// Generate PowerShell completions.
    Powershell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::parse_from(["gt", "formula", "run", "code-review", "--pr", "42", "--dry-run", "--json"]);
        let Some(Commands::Formula(FormulaArgs {
            command: FormulaCommands::Run(args),
        })) = cli.command
        else {
            panic!("expected formula run");
        };
        assert_eq!(args.name.as_deref(), Some("code-review"));
        assert_eq!(args.pr, Some(42));
        assert!(args.dry_run);
        assert!(cli.global.json);
    }

    #[test]
    fn modify_rig_and_town_conflict() {
        let res = Cli::try_parse_from(["gt", "formula", "modify", "shiny", "--rig", "a", "--town", "/t"]);
        assert!(res.is_err());
    }
}
