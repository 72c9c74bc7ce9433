//! `gt completion <shell>`.

use std::io::Write;

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::{Shell, generate};

use crate::cli::{Cli, CompletionArgs, CompletionCommands};

const BIN_NAME: &str = "gt";

impl From<&CompletionCommands> for Shell {
    fn from(command: &CompletionCommands) -> Self {
        match command {
            CompletionCommands::Bash => Shell::Bash,
            CompletionCommands::Zsh => Shell::Zsh,
            CompletionCommands::Fish => Shell::Fish,
            CompletionCommands::Powershell => Shell::PowerShell,
        }
    }
}

fn write_script(shell: Shell, out: &mut dyn Write) {
    generate(shell, &mut Cli::command(), BIN_NAME, out);
}

pub fn run(args: &CompletionArgs) -> Result<()> {
    write_script(Shell::from(&args.command), &mut std::io::stdout());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_covers_formula_subcommands() {
        let mut buf = Vec::new();
        write_script(Shell::from(&CompletionCommands::Fish), &mut buf);
        let script = String::from_utf8(buf).unwrap();
        assert!(script.contains("complete -c gt"));
        assert!(script.contains("doctor"));
    }
}
