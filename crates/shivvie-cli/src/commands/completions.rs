//! Shell completion generation.

use clap::CommandFactory;
use clap_complete::{Generator, generate, shells};

use crate::cli::{Cli, CompletionsArgs, Shell};

const BIN_NAME: &str = "shivvie";

pub fn execute(args: CompletionsArgs) -> crate::error::CliResult<()> {
    match args.shell {
        Shell::Bash => write_completions(shells::Bash),
        Shell::Zsh => write_completions(shells::Zsh),
        Shell::Fish => write_completions(shells::Fish),
        Shell::PowerShell => write_completions(shells::PowerShell),
        Shell::Elvish => write_completions(shells::Elvish),
    }
    Ok(())
}

fn write_completions(shell: impl Generator) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, BIN_NAME, &mut std::io::stdout());
}
