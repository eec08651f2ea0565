//! The `completions` subcommand.
//!
//! Prints a `clap_complete` script covering `build` and its env-backed
//! flags, or writes it to `--output`:
//!
//! ```bash
//! manifest-render completions bash > ~/.local/share/bash-completion/completions/manifest-render
//! manifest-render completions zsh --output ~/.zfunc/_manifest-render
//! ```

use anyhow::{Context, Result};
use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::cli::Cli;

/// Generate shell completion scripts
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write the script to this file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Write the completion script for `shell` to `out`.
fn write_completions(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, out);
}

/// Execute the `completions` command
pub fn execute(args: CompletionsArgs) -> Result<()> {
    match &args.output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_completions(args.shell, &mut file);
            log::info!("Wrote {} completions to {}", args.shell, path.display());
        }
        None => write_completions(args.shell, &mut io::stdout()),
    }
    Ok(())
}
