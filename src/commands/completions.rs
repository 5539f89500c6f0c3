//! `replicate-tasks completions <shell>`: prints a tab-completion script.
//!
//! Task selection flags (`--channel`, `--host`, `--method`, `--state`) and
//! the replication knobs are long and easy to mistype, so the script is worth
//! installing on machines that replicate often:
//!
//! ```bash
//! replicate-tasks completions bash > ~/.local/share/bash-completion/completions/replicate-tasks
//! replicate-tasks completions zsh > ~/.zfunc/_replicate-tasks
//! ```

use std::io::{self, Write};

use anyhow::Result;
use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};

use crate::cli::Cli;

const BIN_NAME: &str = "replicate-tasks";

/// Print a tab-completion script for replicate-tasks
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell the script is written for
    #[arg(value_enum)]
    pub shell: Shell,
}

pub fn execute(args: CompletionsArgs) -> Result<()> {
    write_script(args.shell, &mut io::stdout())
}

fn write_script<W: Write>(shell: Shell, out: &mut W) -> Result<()> {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, BIN_NAME, &mut *out);
    out.flush()?;
    Ok(())
}
