//! docs-toolchain CLI: runs the check and pre-build stages of a documentation build.
//!
//! Every registered unit runs against the content, problems are reported
//! as an ordered list, and the exit status says whether any were found.

mod commands;
mod plugins;

use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => return Ok(usage_exit(&err)),
    };
    commands::init_tracing(&cli);
    commands::run(cli)
}

/// Help and version exit 0. Usage errors exit 1 so that 2 stays reserved for
/// list-only runs.
fn usage_exit(err: &clap::Error) -> ExitCode {
    // Nothing useful to do if the terminal is gone.
    let _ = err.print();
    if err.use_stderr() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
