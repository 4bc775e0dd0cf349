//! Exploratory black-box test harness.
//!
//! Reads variable definitions from a workbook, runs the program once per
//! combination of example values, and writes the results to a new table.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use blackbox::error::FailureKind;
use blackbox::exit_codes;
use blackbox::io::config::{DEFAULT_CONFIG_FILE, load_config};
use blackbox::logging;
use blackbox::session::{SessionRequest, run_session};

#[derive(Parser)]
#[command(
    name = "blackbox",
    version,
    about = "Run a program against every combination of example inputs"
)]
struct Cli {
    /// Workbook directory holding the `inputs` table and receiving results.
    workbook: PathBuf,
    /// Executable to invoke once per combination.
    program: PathBuf,
    /// Config file (defaults to `<WORKBOOK>/blackbox.toml`).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Do not write the progress line to stderr.
    #[arg(long)]
    no_progress: bool,
}

fn main() {
    let cli = Cli::parse();
    logging::init();
    if let Err(err) = run(&cli) {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::for_error(&err));
    }
}

fn run(cli: &Cli) -> Result<()> {
    println!("blackbox\n========");
    println!("{} {}", cli.workbook.display(), cli.program.display());

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.workbook.join(DEFAULT_CONFIG_FILE));
    let config = load_config(&config_path).context(FailureKind::Config)?;

    let outcome = run_session(&SessionRequest {
        workbook: &cli.workbook,
        program: &cli.program,
        config: &config,
        show_progress: !cli.no_progress,
    })?;

    println!(
        "wrote {} rows ({} combinations) to table {}",
        outcome.rows_written, outcome.combinations, outcome.table
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_positional_arguments() {
        let cli = Cli::parse_from(["blackbox", "book", "./prog.sh"]);
        assert_eq!(cli.workbook, PathBuf::from("book"));
        assert_eq!(cli.program, PathBuf::from("./prog.sh"));
        assert!(cli.config.is_none());
        assert!(!cli.no_progress);
    }

    #[test]
    fn missing_program_is_a_usage_error() {
        assert!(Cli::try_parse_from(["blackbox", "book"]).is_err());
    }

    #[test]
    fn parse_config_override() {
        let cli = Cli::parse_from([
            "blackbox",
            "book",
            "prog",
            "--config",
            "alt.toml",
            "--no-progress",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        assert!(cli.no_progress);
    }
}
