mod cmd;
mod repo;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Repository maintenance tasks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Require changes/<change-id>/ docs for substantive diffs (CI check `os-validate`).
    ValidateChange {
        /// Base revision; 40 zeros lists the whole head tree.
        #[arg(long)]
        base: String,
        /// Head revision.
        #[arg(long)]
        head: String,
    },
    /// Validate a single changes/<change-id>/ folder without git.
    CheckChange {
        #[arg(value_name = "CHANGE_ID")]
        change_id: String,
        /// Repository root (defaults to the enclosing workspace)
        #[arg(long, value_name = "PATH")]
        root: Option<PathBuf>,
    },
    /// Scaffold changes/<change-id>/ with one template per required document.
    NewChange {
        #[arg(value_name = "CHANGE_ID")]
        change_id: String,
        /// Repository root (defaults to the enclosing workspace)
        #[arg(long, value_name = "PATH")]
        root: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    match real_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn real_main() -> Result<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Command::ValidateChange { base, head } => cmd::validate_change::run(&base, &head),
        Command::CheckChange { change_id, root } => cmd::validate_change::run_check(&change_id, root),
        Command::NewChange { change_id, root } => cmd::new_change::run(&change_id, root),
    }
}
