mod cmd_config;
mod cmd_pending;
mod cmd_reflect;
mod cmd_write;
mod logging;

use clap::{Parser, Subcommand};
use michi_config::MemConfig;
use michi_diary::MemPaths;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "michi", version, about = "Session diary and habit mining")]
struct Cli {
    /// Store root (defaults to $MICHI_MEM_HOME, then ~/.michi-mem)
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a new diary entry for today
    Write {
        /// JSON file with project/branch/summary/work_done/decisions/preferences
        #[arg(long)]
        input: Option<PathBuf>,
        /// Project identifier
        #[arg(long)]
        project: Option<String>,
        /// Branch name
        #[arg(long)]
        branch: Option<String>,
        /// One-line summary
        #[arg(long)]
        summary: Option<String>,
        /// Work item (repeatable)
        #[arg(long = "work")]
        work_done: Vec<String>,
        /// Decision made (repeatable)
        #[arg(long = "decision")]
        decisions: Vec<String>,
        /// Preference learned (repeatable)
        #[arg(long = "preference")]
        preferences: Vec<String>,
        /// Number of turns in the session; below `min_turns` the entry is skipped
        #[arg(long)]
        turns: Option<u32>,
    },
    /// List diary entries not yet mined
    Pending,
    /// Mine unprocessed entries for recurring patterns
    Reflect {
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Record the mined entries as processed
        #[arg(long)]
        mark: bool,
    },
    /// Show the effective configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level);

    let paths = match cli.root {
        Some(root) => MemPaths::discover(root),
        None => MemPaths::default_root(),
    };
    let config = MemConfig::load(&paths.config_json)?;

    match cli.cmd {
        Command::Write {
            input,
            project,
            branch,
            summary,
            work_done,
            decisions,
            preferences,
            turns,
        } => cmd_write::execute(cmd_write::WriteParams {
            paths: &paths,
            config: &config,
            input: input.as_deref(),
            project,
            branch,
            summary,
            work_done,
            decisions,
            preferences,
            turns,
        }),
        Command::Pending => cmd_pending::execute(&paths),
        Command::Reflect { json, mark } => cmd_reflect::execute(&paths, &config, json, mark),
        Command::Config => cmd_config::execute(&paths, &config),
    }
}
