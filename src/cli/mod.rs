mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "inetvm", version, about = "Interaction-net VM tooling")]
struct Cli {
    /// JSON file with reduction budgets (`max_steps`, `max_wall_time_ms`)
    #[arg(short = 'c', long = "config", global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Abort after this many reduction steps
    #[arg(long = "max-steps", global = true, value_name = "N")]
    max_steps: Option<usize>,

    /// Abort after this many milliseconds of reduction
    #[arg(long = "timeout-ms", global = true, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate an expression and print its value
    Eval {
        /// Source text, e.g. `let x = 5 in x + 3`
        expr: String,
    },
    /// Evaluate the program in a source file
    Run { file: PathBuf },
    /// Interactive read-eval-print loop
    Repl,
    /// Print the net built for an expression
    Dump {
        expr: String,
        /// Reduce to normal form before printing
        #[arg(long)]
        reduced: bool,
    },
    /// Print reduction statistics for an expression
    Stats { expr: String },
}

pub(crate) fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref(), cli.max_steps, cli.timeout_ms)?;

    match cli.command {
        Command::Eval { expr } => commands::cmd_eval(&expr, &config, cli.json),
        Command::Run { file } => commands::cmd_run(&file, &config, cli.json),
        Command::Repl => commands::cmd_repl(&config),
        Command::Dump { expr, reduced } => commands::cmd_dump(&expr, &config, reduced),
        Command::Stats { expr } => commands::cmd_stats(&expr, &config, cli.json),
    }
}
