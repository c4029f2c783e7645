use anyhow::Result;
use clap::{Args, Parser, Subcommand};

mod config;
mod workflow;

#[derive(Parser)]
#[command(name = "regflux", about = "Regulatory-constrained flux simulation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the attractor search and report the steady-state constraints.
    Simulate(SimulateArgs),
    /// Screen single-entity knockouts across worker threads.
    Knockout(KnockoutArgs),
}

#[derive(Args)]
struct SimulateArgs {
    /// YAML metabolic network file.
    #[arg(long)]
    model: String,
    /// Optional YAML environmental constraints file.
    #[arg(long)]
    constraints: Option<String>,
    /// YAML regulation network file.
    #[arg(long)]
    regulation: String,
    /// Hard iteration cap for the repeated-state search.
    #[arg(long, default_value_t = 1000)]
    max_iterations: usize,
    /// Minimize the objective instead of maximizing it.
    #[arg(long)]
    minimize: bool,
    /// Base directory for run output (a timestamped subdirectory is created).
    #[arg(long, default_value = "./data/runs")]
    out_dir: String,
}

#[derive(Args)]
struct KnockoutArgs {
    /// YAML metabolic network file.
    #[arg(long)]
    model: String,
    /// Optional YAML environmental constraints file.
    #[arg(long)]
    constraints: Option<String>,
    /// Optional YAML regulation network file.
    #[arg(long)]
    regulation: Option<String>,
    /// Optional file of target entity ids, one per line. Defaults to all
    /// regulated entities (or all reactions without a regulation file).
    #[arg(long)]
    targets: Option<String>,
    /// Worker threads for the screen.
    #[arg(long, default_value_t = 4)]
    workers: usize,
    /// Hard iteration cap for per-knockout regulatory re-evaluation.
    #[arg(long, default_value_t = 1000)]
    max_iterations: usize,
    /// Minimize the objective instead of maximizing it.
    #[arg(long)]
    minimize: bool,
    /// Base directory for run output (a timestamped subdirectory is created).
    #[arg(long, default_value = "./data/runs")]
    out_dir: String,
}

fn main() -> Result<()> {
    println!("--- Regflux Application ---");

    let cli = Cli::parse();
    match cli.command {
        Command::Simulate(args) => workflow::run_simulation(&args),
        Command::Knockout(args) => workflow::run_knockout_screen(&args),
    }
}
