use clap::{Parser, Subcommand};

mod commands;
mod scenario;

#[derive(Parser)]
#[command(
    name = "scoregrid",
    about = "ScoreGrid — score-driven placement planner",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scoring balancer against a scenario file.
    ///
    /// The scenario lists the task, its execution slots, work chunks and
    /// optional build history. Each attempt prints the decision and, when
    /// `report_scores` is set, the per-chunk score tables.
    Plan {
        /// Balancer settings (TOML)
        #[arg(short, long)]
        config: String,
        /// Scenario file (TOML)
        #[arg(short, long)]
        worksheet: String,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
        /// Number of back-to-back decisions
        #[arg(short, long, default_value = "1")]
        repeat: usize,
        /// Seed for tie-breaking
        #[arg(long)]
        seed: Option<u64>,
        /// Do not install the first-fit balancer as fallback
        #[arg(long)]
        no_fallback: bool,
    },
    /// Validate a balancer settings file
    Check {
        #[arg(short, long)]
        config: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,scoregrid=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Plan {
            config,
            worksheet,
            format,
            repeat,
            seed,
            no_fallback,
        } => commands::plan::plan(&commands::plan::PlanArgs {
            config: &config,
            worksheet: &worksheet,
            format: &format,
            repeat,
            seed,
            fallback: !no_fallback,
        }),
        Commands::Check { config } => commands::check::check(&config),
    }
}
