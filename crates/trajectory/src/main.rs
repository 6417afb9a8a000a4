use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use trajectory::run::validate_scenario;
use trajectory::{RunOptions, init_logging, report, run_scenario};

#[derive(Parser, Debug)]
#[command(name = "trajectory")]
#[command(about = "Monte Carlo portfolio trajectory simulator")]
struct Args {
    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate a scenario and print its summary
    Run {
        /// Scenario file (YAML, or JSON by extension)
        #[arg(short, long)]
        scenario: PathBuf,

        /// Price history file; not needed for parametric scenarios
        #[arg(short = 'H', long)]
        history: Option<PathBuf>,

        /// Write the JSON summary here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the scenario's seed
        #[arg(long)]
        seed: Option<u64>,

        /// Abort the run after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Check a scenario file without running it
    Validate {
        #[arg(short, long)]
        scenario: PathBuf,
    },
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let _guard = init_logging(&args.log_level, args.log_file.as_deref())?;

    match args.command {
        Command::Run {
            scenario,
            history,
            output,
            seed,
            timeout_secs,
        } => {
            let print_json = output.is_none();
            let outcome = run_scenario(&RunOptions {
                scenario,
                history,
                output,
                seed,
                timeout: timeout_secs.map(Duration::from_secs),
            })?;
            if print_json {
                print!("{}", report::to_json(&outcome.summary)?);
            } else {
                print!("{}", report::render_text(&outcome.name, &outcome.summary));
            }
        }
        Command::Validate { scenario } => {
            let resolved = validate_scenario(&scenario)?;
            println!(
                "{}: ok ({} paths x {} steps, {} assets)",
                resolved.name,
                resolved.config.num_paths,
                resolved.config.num_steps,
                resolved.config.num_assets()
            );
        }
    }

    tracing::info!("Trajectory shutting down");
    Ok(())
}
