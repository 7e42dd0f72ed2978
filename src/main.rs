use std::fs::read_to_string;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crew_assign::backend::DEFAULT_BACKEND;
use crew_assign::{Problem, SolveLimits, backend_by_name};

/// Assign workers to sites from a YAML problem file
#[derive(Parser)]
#[command(name = "crew-assign", version)]
struct Cli {
    /// Problem file (YAML)
    input: PathBuf,

    /// Stop the search after this many seconds
    #[arg(long)]
    time_limit: Option<f64>,

    /// Accept a feasible solution when the search stops before optimality
    #[arg(long)]
    accept_feasible: bool,

    #[arg(long, default_value = DEFAULT_BACKEND)]
    solver: String,

    #[arg(long)]
    skill_weight: Option<f64>,

    #[arg(long)]
    distance_weight: Option<f64>,

    #[arg(long)]
    compatibility_weight: Option<f64>,

    /// Print model size (variables and constraints) instead of solving
    #[arg(long)]
    stats: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("crew_assign=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let buf = read_to_string(&cli.input)?;
    let mut problem: Problem = serde_yaml::from_str(&buf)?;
    if let Some(w) = cli.skill_weight {
        problem.weights.skill = w;
    }
    if let Some(w) = cli.distance_weight {
        problem.weights.distance = w;
    }
    if let Some(w) = cli.compatibility_weight {
        problem.weights.compatibility = w;
    }

    if cli.stats {
        print!("{}", serde_yaml::to_string(&problem.model_stats()?)?);
        return Ok(());
    }

    let time_limit = match cli.time_limit {
        Some(secs) => Some(Duration::try_from_secs_f64(secs)?),
        None => None,
    };
    let limits = SolveLimits {
        time_limit,
        accept_feasible: cli.accept_feasible,
    };

    let backend = backend_by_name(&cli.solver)?;
    let solution = problem.solve_with(backend.as_ref(), &limits)?;

    println!("{}", serde_yaml::to_string(&solution)?);
    Ok(())
}
