use clap::{Parser, Subcommand, ValueEnum};
use pf_sim::{RunConfig, SimError, SimResult, Trajectory, sweep_valve_openings};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pf-cli")]
#[command(about = "PistonFlow CLI - Hydraulic piston-valve simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and export its trajectory
    Run {
        /// Scenario YAML file (built-in reference scenario if omitted)
        scenario: Option<PathBuf>,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,
    },
    /// Validate a scenario file
    Check {
        /// Scenario YAML file
        scenario: PathBuf,
    },
    /// Write the reference scenario as a starting point
    Init {
        /// Destination path
        #[arg(default_value = "piston_valve.yaml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Run a scenario once per valve opening, in parallel
    Sweep {
        /// Scenario YAML file (built-in reference scenario if omitted)
        scenario: Option<PathBuf>,
        /// Valve openings in [0, 1], comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        openings: Vec<f64>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

fn main() -> SimResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scenario,
            output,
            format,
        } => cmd_run(scenario.as_deref(), output.as_deref(), format),
        Commands::Check { scenario } => cmd_check(&scenario),
        Commands::Init { path, force } => cmd_init(&path, force),
        Commands::Sweep { scenario, openings } => cmd_sweep(scenario.as_deref(), &openings),
    }
}

fn load_or_default(scenario: Option<&Path>) -> SimResult<RunConfig> {
    match scenario {
        Some(path) => RunConfig::load(path),
        None => Ok(RunConfig::default()),
    }
}

fn cmd_run(
    scenario: Option<&Path>,
    output: Option<&Path>,
    format: OutputFormat,
) -> SimResult<()> {
    let config = load_or_default(scenario)?;
    eprintln!("Running scenario: {}", config.name);

    let start = Instant::now();
    let traj = config.run()?;
    let elapsed = start.elapsed().as_secs_f64();

    match output {
        Some(path) => {
            let file = BufWriter::new(File::create(path)?);
            write_trajectory(&traj, file, format)?;
            eprintln!("✓ Wrote {} samples to {}", traj.len(), path.display());
        }
        None => write_trajectory(&traj, io::stdout().lock(), format)?,
    }

    print_summary(&traj, elapsed);
    Ok(())
}

fn write_trajectory<W: Write>(
    traj: &Trajectory,
    mut out: W,
    format: OutputFormat,
) -> SimResult<()> {
    match format {
        OutputFormat::Csv => traj.write_csv(out)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, traj).map_err(io::Error::from)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn print_summary(traj: &Trajectory, elapsed_s: f64) {
    let stats = traj.stats();
    eprintln!("\nSummary:");
    eprintln!("  Samples: {}", traj.len());
    if let Some(last) = traj.last() {
        let s = last.state;
        eprintln!("  Final time:     {:.6} s", last.t);
        eprintln!("  Position:       {:.6e} m", s.position);
        eprintln!("  Velocity:       {:.6e} m/s", s.velocity);
        eprintln!("  Chamber 1 p:    {:.6e} Pa", s.pressure1);
        eprintln!("  Chamber 2 p:    {:.6e} Pa", s.pressure2);
    }
    eprintln!(
        "  Steps:   {} accepted, {} rejected",
        stats.accepted_steps, stats.rejected_steps
    );
    eprintln!("  Newton failures: {}", stats.newton_failures);
    eprintln!("  RHS evaluations: {}", stats.rhs_evals);
    eprintln!("  Jacobians:       {}", stats.jacobian_evals);
    eprintln!("  Wall time: {:.3}s", elapsed_s);
}

fn cmd_check(scenario: &Path) -> SimResult<()> {
    println!("Validating scenario: {}", scenario.display());
    let config = RunConfig::load(scenario)?;
    println!("✓ Scenario '{}' is valid", config.name);
    println!(
        "  Interval: [{}, {}] s, {} samples",
        config.time.start, config.time.end, config.time.samples
    );
    println!(
        "  Integrator: {} (rtol {:e}, atol {:e})",
        config.solver.integrator.name(),
        config.solver.rel_tol,
        config.solver.abs_tol
    );
    Ok(())
}

fn cmd_init(path: &Path, force: bool) -> SimResult<()> {
    if path.exists() && !force {
        return Err(SimError::Config {
            message: format!("{} already exists (use --force to overwrite)", path.display()),
        });
    }
    RunConfig::default().save(path)?;
    println!("✓ Wrote reference scenario to {}", path.display());
    Ok(())
}

fn cmd_sweep(scenario: Option<&Path>, openings: &[f64]) -> SimResult<()> {
    let config = load_or_default(scenario)?;
    println!(
        "Sweeping valve opening for scenario: {} ({} points)",
        config.name,
        openings.len()
    );

    let start = Instant::now();
    let points = sweep_valve_openings(&config, openings);
    debug!(elapsed_s = start.elapsed().as_secs_f64(), "sweep finished");

    println!(
        "{:>10}  {:>14}  {:>14}  {:>14}",
        "opening", "position_m", "velocity_mps", "pressure1_pa"
    );
    let mut failures = 0;
    for point in &points {
        match &point.result {
            Ok(traj) => {
                if let Some(last) = traj.last() {
                    println!(
                        "{:>10.4}  {:>14.6e}  {:>14.6e}  {:>14.6e}",
                        point.valve_opening,
                        last.state.position,
                        last.state.velocity,
                        last.state.pressure1
                    );
                }
            }
            Err(e) => {
                failures += 1;
                println!("{:>10.4}  failed: {}", point.valve_opening, e);
            }
        }
    }

    if failures > 0 {
        return Err(SimError::IntegrationFailure {
            reason: format!("{} of {} sweep runs failed", failures, points.len()),
        });
    }
    println!("\n✓ All {} runs completed", points.len());
    Ok(())
}
