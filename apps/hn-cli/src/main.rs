use clap::{Parser, Subcommand};
use hn_app::{
    AppResult, Project, RunMode, RunOptions, RunProgressEvent, RunRequest, RunStage,
    project_service, report, run_service,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hn-cli")]
#[command(about = "hydronet CLI - water distribution network hydraulics", long_about = None)]
struct Cli {
    /// Raise the log level (-v info, -vv debug, -vvv trace); RUST_LOG wins when set
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a project file
    Validate {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
    },
    /// Solve one steady snapshot at the start of the period
    Solve {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Write the solution to a JSON or YAML file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run an extended-period simulation
    Simulate {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Duration in hours (overrides the project)
        #[arg(long)]
        duration: Option<f64>,
        /// Hydraulic timestep in hours (overrides the project)
        #[arg(long)]
        step: Option<f64>,
        /// Write the results to a JSON or YAML file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Analyze available fire flow at junctions
    FireFlow {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Junctions to analyze; defaults to the project's requests
        #[arg(short, long = "node")]
        nodes: Vec<String>,
        /// Write the results to a JSON or YAML file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    debug!(verbose = cli.verbose, "hn-cli started");

    match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Solve {
            project_path,
            output,
        } => {
            let project = project_service::load_project(&project_path)?;
            cmd_run(&project, RunMode::Steady, output.as_deref())
        }
        Commands::Simulate {
            project_path,
            duration,
            step,
            output,
        } => {
            let mut project = project_service::load_project(&project_path)?;
            if duration.is_some() {
                project.simulation.duration_h = duration;
            }
            if step.is_some() {
                project.simulation.hydraulic_step_h = step;
            }
            cmd_run(&project, RunMode::ExtendedPeriod, output.as_deref())
        }
        Commands::FireFlow {
            project_path,
            nodes,
            output,
        } => {
            let project = project_service::load_project(&project_path)?;
            cmd_run(&project, RunMode::FireFlow { nodes }, output.as_deref())
        }
    }
}

fn cmd_validate(project_path: &Path) -> AppResult<()> {
    println!("Validating project: {}", project_path.display());
    let project = project_service::load_project(project_path)?;
    project_service::validate_project(&project)?;
    let s = project_service::summarize_project(&project);
    println!("✓ Project is valid");
    println!(
        "  {}: {} junctions, {} tanks, {} reservoirs",
        s.name, s.junctions, s.tanks, s.reservoirs
    );
    println!(
        "  {} pipes, {} pumps, {} valves, {} patterns, {} controls",
        s.pipes, s.pumps, s.valves, s.patterns, s.controls
    );
    println!(
        "  Duration: {:.2} h, fire flow requests: {}",
        s.duration_h, s.fire_flow_requests
    );
    Ok(())
}

fn cmd_run(project: &Project, mode: RunMode, output: Option<&Path>) -> AppResult<()> {
    println!(
        "Running {} analysis for network: {}",
        mode.label(),
        project.network.name
    );

    let request = RunRequest {
        project,
        mode,
        options: RunOptions::default(),
    };

    let mut last_emit = Instant::now();
    let mut last_stage: Option<RunStage> = None;
    let response = run_service::execute_run_with_progress(
        &request,
        Some(&mut |event| {
            let emit_now =
                last_stage != Some(event.stage) || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = Some(event.stage);
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    if response.outcome.converged() {
        println!("✓ Run completed in {:.3}s", response.timing.total_time_s);
    } else {
        println!(
            "! Run completed in {:.3}s without full convergence",
            response.timing.total_time_s
        );
    }
    println!();
    print!("{}", report::render_outcome(&response.outcome));

    if let Some(path) = output {
        run_service::save_outcome(path, &response.outcome)?;
        debug!(path = %path.display(), "results saved");
        println!("\n✓ Results written to {}", path.display());
    }
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(100));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    if let Some(sim) = &event.simulation {
        let width = 28usize;
        let filled = ((sim.fraction_complete * width as f64).round() as usize).min(width);
        let bar = format!(
            "{}{}",
            "#".repeat(filled),
            "-".repeat(width.saturating_sub(filled))
        );
        print!(
            "\r[{}] {:>6.2}%  t={:.2}/{:.2}h  step={}/{}  elapsed={:.1}s",
            bar,
            sim.fraction_complete * 100.0,
            sim.sim_time_h,
            sim.duration_h,
            sim.step + 1,
            sim.total_steps,
            event.elapsed_wall_s
        );
    } else {
        let mut line = format!(
            "\r{}  elapsed={:.2}s",
            event.stage.label(),
            event.elapsed_wall_s
        );
        if let Some(msg) = &event.message {
            line.push_str(&format!("  {}", msg));
        }
        print!("{}", line);
    }
    let _ = io::stdout().flush();
}
