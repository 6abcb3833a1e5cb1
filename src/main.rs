//! studyplan CLI: run the study-planning agent loop stage by stage.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use study_planner::config::PlannerConfig;
use study_planner::history;
use study_planner::intake;
use study_planner::paths::ProjectPaths;
use study_planner::pipeline::Pipeline;
use study_planner::schedule::ScheduleSlot;

#[derive(Parser)]
#[command(name = "studyplan", version, about = "Perceive, reason, act, learn: daily study planning")]
struct Cli {
    /// Project directory holding data/, engines/ and report/.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Config file (default: <root>/planner.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the project layout, sample data and a default config where missing.
    Init,

    /// Derive the fact file from history and config.
    Perceive,

    /// Run the rule engine over rules + facts and write the decision list.
    Reason,

    /// Turn the decision list into today's schedule.
    Act,

    /// Compute weekly completion and adherence metrics.
    Learn,

    /// Perceive, Reason, Act and Learn in one go.
    Run,

    /// Write the baseline adherence report.
    Predict,

    /// Add a deadline from a one-line request, e.g. "Physics quiz on 2025-10-17; need 2 hr".
    AddTask {
        /// Free-text request.
        text: String,
    },
}

fn print_schedule(slots: &[ScheduleSlot]) {
    println!("=== TODAY'S PLAN ===");
    if slots.is_empty() {
        println!("No sessions.");
        return;
    }
    println!("{:<16} {:>5}  {:>5}  {:>7}", "subject", "start", "end", "minutes");
    for slot in slots {
        println!(
            "{:<16} {:>5}  {:>5}  {:>7}",
            slot.subject,
            slot.start.format("%H:%M"),
            slot.end.format("%H:%M"),
            slot.minutes
        );
    }
}

fn init(paths: &ProjectPaths, config_path: &Path) -> Result<()> {
    paths.ensure_dirs()?;
    for path in history::seed_sample_data(paths)? {
        println!("Seeded {}", path.display());
    }
    if !config_path.exists() {
        PlannerConfig::default().save(config_path)?;
        println!("Wrote default config {}", config_path.display());
    }
    let rules = PlannerConfig::load(config_path)?.rules_path_in(&paths.root);
    if !rules.exists() {
        println!("Note: place the planner rule file at {}", rules.display());
    }
    Ok(())
}

fn open_pipeline(paths: ProjectPaths, config_path: &Path) -> Result<Pipeline> {
    let config = PlannerConfig::load(config_path)?;
    Ok(Pipeline::new(paths, config))
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let paths = ProjectPaths::new(std::path::absolute(&cli.root).into_diagnostic()?);
    let config_path = cli.config.clone().unwrap_or_else(|| paths.config_file());

    match cli.command {
        Commands::Init => init(&paths, &config_path)?,

        Commands::Perceive => {
            let pipeline = open_pipeline(paths, &config_path)?;
            let report = pipeline.perceive()?;
            println!("[perceive] wrote {} facts to {}", report.facts, report.path.display());
        }

        Commands::Reason => {
            let pipeline = open_pipeline(paths, &config_path)?;
            let reasoner = pipeline.default_reasoner()?;
            let report = pipeline.reason(&reasoner)?;
            println!("[reason] wrote {}", pipeline.paths().plan_json().display());
            let summary = serde_json::json!({
                "latency_s": (report.latency.as_secs_f64() * 1000.0).round() / 1000.0,
                "plan": report.decisions,
            });
            println!("{}", serde_json::to_string_pretty(&summary).into_diagnostic()?);
        }

        Commands::Act => {
            let pipeline = open_pipeline(paths, &config_path)?;
            let slots = pipeline.act()?;
            print_schedule(&slots);
        }

        Commands::Learn => {
            let pipeline = open_pipeline(paths, &config_path)?;
            let weekly = pipeline.learn()?;
            println!(
                "[learn] weekly {}",
                serde_json::to_string(&weekly).into_diagnostic()?
            );
        }

        Commands::Run => {
            let pipeline = open_pipeline(paths, &config_path)?;
            let reasoner = pipeline.default_reasoner()?;
            let report = pipeline.run(&reasoner)?;
            println!("[perceive] {} facts", report.perceive.facts);
            println!(
                "[reason] {} decisions in {:.3}s",
                report.reason.decisions.len(),
                report.reason.latency.as_secs_f64()
            );
            print_schedule(&report.schedule);
            println!(
                "[learn] weekly {}",
                serde_json::to_string(&report.metrics).into_diagnostic()?
            );
            println!("Pipeline finished in {:.2}s", report.elapsed.as_secs_f64());
        }

        Commands::Predict => {
            let pipeline = open_pipeline(paths, &config_path)?;
            let report = pipeline.predict()?;
            println!("[predict] wrote {}", pipeline.paths().adherence_json().display());
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        }

        Commands::AddTask { text } => {
            let pipeline = open_pipeline(paths, &config_path)?;
            let today = chrono::Local::now().date_naive();
            let task = intake::parse_task(&text, today);
            let path = pipeline.paths().deadlines_csv();
            history::append_deadline(&path, &task.to_deadline())?;
            println!("Added {task} to {}", path.display());
        }
    }

    Ok(())
}
