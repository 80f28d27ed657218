//! Reportify CLI - Command-line interface for Reportify
//!
//! Starts a report run, shows the proposed plan, and drives the
//! approve/revise checkpoint interactively before streaming the run to its
//! final report.

use clap::{Parser, Subcommand};
use reportify_core::{init_logging, LoggingConfig, ModelRef, RunConfig, RunOverrides, SearchProviderKind};
use reportify_workflow::{
    format_sections, FileCheckpointStore, ReportEngine, ResumeInput, RunEvent, RunStatus,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "reportify")]
#[command(about = "Generate multi-section research reports from a single topic")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a report for a topic
    Report {
        /// Report topic
        topic: String,

        /// Search provider (tavily, semantic-scholar, duckduckgo)
        #[arg(long)]
        provider: Option<String>,

        /// Iteration ceiling for the per-section research loop
        #[arg(long)]
        max_search_depth: Option<usize>,

        /// Queries generated per planning/research pass
        #[arg(long)]
        queries: Option<usize>,

        /// Planner model as provider/model
        #[arg(long)]
        planner_model: Option<String>,

        /// Writer model as provider/model
        #[arg(long)]
        writer_model: Option<String>,

        /// Write the final report to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Approve the proposed plan without asking
        #[arg(long)]
        yes: bool,
    },

    /// List stored runs and their status
    Runs,

    /// Manage configuration
    Config {
        /// Show the effective configuration
        #[arg(long)]
        show: bool,

        /// Initialize a default configuration file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut logging_config = LoggingConfig::default();
    if cli.verbose {
        logging_config.level = "debug".to_string();
    }
    init_logging(&logging_config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Starting Reportify CLI v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Report {
            topic,
            provider,
            max_search_depth,
            queries,
            planner_model,
            writer_model,
            output,
            yes,
        } => {
            let overrides = RunOverrides {
                max_search_depth,
                number_of_queries: queries,
                planner_model: planner_model
                    .as_deref()
                    .map(|s| s.parse::<ModelRef>())
                    .transpose()?,
                writer_model: writer_model
                    .as_deref()
                    .map(|s| s.parse::<ModelRef>())
                    .transpose()?,
                search_provider: provider
                    .as_deref()
                    .map(|s| s.parse::<SearchProviderKind>())
                    .transpose()?,
                ..Default::default()
            };
            let config = load_config(cli.config.as_ref(), &overrides)?;
            handle_report(topic, config, output, yes).await?;
        }
        Commands::Runs => {
            handle_runs().await?;
        }
        Commands::Config { show, init } => {
            handle_config(cli.config.as_ref(), show, init)?;
        }
    }

    Ok(())
}

fn load_config(
    config_path: Option<&PathBuf>,
    overrides: &RunOverrides,
) -> anyhow::Result<RunConfig> {
    if let Some(path) = config_path {
        info!("Loading configuration from {:?}", path);
        return Ok(RunConfig::layered(Some(path), overrides)?);
    }

    // Fall back to default locations
    let default_paths = [
        dirs::config_dir().map(|d| d.join("reportify").join("config.toml")),
        dirs::home_dir().map(|d| d.join(".reportify").join("config.toml")),
        Some(PathBuf::from("reportify.toml")),
    ];

    for path in default_paths.iter().flatten() {
        if path.exists() {
            info!("Loading configuration from {:?}", path);
            return Ok(RunConfig::layered(Some(path), overrides)?);
        }
    }

    info!("No configuration file found, using defaults");
    Ok(RunConfig::layered(None::<&PathBuf>, overrides)?)
}

fn runs_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reportify")
        .join("runs")
}

fn config_path() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|d| d.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reportify")
        .join("config.toml")
}

async fn handle_report(
    topic: String,
    config: RunConfig,
    output: Option<PathBuf>,
    auto_approve: bool,
) -> anyhow::Result<()> {
    println!("🔎 Topic: {}", topic);
    println!(
        "⚙️  Provider: {} | planner: {} | writer: {}",
        config.search_provider, config.planner_model, config.writer_model
    );

    let store = Arc::new(FileCheckpointStore::new(runs_dir())?);
    let engine = ReportEngine::connect(&config, store).await?;

    println!("📝 Planning report sections...");
    let run_id = engine.start_run(&topic, config).await?;

    // Approve/revise loop over the human checkpoint
    loop {
        let record = engine.get_run(&run_id).await?;
        println!("\n📋 Proposed plan:");
        println!("{}", format_sections(&record.state.sections));

        let input = if auto_approve {
            String::new()
        } else {
            prompt_user("Approve this plan? Press Enter to approve, or describe a revision: ")?
        };

        if input.trim().is_empty() || input.trim().eq_ignore_ascii_case("yes") {
            println!("✅ Plan approved, researching sections...");
            let events = engine.resume(&run_id, ResumeInput::Approve).await?;
            return finish_run(&engine, &run_id, events, output).await;
        }

        println!("🔁 Revising plan...");
        let mut events = engine
            .resume(&run_id, ResumeInput::Revise(input.trim().to_string()))
            .await?;
        while let Some(event) = events.recv().await {
            if let RunEvent::Failed { message, .. } = event {
                anyhow::bail!("Planning failed: {}", message);
            }
        }
    }
}

async fn finish_run(
    engine: &ReportEngine,
    run_id: &str,
    mut events: tokio::sync::mpsc::Receiver<RunEvent>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    while let Some(event) = events.recv().await {
        match event {
            RunEvent::ResearchStarted { sections } => {
                println!("🔬 Researching {} section(s): {}", sections.len(), sections.join(", "));
            }
            RunEvent::SectionSearch {
                section, iteration, ..
            } => {
                println!("  🔎 {} - search pass {}", section, iteration);
            }
            RunEvent::SectionGraded { section, grade } => {
                println!("  🧪 {} - graded {:?}", section, grade);
            }
            RunEvent::SectionCompleted { section } => {
                println!("  ✅ {} completed", section);
            }
            RunEvent::Compiling => {
                println!("📚 Compiling final report...");
            }
            RunEvent::Completed { final_report } => {
                match &output {
                    Some(path) => {
                        std::fs::write(path, &final_report)?;
                        println!("🎉 Report written to {}", path.display());
                    }
                    None => {
                        println!("\n{}", final_report);
                    }
                }
                println!("💾 Run id: {}", run_id);
                return Ok(());
            }
            RunEvent::Failed { kind, message } => {
                anyhow::bail!("Run failed ({}): {}", kind, message);
            }
            _ => {}
        }
    }

    // Stream ended without a terminal event; report the stored status
    let record = engine.get_run(run_id).await?;
    anyhow::bail!("Run ended in status: {}", record.status)
}

async fn handle_runs() -> anyhow::Result<()> {
    use reportify_workflow::CheckpointStore;

    let store = FileCheckpointStore::new(runs_dir())?;
    let run_ids = store.list().await?;

    if run_ids.is_empty() {
        println!("No stored runs.");
        return Ok(());
    }

    println!("📋 Stored runs:");
    for run_id in run_ids {
        match store.load(&run_id).await? {
            Some(record) => {
                let marker = match record.status {
                    RunStatus::Completed => "✅",
                    RunStatus::AwaitingApproval => "⏸️",
                    RunStatus::Failed { .. } => "❌",
                    _ => "🔄",
                };
                println!(
                    "  {} {} [{}] {}",
                    marker, record.run_id, record.status, record.state.topic
                );
            }
            None => println!("  ❓ {}", run_id),
        }
    }

    Ok(())
}

fn handle_config(
    explicit_path: Option<&PathBuf>,
    show: bool,
    init: bool,
) -> anyhow::Result<()> {
    if init {
        let path = explicit_path.cloned().unwrap_or_else(config_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        RunConfig::default().save_to_file(&path)?;
        println!("✅ Configuration initialized at: {:?}", path);
        println!("📝 Edit the file to customize models and the search provider.");
    }

    if show {
        let config = load_config(explicit_path, &RunOverrides::default())?;
        println!("📋 Effective configuration:");
        println!("{}", toml::to_string_pretty(&config)?);
    }

    if !init && !show {
        println!("Use --show or --init.");
    }

    Ok(())
}

fn prompt_user(prompt: &str) -> anyhow::Result<String> {
    use std::io::Write;

    print!("{}", prompt);
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input)
}
