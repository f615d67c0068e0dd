//! CLI entrypoint for agent-council
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod console;

use anyhow::{Result, anyhow, bail};
use clap::{Parser, ValueEnum};
use console::{ConsoleProgress, ReportFormatter};
use council_application::{
    DeliberationProgress, NoRunStore, ProviderRegistry, RunController, RunDeliberationInput,
    RunDeliberationUseCase, RunStore,
};
use council_domain::validate_agents;
use council_infrastructure::{
    ClaudeProvider, CodexProvider, ConfigLoader, CopilotModelGateway, CopilotProvider,
    GeminiProvider, JsonlRunStore, StaticPricingSource, copilot,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Full report: responses, rankings, synthesis, notes
    Full,
    /// Only the final synthesis text
    Synthesis,
    /// The whole run as pretty-printed JSON
    Json,
}

#[derive(Parser)]
#[command(
    name = "agent-council",
    version,
    about = "Give one task to a council of AI coding agents: they compete, a judge panel ranks the anonymized answers, and a chairman synthesizes the result"
)]
struct Cli {
    /// The task to deliberate on
    prompt: Option<String>,

    /// Path to a configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Ignore configuration files and use built-in defaults
    #[arg(long)]
    no_config: bool,

    /// Attach an image (repeatable; only some backends accept them)
    #[arg(short, long, value_name = "FILE")]
    image: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Full)]
    output: OutputFormat,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,

    /// Show per-agent tool calls and status events while running
    #[arg(long)]
    show_events: bool,

    /// List the models each installed backend offers, then exit
    #[arg(long)]
    list_models: bool,

    /// Append the finished run to this JSONL file (overrides config)
    #[arg(long, value_name = "FILE")]
    record: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    // Logs share stderr with progress; stdout carries only the report.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow!("configuration error: {e}"))?
    };

    // === Dependency Injection ===
    let registry = Arc::new(
        ProviderRegistry::new()
            .register(Arc::new(ClaudeProvider::new()))
            .register(Arc::new(CodexProvider::new()))
            .register(Arc::new(GeminiProvider::new()))
            .register(Arc::new(CopilotProvider::new())),
    );

    if cli.list_models {
        for (kind, model) in registry.discover_all_models().await {
            println!("{kind}\t{model}");
        }
        return Ok(());
    }

    let prompt = match cli.prompt {
        Some(p) => p,
        None => bail!("A task is required. Pass it as the first argument."),
    };

    let agents = config
        .agent_configs()
        .map_err(|e| anyhow!("invalid agent configuration: {e}"))?;
    for issue in validate_agents(&agents) {
        warn!("{}", issue.message);
    }

    let store: Arc<dyn RunStore> = cli
        .record
        .or_else(|| config.run.record_path.clone())
        .and_then(|path| JsonlRunStore::new(&path))
        .map(|s| Arc::new(s) as Arc<dyn RunStore>)
        .unwrap_or_else(|| Arc::new(NoRunStore));

    // Build input
    let mut input = RunDeliberationInput::new(prompt, agents)
        .with_judges(config.judges.models.clone(), config.chairman.model.clone());
    input.images = cli.image;
    if let Some(ms) = config.run.chunk_flush_ms {
        input.chunk_flush = Duration::from_millis(ms);
    }

    // Ctrl-C cancels the whole run; agents settle as Cancelled.
    let controller = Arc::new(RunController::new());
    {
        let controller = controller.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\ninterrupted; stopping agents");
                controller.cancel();
            }
        });
    }

    let quiet = cli.quiet || cli.output != OutputFormat::Full;
    let progress: Arc<dyn DeliberationProgress> =
        Arc::new(ConsoleProgress::new(quiet, cli.show_events));

    // Create use case with injected adapters
    let use_case = RunDeliberationUseCase::new(
        registry,
        Arc::new(CopilotModelGateway::new()),
        Arc::new(StaticPricingSource::new()),
        store,
    );

    let outcome = use_case.execute(input, progress, controller).await;

    // Stop the shared copilot server regardless of how the run ended.
    copilot::shutdown_shared().await;

    let run = outcome?;

    // Output results
    let report = match cli.output {
        OutputFormat::Full => ReportFormatter::format(&run),
        OutputFormat::Synthesis => ReportFormatter::format_synthesis_only(&run),
        OutputFormat::Json => ReportFormatter::format_json(&run),
    };
    print!("{report}");

    Ok(())
}
