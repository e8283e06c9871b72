//! CLI entrypoint for Grants Council
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use council_application::{Council, CouncilConfig, CouncilStore, TranscriptLogger};
use council_domain::{ObservationStatus, OutputFormat, Outcome, OutcomeResult, Severity, Side};
use council_infrastructure::{
    ConfigLoader, FileConfig, FileLoggingConfig, JsonFileStore, JsonlTranscriptLogger,
    OpenRouterGenerator,
};
use council_presentation::{
    Cli, Command, ConsoleFormatter, ProgressReporter, SimpleProgress, print_events,
};
use std::io::{IsTerminal, Read};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "grants-council.log";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        return Ok(());
    }

    let file_config = if cli.no_config {
        ConfigLoader::load_defaults()?
    } else {
        ConfigLoader::load(cli.config.as_deref())?
    };

    let _log_guard = init_logging(cli.verbose, &file_config.logging)?;
    info!("Starting Grants Council");

    let (council_config, mut issues) = file_config.to_council_config();
    issues.extend(council_config.validate());
    for issue in &issues {
        match issue.severity {
            Severity::Error => tracing::error!("{}", issue),
            Severity::Warning => warn!("{}", issue),
        }
    }
    if CouncilConfig::has_errors(&issues) {
        let errors: Vec<String> = issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .map(|i| i.message.clone())
            .collect();
        bail!("invalid configuration: {}", errors.join("; "));
    }

    if !file_config.output.color {
        colored::control::set_override(false);
    }
    let format: OutputFormat = cli
        .output
        .map(Into::into)
        .or(file_config.output.format)
        .unwrap_or_default();

    let Some(command) = cli.command else {
        bail!("No command given. Run with --help for the list of commands.");
    };

    // === Dependency Injection ===
    let generator = Arc::new(build_generator(&file_config, generates(&command))?);
    let store: Arc<dyn CouncilStore> = Arc::new(
        JsonFileStore::open(&file_config.storage.data_dir)
            .await
            .with_context(|| {
                format!("opening data directory {}", file_config.storage.data_dir.display())
            })?,
    );
    let council = match file_config.logging.transcript.as_deref().and_then(JsonlTranscriptLogger::new) {
        Some(logger) => {
            info!("Writing transcript to {}", logger.path().display());
            let transcript: Arc<dyn TranscriptLogger> = Arc::new(logger);
            Council::with_transcript_logger(generator, store, council_config, transcript)
        }
        None => Council::new(generator, store, council_config),
    };

    run(&council, command, format, cli.quiet).await
}

/// Whether `command` calls the text-generation backend
fn generates(command: &Command) -> bool {
    matches!(command, Command::Submit { .. } | Command::Learn { .. })
}

fn build_generator(config: &FileConfig, required: bool) -> Result<OpenRouterGenerator> {
    if required {
        return Ok(OpenRouterGenerator::new(&config.backend)?);
    }
    let api_key = config.backend.resolve_api_key().unwrap_or_default();
    Ok(OpenRouterGenerator::with_api_key(&config.backend, api_key)?)
}

fn init_logging(verbose: u8, config: &FileLoggingConfig) -> Result<Option<WorkerGuard>> {
    // Initialize logging based on verbosity level
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(level));

    let (file_layer, guard) = match &config.file_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_filter(EnvFilter::new(if verbose == 0 { "info" } else { level }));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    Ok(guard)
}

async fn run(
    council: &Council<OpenRouterGenerator>,
    command: Command,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    match command {
        Command::Submit { file, stream } => {
            let content = read_submission(file.as_deref()).await?;
            if stream {
                let terminal = print_events(council.submit_streaming(content), &mut std::io::stdout())
                    .await?;
                match terminal {
                    Some(event) if event.kind == council_domain::EventKind::Error => {
                        bail!("pipeline failed: {}", event.payload["message"].as_str().unwrap_or("unknown error"))
                    }
                    Some(_) => {}
                    None => bail!("pipeline ended without a terminal event"),
                }
                return Ok(());
            }

            let result = if quiet {
                council.submit(content).await?
            } else if std::io::stderr().is_terminal() {
                council.submit_with_progress(content, &ProgressReporter::new()).await?
            } else {
                council.submit_with_progress(content, &SimpleProgress).await?
            };
            emit(format, || ConsoleFormatter::format_run(&result), || {
                ConsoleFormatter::format_run_json(&result)
            });
        }

        Command::Show { proposal } => {
            let view = council.get_proposal(&proposal).await?;
            emit(format, || ConsoleFormatter::format_proposal(&view), || {
                ConsoleFormatter::format_proposal_json(&view)
            });
        }

        Command::Decide(args) => {
            let verdict = if args.approve { Side::Approve } else { Side::Reject };
            let result = council
                .record_human_decision(&args.proposal, verdict, args.notes)
                .await?;
            emit(format, || ConsoleFormatter::format_decision(&result), || {
                ConsoleFormatter::format_decision_json(&result)
            });
        }

        Command::Outcome(args) => {
            let result: OutcomeResult = args.result.parse()?;
            let mut outcome = Outcome::new(result).with_notes(args.notes);
            if let Some(completion) = args.completion {
                outcome = outcome.with_completion(completion);
            }
            if let Some(quality) = args.quality {
                outcome = outcome.with_quality(quality);
            }
            let event = council.record_outcome(&args.proposal, outcome).await?;
            emit(format, || ConsoleFormatter::format_learning_event(&event), || {
                ConsoleFormatter::to_json(&event)
            });
        }

        Command::ConfirmTeam(args) => {
            let profile = if args.new { None } else { args.team.as_deref() };
            let proposal = council.confirm_team(&args.proposal, profile).await?;
            emit(format, || ConsoleFormatter::format_team_confirmation(&proposal), || {
                ConsoleFormatter::to_json(&proposal)
            });
        }

        Command::Teams => {
            let teams = council.list_teams().await?;
            emit(format, || ConsoleFormatter::format_teams(&teams), || {
                ConsoleFormatter::to_json(&teams)
            });
        }

        Command::Observations { persona, status } => {
            let status: Option<ObservationStatus> = status.as_deref().map(str::parse).transpose()?;
            let observations = council.list_observations(persona.as_deref(), status).await?;
            emit(format, || ConsoleFormatter::format_observations(&observations), || {
                ConsoleFormatter::to_json(&observations)
            });
        }

        Command::ApproveObservation { id } => {
            let observation = council.approve_observation(&id).await?;
            emit(format, || ConsoleFormatter::format_observation(&observation), || {
                ConsoleFormatter::to_json(&observation)
            });
        }

        Command::DeprecateObservation { id } => {
            let observation = council.deprecate_observation(&id).await?;
            emit(format, || ConsoleFormatter::format_observation(&observation), || {
                ConsoleFormatter::to_json(&observation)
            });
        }

        Command::Learn { event: Some(event_id) } => {
            let receipt = council.process_learning_event(&event_id).await?;
            emit(format, || ConsoleFormatter::format_receipt(&receipt), || {
                ConsoleFormatter::to_json(&receipt)
            });
        }

        Command::Learn { event: None } => {
            let batch = council.process_pending_learning().await?;
            emit(format, || ConsoleFormatter::format_learning_batch(&batch), || {
                ConsoleFormatter::format_learning_batch_json(&batch)
            });
        }

        Command::Personas => {
            let personas = &council.config().personas;
            emit(format, || ConsoleFormatter::format_personas(personas), || {
                ConsoleFormatter::to_json(personas)
            });
        }
    }

    Ok(())
}

/// Read the application from `path`, or from stdin when no path is given
async fn read_submission(path: Option<&Path>) -> Result<String> {
    let content = match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            if std::io::stdin().is_terminal() {
                bail!("No application given. Pass a file or pipe the application on stdin.");
            }
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("reading application from stdin")?;
            buffer
        }
    };
    if content.trim().is_empty() {
        bail!("The application is empty.");
    }
    Ok(content)
}

fn emit(format: OutputFormat, text: impl FnOnce() -> String, json: impl FnOnce() -> String) {
    match format {
        OutputFormat::Text => print!("{}", text()),
        OutputFormat::Json => println!("{}", json()),
    }
}
