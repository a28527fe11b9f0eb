//! pagewatch CLI - Command-line interface for the pagewatch capture engine
//!
//! Commands:
//! - replay: Replay a recorded scenario into events (batch mode)
//! - run: Drive a tracker from timed signals on stdin (streaming mode)
//! - validate: Check a scenario before replaying it
//! - doctor: Diagnose configuration and environment

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use pagewatch::replay::{replay_into, Scenario};
use pagewatch::signal::TimedSignal;
use pagewatch::sink::{ConsoleSink, NdjsonSink};
use pagewatch::types::Event;
use pagewatch::{Document, PageTracker, TrackError, TrackerConfig, PAGEWATCH_VERSION, PRODUCER_NAME};

/// pagewatch - Behavioral telemetry capture for web pages
#[derive(Parser)]
#[command(name = "pagewatch")]
#[command(version = PAGEWATCH_VERSION)]
#[command(about = "Capture page interactions as structured events", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded scenario into events (batch mode)
    Replay {
        /// Scenario file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Tracker configuration overriding the scenario's own
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Drive a tracker from timed signals on stdin (streaming mode)
    Run {
        /// Page description file
        #[arg(short, long)]
        page: PathBuf,

        /// Tracker configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Page-ready instant (RFC 3339); defaults to the current time
        #[arg(long)]
        start: Option<String>,
    },

    /// Check a scenario before replaying it
    Validate {
        /// Scenario file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a tracker configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), PagewatchCliError> {
    match cli.command {
        Commands::Replay {
            input,
            output,
            output_format,
            config,
        } => cmd_replay(&input, &output, output_format, config.as_deref()),

        Commands::Run {
            page,
            config,
            start,
        } => cmd_run(&page, config.as_deref(), start.as_deref()),

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn cmd_replay(
    input: &Path,
    output: &Path,
    output_format: OutputFormat,
    config: Option<&Path>,
) -> Result<(), PagewatchCliError> {
    let mut scenario = Scenario::from_json(&read_input(input)?)?;

    if let Some(config_path) = config {
        scenario.config = TrackerConfig::from_json(&fs::read_to_string(config_path)?)?;
    }

    let session = replay_into(&scenario, Box::new(ConsoleSink::new()))?;
    log::info!(
        "session {} captured {} events",
        session.session_id(),
        session.event_count()
    );

    let output_data = format_output(session.events(), &output_format)?;

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_run(page: &Path, config: Option<&Path>, start: Option<&str>) -> Result<(), PagewatchCliError> {
    let document: Document = serde_json::from_str(&fs::read_to_string(page)?)?;

    let config = match config {
        Some(config_path) => TrackerConfig::from_json(&fs::read_to_string(config_path)?)?,
        None => TrackerConfig::default(),
    };

    let start = match start {
        Some(s) => parse_instant(s)?,
        None => Utc::now(),
    };

    let sink = NdjsonSink::new(io::stdout());
    let mut tracker = PageTracker::start(document, config, Box::new(sink), start)?;

    let stdin = io::stdin();
    for (index, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let timed: TimedSignal = serde_json::from_str(trimmed).map_err(|e| {
            PagewatchCliError::ParseError(format!("Failed to parse signal on line {}: {}", index + 1, e))
        })?;
        tracker.dispatch_timed(timed);
    }

    let end = tracker.now();
    let session = tracker.unload(end);
    log::info!(
        "session {} closed after {} events",
        session.session_id(),
        session.event_count()
    );

    Ok(())
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), PagewatchCliError> {
    let scenario = Scenario::from_json(&read_input(input)?)?;
    let issues = scenario.issues();

    let report = ValidationReport {
        elements: scenario.page.elements.len(),
        signals: scenario.signals.len(),
        valid: issues.is_empty(),
        issues,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Elements: {}", report.elements);
        println!("Signals:  {}", report.signals);
        println!("Valid:    {}", report.valid);

        if !report.issues.is_empty() {
            println!("\nIssues:");
            for issue in &report.issues {
                println!("  - {}", issue);
            }
        }
    }

    if report.valid {
        Ok(())
    } else {
        Err(PagewatchCliError::ValidationFailed(report.issues.len()))
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), PagewatchCliError> {
    let mut checks = vec![
        DoctorCheck {
            name: "pagewatch_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("pagewatch version {}", PAGEWATCH_VERSION),
        },
        check_config(config),
    ];

    // stdin mode decides whether `run` can stream
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (streaming mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: PAGEWATCH_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("pagewatch Doctor Report");
        println!("=======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(PagewatchCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn config_check(status: CheckStatus, message: String) -> DoctorCheck {
    DoctorCheck {
        name: "config".to_string(),
        status,
        message,
    }
}

fn check_config(config: Option<&Path>) -> DoctorCheck {
    let Some(path) = config else {
        return match TrackerConfig::default().validate() {
            Ok(()) => config_check(CheckStatus::Ok, "Using default configuration".to_string()),
            Err(e) => config_check(CheckStatus::Error, e.to_string()),
        };
    };

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return config_check(
                CheckStatus::Error,
                format!(
                    "Config file {} does not exist; replay and run will fail with IO_ERROR",
                    path.display()
                ),
            );
        }
        Err(e) => return config_check(CheckStatus::Error, format!("Cannot read config file: {}", e)),
    };

    match TrackerConfig::from_json(&content) {
        Ok(config) => config_check(
            CheckStatus::Ok,
            format!(
                "Config valid ({} view thresholds, marker class '{}')",
                config.view_thresholds.len(),
                config.track_class
            ),
        ),
        Err(e) => config_check(CheckStatus::Error, e.to_string()),
    }
}

fn read_input(input: &Path) -> Result<String, PagewatchCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>, PagewatchCliError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| PagewatchCliError::ParseError(format!("Invalid start instant '{}': {}", s, e)))
}

fn format_output(events: &[Event], format: &OutputFormat) -> Result<String, PagewatchCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for event in events {
                lines.push(serde_json::to_string(event)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(events)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(events)?),
    }
}

// Error types

#[derive(Debug)]
enum PagewatchCliError {
    Io(io::Error),
    Track(TrackError),
    Json(serde_json::Error),
    ValidationFailed(usize),
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for PagewatchCliError {
    fn from(e: io::Error) -> Self {
        PagewatchCliError::Io(e)
    }
}

impl From<TrackError> for PagewatchCliError {
    fn from(e: TrackError) -> Self {
        PagewatchCliError::Track(e)
    }
}

impl From<serde_json::Error> for PagewatchCliError {
    fn from(e: serde_json::Error) -> Self {
        PagewatchCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PagewatchCliError> for CliError {
    fn from(e: PagewatchCliError) -> Self {
        match e {
            PagewatchCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PagewatchCliError::Track(e) => {
                let (code, hint) = match &e {
                    TrackError::InvalidConfig(_) => ("CONFIG_ERROR", "Run 'pagewatch doctor --config <file>'"),
                    TrackError::InvalidScenario(_) => ("SCENARIO_ERROR", "Run 'pagewatch validate' for details"),
                    TrackError::ParseError(_) | TrackError::JsonError(_) => {
                        ("PARSE_ERROR", "Ensure input matches the scenario format")
                    }
                    _ => ("TRACK_ERROR", "Re-run with RUST_LOG=debug for details"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            PagewatchCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            PagewatchCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} scenario issues found", count),
                hint: Some("Fix validation issues and retry".to_string()),
            },
            PagewatchCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            PagewatchCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check input format".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    elements: usize,
    signals: usize,
    valid: bool,
    issues: Vec<String>,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Error,
}
