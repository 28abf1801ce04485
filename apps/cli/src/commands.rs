//! CLI command definitions, routing, and tracing setup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use docs_toolchain_core::{
    DocumentContext, FaultPolicy, GitInfo, PipelineAborted, PipelineResult, PipelineRunner,
    Report, RunObserver, RunStatus, Toolchain, UnitKind, UnitReport, discover_documents,
};
use docs_toolchain_shared::{ToolchainConfig, content_path, load_config};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::plugins;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docs-toolchain: check and prepare documentation sources before a site build.
#[derive(Parser)]
#[command(
    name = "docs-toolchain",
    version,
    about = "Run pluggable checks and pre-build steps over documentation sources.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to $TOOLCHAIN_CONFIG, then <content>/toolchain.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Content directory (defaults to $CONTENT_PATH, then ./content).
    #[arg(long, global = true)]
    pub content: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Report output format.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub(crate) enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Flags shared by the stage commands.
#[derive(Args, Clone, Debug)]
pub(crate) struct StageArgs {
    /// Make unit faults fatal and stop at the first one. The env var takes
    /// any boolish value (1/0, yes/no, true/false).
    #[arg(
        long,
        env = "TOOLCHAIN_DEBUG",
        action = clap::ArgAction::SetTrue,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub debug: bool,

    /// List the registered units and exit without running them.
    #[arg(long)]
    pub list: bool,

    /// Report format.
    #[arg(long, default_value = "text")]
    pub format: ReportFormat,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run every extension against each document.
    Check {
        /// Document to check (repeatable). Overrides --index.
        #[arg(long = "file", value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Check this document and every file it includes.
        #[arg(long)]
        index: Option<PathBuf>,

        #[command(flatten)]
        stage: StageArgs,
    },

    /// Run every pre-build process once.
    Pre {
        #[command(flatten)]
        stage: StageArgs,
    },

    /// List all registered units.
    List,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so reports on
/// stdout stay machine-readable.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docs_toolchain=warn",
        1 => "docs_toolchain=info",
        2 => "docs_toolchain=debug",
        _ => "docs_toolchain=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Resolved per-invocation state.
struct Session {
    content: PathBuf,
    config: ToolchainConfig,
    toolchain: Toolchain,
}

impl Session {
    fn open(cli: &Cli) -> Result<Self> {
        let content = content_path(cli.content.as_deref())?;
        let config = load_config(cli.config.as_deref(), &content)?;
        let toolchain = Toolchain::from_manifest(&plugins::builtin(), &config);
        Ok(Self {
            content,
            config,
            toolchain,
        })
    }
}

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<ExitCode> {
    let mut session = Session::open(&cli)?;
    match cli.command {
        Command::Check {
            files,
            index,
            stage,
        } => cmd_check(&mut session, &files, index.as_deref(), &stage),
        Command::Pre { stage } => cmd_pre(&mut session, &stage),
        Command::List => {
            print_units(&session.toolchain, UnitKind::Extension);
            print_units(&session.toolchain, UnitKind::Process);
            Ok(exit(RunStatus::Listed))
        }
        Command::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", session.config.to_toml_string()?);
                Ok(ExitCode::SUCCESS)
            }
        },
    }
}

fn exit(status: RunStatus) -> ExitCode {
    // Exit codes are all small non-negative constants.
    ExitCode::from(status.exit_code() as u8)
}

fn print_units(toolchain: &Toolchain, kind: UnitKind) {
    let heading = match kind {
        UnitKind::Extension => "extensions",
        UnitKind::Process => "processes",
    };
    println!("{heading}:");
    for name in toolchain.list(kind) {
        println!("  {name}");
    }
}

// ---------------------------------------------------------------------------
// Stage handlers
// ---------------------------------------------------------------------------

fn cmd_check(
    session: &mut Session,
    files: &[PathBuf],
    index: Option<&Path>,
    stage: &StageArgs,
) -> Result<ExitCode> {
    if stage.list || stage.debug {
        print_units(&session.toolchain, UnitKind::Extension);
        if stage.list {
            return Ok(exit(RunStatus::Listed));
        }
    }

    let documents = resolve_documents(&session.content, files, index)?;
    info!(documents = documents.len(), "starting check stage");

    let policy = FaultPolicy::from_debug(stage.debug);
    let progress = CliProgress::new();
    let runner = PipelineRunner::new(&session.config, &session.content)
        .policy(policy)
        .observer(&progress);

    let mut total = PipelineResult::default();
    for path in &documents {
        let mut document = match DocumentContext::load(path) {
            Ok(document) => document,
            Err(e) if policy == FaultPolicy::Recover => {
                warn!(path = %path.display(), error = %e, "skipping unreadable document");
                progress.println(format!("skipped {}: {e}", path.display()));
                continue;
            }
            Err(e) => {
                progress.finish();
                return Err(e.into());
            }
        };
        let registry = session.toolchain.registry_mut(UnitKind::Extension);
        match runner.run(registry, &mut document) {
            Ok(result) => total.merge(result),
            Err(aborted) => {
                progress.finish();
                total.merge(aborted.partial);
                let aborted = PipelineAborted {
                    partial: total,
                    ..aborted
                };
                return fail(&session.content, aborted, stage.format);
            }
        }
    }

    progress.finish();
    finish(&session.content, &total, total.status(), stage.format)
}

fn cmd_pre(session: &mut Session, stage: &StageArgs) -> Result<ExitCode> {
    if stage.list || stage.debug {
        print_units(&session.toolchain, UnitKind::Process);
        if stage.list {
            return Ok(exit(RunStatus::Listed));
        }
    }
    info!("starting pre-processing stage");

    let mut attributes = BTreeMap::new();
    attributes.insert(
        "content_path".to_string(),
        session.content.to_string_lossy().into_owned(),
    );
    let mut document = DocumentContext::detached(attributes);

    let progress = CliProgress::new();
    let outcome = PipelineRunner::new(&session.config, &session.content)
        .policy(FaultPolicy::from_debug(stage.debug))
        .observer(&progress)
        .run(session.toolchain.registry_mut(UnitKind::Process), &mut document);
    progress.finish();

    match outcome {
        // A process that faulted fails the stage even when recovered.
        Ok(result) => finish(&session.content, &result, result.unit_status(), stage.format),
        Err(aborted) => fail(&session.content, aborted, stage.format),
    }
}

/// Documents to check: explicit files, else the index and its includes, else
/// every document under the content directory.
fn resolve_documents(
    content: &Path,
    files: &[PathBuf],
    index: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    if !files.is_empty() {
        return Ok(files.to_vec());
    }

    if let Some(index) = index {
        let document = DocumentContext::load(index)?;
        let mut documents = vec![index.to_path_buf()];
        for include in document.include_paths() {
            if include.is_file() {
                documents.push(include);
            } else {
                warn!(path = %include.display(), "included file not found");
            }
        }
        return Ok(documents);
    }

    if !content.is_dir() {
        return Err(eyre!(
            "content directory '{}' not found; pass --content or set CONTENT_PATH",
            content.display()
        ));
    }
    Ok(discover_documents(content)?)
}

fn print_report(report: &Report<'_>, format: ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Text => print!("{}", report.render_text()),
        ReportFormat::Json => println!("{}", report.to_json()?),
    }
    Ok(())
}

fn finish(
    content: &Path,
    result: &PipelineResult,
    status: RunStatus,
    format: ReportFormat,
) -> Result<ExitCode> {
    let mut report = Report::completed(GitInfo::generate(content), result);
    report.status = status;
    print_report(&report, format)?;
    Ok(exit(status))
}

/// Print what was gathered before the abort, then surface the fault.
fn fail(content: &Path, aborted: PipelineAborted, format: ReportFormat) -> Result<ExitCode> {
    let report = Report::aborted(GitInfo::generate(content), &aborted);
    print_report(&report, format)?;
    Err(aborted.into())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }

    fn println(&self, message: String) {
        self.spinner.println(message);
    }
}

impl RunObserver for CliProgress {
    fn document_started(&self, document: &str) {
        self.spinner.set_message(document.to_string());
    }

    fn unit_started(&self, kind: UnitKind, name: &str) {
        self.spinner.set_message(format!("[{kind}] {name}"));
    }

    fn unit_finished(&self, report: &UnitReport) {
        if let Some(fault) = &report.fault {
            self.println(format!("[{}] fault: {fault}", report.name));
        }
    }
}
