// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use pagetran::app_config::{self, Config, ExhaustedPolicy};
use pagetran::app_controller::Controller;
use pagetran::document_processor::PageRange;
use pagetran::errors::DispatchError;
use pagetran::providers::mock::MockClient;
use pagetran::translation::AbortMode;

/// Exit status when the operator aborts the run
const EXIT_ABORTED: u8 = 2;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for ExhaustedPolicy to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliExhaustedPolicy {
    Prompt,
    Skip,
    Abort,
}

impl From<CliExhaustedPolicy> for ExhaustedPolicy {
    fn from(cli_policy: CliExhaustedPolicy) -> Self {
        match cli_policy {
            CliExhaustedPolicy::Prompt => ExhaustedPolicy::Prompt,
            CliExhaustedPolicy::Skip => ExhaustedPolicy::Skip,
            CliExhaustedPolicy::Abort => ExhaustedPolicy::Abort,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a paged text document (default command)
    Translate(TranslateArgs),

    /// Generate shell completions for pagetran
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args, Debug)]
struct TranslateArgs {
    /// Input text document, pages separated by form feeds
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Source language name or ISO code (e.g., 'English', 'en')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language name or ISO code (e.g., 'Farsi', 'fa')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Chat completions endpoint URL
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: PathBuf,

    /// Output directory (defaults to the input file's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Inclusive page range to translate (e.g., '3-17')
    #[arg(short, long)]
    pages: Option<PageRange>,

    /// Number of batches translated concurrently
    #[arg(long)]
    concurrency: Option<usize>,

    /// What to do when a batch exhausts its retries
    #[arg(long, value_enum)]
    on_exhausted: Option<CliExhaustedPolicy>,

    /// Keep finished batches and write partial output when aborting
    #[arg(long)]
    graceful_abort: bool,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Use a local echo backend instead of the configured endpoint
    #[arg(long)]
    dry_run: bool,

    /// Only test the connection to the backend
    #[arg(long, conflicts_with = "dry_run")]
    check: bool,
}

/// pagetran - batch translation of paged documents with an LLM backend
#[derive(Parser, Debug)]
#[command(name = "pagetran")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
#[command(about = "Translate paged documents through an OpenAI-compatible backend")]
#[command(long_about = "pagetran splits a document into page batches, translates them concurrently through an \
OpenAI-compatible chat completions endpoint and writes a side-by-side Markdown document.

EXAMPLES:
    pagetran report.txt                          # Translate using default config
    pagetran -s en -t fa report.txt              # Translate from English to Farsi
    pagetran --pages 3-17 report.txt             # Translate pages 3 to 17 only
    pagetran --on-exhausted skip report.txt      # Never ask, skip failing batches
    pagetran --dry-run report.txt                # Exercise the pipeline offline
    pagetran --check                             # Test the backend connection
    pagetran completions bash > pagetran.bash    # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger::new(level)))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let color = Self::color_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "{}{} {:<5} {}\x1B[0m",
                color,
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // The logger accepts everything, the effective level is set via set_max_level
    if CustomLogger::init(LevelFilter::Trace).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }

    let cli = CommandLineOptions::parse();

    let result = match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "pagetran", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => run_translate(cli.translate).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(aborted) = e.downcast_ref::<DispatchError>() {
                error!("{}, no output written", aborted);
                return ExitCode::from(EXIT_ABORTED);
            }
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Apply command line overrides on top of the file configuration
fn apply_overrides(config: &mut Config, options: &TranslateArgs) {
    if let Some(source_language) = &options.source_language {
        config.source_language = source_language.clone();
    }
    if let Some(target_language) = &options.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(model) = &options.model {
        config.backend.model = model.clone();
    }
    if let Some(endpoint) = &options.endpoint {
        config.backend.endpoint = endpoint.clone();
    }
    if let Some(concurrency) = options.concurrency {
        config.batching.concurrent_requests = concurrency;
    }
    if let Some(policy) = &options.on_exhausted {
        config.on_exhausted = policy.clone().into();
    }
    if options.graceful_abort {
        config.abort_mode = AbortMode::Graceful;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    // Apply a command line log level before the config is read
    if let Some(cli_level) = &options.log_level {
        let level: app_config::LogLevel = cli_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&options.config_path)?;
    apply_overrides(&mut config, &options);
    log::set_max_level(config.log_level.to_level_filter());

    let mut controller = Controller::with_config(config)?;

    if options.check {
        return controller.test_connection().await;
    }

    let input = options
        .input
        .as_deref()
        .ok_or_else(|| anyhow!("INPUT is required unless --check is given"))?;

    if options.dry_run {
        info!("Dry run: using the local echo backend");
        controller = controller.with_client(Arc::new(MockClient::working()));
    }

    match controller.run(input, options.output_dir.as_deref(), options.pages).await? {
        Some(report) if !report.summary.failed_pages.is_empty() => {
            info!(
                "Output written with {} untranslated page(s): {:?}",
                report.summary.failed_pages.len(),
                report.output_path
            );
        }
        Some(_) | None => {}
    }

    Ok(())
}
