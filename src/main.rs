// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

use babelgate::app_config::{self, Config};
use babelgate::app_controller::Controller;
use babelgate::translation::{DetectRequest, TranslateRequest};

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

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate texts through the configured services
    Translate {
        /// Texts to translate
        #[arg(value_name = "TEXT", required = true)]
        texts: Vec<String>,

        /// Source language code (e.g., 'de', 'fr'); detected by the service when omitted
        #[arg(short, long)]
        source: Option<String>,

        /// Target language code (e.g., 'en')
        #[arg(short, long)]
        target: String,

        /// Service id to use instead of the mapping or default service
        #[arg(long)]
        service: Option<String>,

        /// Service id used for texts the first service left untranslated
        #[arg(long)]
        fallback: Option<String>,

        /// Bypass the translation cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Detect the language of texts
    Detect {
        /// Texts to analyse
        #[arg(value_name = "TEXT", required = true)]
        texts: Vec<String>,

        /// Language hint
        #[arg(short, long)]
        lang: Option<String>,

        /// Detection service id
        #[arg(long)]
        service: Option<String>,

        /// Detection service used when the first one fails
        #[arg(long)]
        fallback: Option<String>,
    },

    /// Remove every cached translation from the store
    ClearCache,

    /// Deliver an eTranslation success callback, as the webhook would
    Callback {
        /// External reference the request was submitted with
        #[arg(long)]
        external_reference: String,

        /// Translated text of an inline request
        #[arg(long)]
        translated_text: Option<String>,

        /// Raw body of a document request
        #[arg(long)]
        body: Option<String>,
    },

    /// Deliver an eTranslation error callback, as the webhook would
    ErrorCallback {
        #[arg(long)]
        external_reference: String,

        #[arg(long)]
        error_code: Option<String>,

        #[arg(long)]
        error_message: Option<String>,
    },

    /// Generate shell completions for babelgate
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// babelgate - translation gateway
///
/// Routes translation and language detection requests to heterogeneous
/// backends, with caching, fallback services and a synchronous bridge over
/// the asynchronous eTranslation service.
#[derive(Parser, Debug)]
#[command(name = "babelgate")]
#[command(version)]
#[command(about = "Translation gateway with routing, caching and fallback")]
#[command(long_about = "babelgate routes translation and language detection requests to the configured services.

EXAMPLES:
    babelgate translate -s de -t en 'Das ist mein Hund.'        # Translate with the mapped or default service
    babelgate translate -t en --service google 'Bonjour'         # Use a specific service
    babelgate translate -s de -t en --fallback dummy 'Hallo'     # Retry untranslated texts with another service
    babelgate detect 'Das ist mein Hund.' 'This is my dog.'      # Detect languages
    babelgate clear-cache                                        # Empty the translation cache
    babelgate completions bash > babelgate.bash                  # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: PathBuf,

    /// Set logging level
    #[arg(long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    fn get_color_for_level(level: Level) -> &'static str {
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
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts everything; the effective level is set through max_level
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "babelgate", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(cmd_log_level) = &cli.log_level {
        let log_level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(log_level.into());
    }

    let config = Config::load_or_create(&cli.config_path)?;
    if cli.log_level.is_none() {
        log::set_max_level(config.log_level.into());
    }

    let controller = Controller::with_config(config).await?;
    run_command(&controller, cli.command).await
}

async fn run_command(controller: &Controller, command: Commands) -> Result<()> {
    match command {
        Commands::Translate {
            texts,
            source,
            target,
            service,
            fallback,
            no_cache,
        } => {
            let request = TranslateRequest {
                source,
                target: Some(target),
                text: texts,
                service,
                fallback,
                caching: !no_cache,
            };
            print_json(&controller.translate(&request).await?)
        }
        Commands::Detect {
            texts,
            lang,
            service,
            fallback,
        } => {
            let request = DetectRequest {
                text: texts,
                lang,
                service,
                fallback,
            };
            print_json(&controller.detect(&request).await?)
        }
        Commands::ClearCache => controller.clear_cache().await,
        Commands::Callback {
            external_reference,
            translated_text,
            body,
        } => {
            let receivers = controller
                .ingress()
                .on_translation_callback(Some(&external_reference), translated_text.as_deref(), body.as_deref())
                .await?;
            report_delivery(&external_reference, receivers);
            Ok(())
        }
        Commands::ErrorCallback {
            external_reference,
            error_code,
            error_message,
        } => {
            let receivers = controller
                .ingress()
                .on_error_callback(Some(&external_reference), error_code.as_deref(), error_message.as_deref())
                .await?;
            report_delivery(&external_reference, receivers);
            Ok(())
        }
        Commands::Completions { .. } => Err(anyhow!("Completions are generated before the controller starts")),
    }
}

fn report_delivery(external_reference: &str, receivers: usize) {
    if receivers == 0 {
        warn!("No request is waiting on {}", external_reference);
    } else {
        info!("Callback delivered to {} waiting request(s) on {}", receivers, external_reference);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let mut stdout = std::io::stdout();
    writeln!(stdout, "{}", json)?;
    Ok(())
}
