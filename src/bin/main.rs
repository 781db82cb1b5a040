//! Maniac CLI - views, migrations and configuration
//!
//! Usage:
//!   maniac view render <name> [--data <json>]
//!   maniac view compile <name>
//!   maniac view clear
//!   maniac migrate
//!   maniac config show
//!
//! Every command accepts `--config <path>` and `--verbose`. Log output is
//! filtered with `MANIAC_LOG` (default `warn`).
//!
//! Examples:
//!   maniac view render pages.home --data '{"user": {"name": "Ada"}}'
//!   maniac --config app/maniac.toml migrate

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand};
use maniac::config::Settings;
use maniac::db;
use maniac::schema::{Migrator, Schema};
use maniac::view::{NiacEngine, ViewError};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "maniac")]
#[command(about = "Maniac - views, migrations and configuration for a Maniac application")]
#[command(version)]
struct Cli {
    /// Path to maniac.toml (defaults to MANIAC_CONFIG, then ./maniac.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Work with Niac views
    View {
        #[command(subcommand)]
        command: ViewCommand,
    },

    /// Prepare the migrations table and show applied migrations
    Migrate,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ViewCommand {
    /// Render a view to stdout
    Render {
        /// Dotted view name, e.g. pages.home or mail::welcome
        name: String,

        /// View data as a JSON object
        #[arg(short, long)]
        data: Option<String>,
    },

    /// Compile a view into the cache and print the cache path
    Compile {
        /// Dotted view name
        name: String,
    },

    /// Delete every compiled view
    Clear,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective settings as TOML
    Show,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::View { command } => cmd_view(&settings, command),
        Commands::Migrate => cmd_migrate(&settings),
        Commands::Config {
            command: ConfigCommand::Show,
        } => cmd_config_show(&settings),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("MANIAC_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_view(settings: &Settings, command: ViewCommand) -> ExitCode {
    let engine = match NiacEngine::from_settings(settings) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error opening view engine: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match command {
        ViewCommand::Render { name, data } => {
            let data = match data.as_deref().map(serde_json::from_str::<serde_json::Value>).transpose() {
                Ok(data) => data.unwrap_or_else(|| serde_json::json!({})),
                Err(e) => {
                    eprintln!("Invalid --data JSON: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            match engine.render(&name, &data) {
                Ok(html) => {
                    print!("{}", html);
                    ExitCode::SUCCESS
                }
                Err(e) => report_view_error(&e),
            }
        }
        ViewCommand::Compile { name } => match engine.compile(&name) {
            Ok(path) => {
                println!("{}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => report_view_error(&e),
        },
        ViewCommand::Clear => match engine.cache().clear() {
            Ok(count) => {
                println!(
                    "Removed {} compiled view(s) from {}",
                    count,
                    engine.cache().dir().display()
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error clearing view cache: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}

/// Print a view error, with a source excerpt when it points into a template.
fn report_view_error(error: &ViewError) -> ExitCode {
    let (path, span, message) = match error {
        ViewError::Syntax {
            path,
            span,
            message,
            ..
        } => (path, span.clone(), message.clone()),
        ViewError::MismatchedSection {
            path,
            span,
            directive,
            ..
        } => (path, span.clone(), format!("mismatched @{}", directive)),
        other => {
            eprintln!("Error: {}", other);
            return ExitCode::FAILURE;
        }
    };

    match std::fs::read_to_string(path) {
        Ok(source) => print_diagnostic(path, &source, span, &error.to_string(), &message),
        Err(_) => eprintln!("Error: {}", error),
    }
    ExitCode::FAILURE
}

fn print_diagnostic(
    path: &Path,
    source: &str,
    span: std::ops::Range<usize>,
    title: &str,
    label: &str,
) {
    let id = path.display().to_string();
    let span = span.start.min(source.len())..span.end.min(source.len());
    let printed = Report::build(ReportKind::Error, (id.as_str(), span.clone()))
        .with_message(title)
        .with_label(
            Label::new((id.as_str(), span))
                .with_message(label)
                .with_color(Color::Red),
        )
        .finish()
        .eprint((id.as_str(), Source::from(source)));
    if printed.is_err() {
        eprintln!("Error: {}", title);
    }
}

fn cmd_migrate(settings: &Settings) -> ExitCode {
    let db = match db::connect(&settings.database) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Error connecting to database '{}': {}", settings.database.path, e);
            return ExitCode::FAILURE;
        }
    };

    let status = Migrator::new(Schema::new(db)).and_then(|migrator| migrator.status());
    match status {
        Ok(records) if records.is_empty() => {
            println!("No migrations have been run.");
            ExitCode::SUCCESS
        }
        Ok(records) => {
            println!("{:<6} {:<6} Migration", "Id", "Batch");
            for record in records {
                println!("{:<6} {:<6} {}", record.id, record.batch, record.migration);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Migration error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_config_show(settings: &Settings) -> ExitCode {
    match settings.to_toml() {
        Ok(toml) => {
            print!("{}", toml);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error serializing configuration: {}", e);
            ExitCode::FAILURE
        }
    }
}
