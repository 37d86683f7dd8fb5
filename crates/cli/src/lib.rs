pub mod commands;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use rfqmatch_core::{EngineConfig, LoadOptions, LogFormat, LoggingConfig};

use crate::commands::reconcile::ReconcileArgs;

#[derive(Debug, Parser)]
#[command(
    name = "rfqmatch",
    about = "RFQ reconciliation operator CLI",
    long_about = "Match extracted RFQ line items against a product catalog, review pricing \
                  insight, and emit reconciled quote line items.",
    after_help = "Examples:\n  rfqmatch reconcile --catalog catalog.json --candidates rfq.json\n  rfqmatch reconcile --catalog catalog.json --candidates rfq.json --auto-apply 0.6 --finalize\n  rfqmatch config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run a candidate batch through matching and pricing, emitting JSON results")]
    Reconcile {
        #[arg(long, help = "Catalog entries JSON file")]
        catalog: PathBuf,
        #[arg(long, help = "Cross-reference mappings JSON file")]
        cross_references: Option<PathBuf>,
        #[arg(long, help = "Extracted candidates JSON file")]
        candidates: PathBuf,
        #[arg(long, help = "Customer id for history-based pricing opportunities")]
        customer: Option<String>,
        #[arg(long, help = "Bulk-apply matches at or above this confidence")]
        auto_apply: Option<f64>,
        #[arg(long, help = "Finalize the session and emit the handoff payload")]
        finalize: bool,
        #[arg(long, help = "Engine config TOML file")]
        config: Option<PathBuf>,
    },
    #[command(about = "Inspect effective engine configuration values")]
    Config {
        #[arg(long, help = "Engine config TOML file")]
        config: Option<PathBuf>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging from the effective config before any other work.
    // A broken config file still gets default logging so the command can
    // report the load error itself.
    let logging = EngineConfig::load(LoadOptions {
        config_path: cli.command.config_path().map(PathBuf::from),
        require_file: false,
    })
    .map(|config| config.logging)
    .unwrap_or_default();
    init_tracing(&logging);

    let result = match cli.command {
        Command::Reconcile {
            catalog,
            cross_references,
            candidates,
            customer,
            auto_apply,
            finalize,
            config,
        } => commands::reconcile::run(ReconcileArgs {
            catalog,
            cross_references,
            candidates,
            customer,
            auto_apply,
            finalize,
            config_path: config,
        }),
        Command::Config { config } => commands::config::run(config),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

impl Command {
    fn config_path(&self) -> Option<&Path> {
        match self {
            Command::Reconcile { config, .. } | Command::Config { config } => config.as_deref(),
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    // RUST_LOG wins over the configured level when set.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(logging.level.clone()));
    // Results go to stdout; diagnostics stay on stderr.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let _ = match logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use clap::Parser;
    use rfqmatch_core::{LogFormat, LoggingConfig};

    use super::{init_tracing, Cli};

    #[test]
    fn logging_init_reads_the_subcommand_config_path() {
        let cli = Cli::parse_from([
            "rfqmatch",
            "reconcile",
            "--catalog",
            "catalog.json",
            "--candidates",
            "rfq.json",
            "--config",
            "engine.toml",
        ]);
        assert_eq!(cli.command.config_path(), Some(Path::new("engine.toml")));

        let cli = Cli::parse_from(["rfqmatch", "config", "--config", "engine.toml"]);
        assert_eq!(cli.command.config_path(), Some(Path::new("engine.toml")));
    }

    #[test]
    fn tracing_init_accepts_every_configured_format() {
        // Only the first call installs a subscriber; the rest exercise the
        // remaining format arms through try_init's no-op path.
        for format in [LogFormat::Compact, LogFormat::Pretty, LogFormat::Json] {
            init_tracing(&LoggingConfig { level: "debug".to_string(), format });
        }
    }
}
