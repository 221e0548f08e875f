//! formctl
//!
//! Command-line front end for form definitions: structural validation,
//! diagnostics, formula evaluation, sales-grid summaries and prefill.
//!
//! # Usage
//!
//! ```bash
//! formctl validate intake.json
//! formctl diagnose intake.json --format json
//! formctl eval "{price} * {qty}" --var price=12.5 --var qty=3
//! formctl grid comps.json --formula sum --rows sale_price,adjustments --column 0
//! formctl prefill intake.json --context ctx.json --key 42
//! formctl submit intake.json answers.json
//! formctl settings set branding '{"company":"Acme"}'
//! ```

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

#[derive(Parser)]
#[command(name = "formctl")]
#[command(author = "OpenSASE")]
#[command(version)]
#[command(about = "OpenSASE Forms command line interface", long_about = None)]
struct Cli {
    /// Output format
    #[arg(long, short, env = "FORMCTL_FORMAT")]
    format: Option<output::OutputFormat>,

    /// Profile name from config file
    #[arg(long, short)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a form structure
    Validate {
        /// Form definition (JSON or YAML)
        file: String,
    },
    /// Run full diagnostics on a form structure
    Diagnose {
        file: String,
        /// Exit non-zero when the report is not `passed`
        #[arg(long)]
        strict: bool,
    },
    /// Evaluate a formula
    Eval {
        expression: String,
        /// Bindings as name=value
        #[arg(long = "var", short)]
        vars: Vec<String>,
    },
    /// Compute a sales-grid summary row
    Grid {
        /// Grid rows (JSON or YAML)
        file: String,
        #[arg(long, value_enum, default_value = "sum")]
        formula: commands::grid::FormulaKind,
        /// Expression for `--formula custom`
        #[arg(long)]
        expression: Option<String>,
        /// Target row IDs, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        rows: Vec<String>,
        /// `subject` or a zero-based comparable index
        #[arg(long, default_value = "subject")]
        column: String,
    },
    /// Resolve prefill values for every configured field
    Prefill {
        file: String,
        /// Context object for `internal` sources
        #[arg(long)]
        context: Option<String>,
        /// Named lookup tables as one JSON object
        #[arg(long)]
        lookups: Option<String>,
        /// Value substituted for `:id` in API endpoints
        #[arg(long)]
        key: Option<String>,
    },
    /// Validate submitted values against a form
    Submit {
        file: String,
        /// Submitted values keyed by field ID
        values: String,
        /// Carryforward rules applied before validation
        #[arg(long)]
        carryforward: Option<String>,
    },
    /// Manage application settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommands,
    },
    /// Configure CLI
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Get a setting
    Get { key: String },
    /// Set a setting; the value is parsed as JSON, falling back to a string
    Set { key: String, value: String },
    /// List all settings
    List,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set configuration value
    Set { key: String, value: String },
    /// Get configuration value
    Get { key: String },
    /// List all configuration
    List,
    /// Initialize configuration
    Init,
}

/// Log level when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str = "warn";

fn log_filter(env: Option<String>) -> String {
    env.filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(log_filter(
            std::env::var("RUST_LOG").ok(),
        )))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = config::Config::load(cli.profile.as_deref()).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "config not readable, using defaults");
        config::Config::default()
    });
    let format = cli.format.unwrap_or_else(|| config.output_format());

    let result = match cli.command {
        Commands::Validate { file } => commands::validate::handle(&file, format),
        Commands::Diagnose { file, strict } => commands::diagnose::handle(&file, strict, format),
        Commands::Eval { expression, vars } => commands::eval::handle(&expression, &vars, format),
        Commands::Grid { file, formula, expression, rows, column } => {
            commands::grid::handle(&file, formula, expression, &rows, &column, format)
        }
        Commands::Prefill { file, context, lookups, key } => {
            commands::prefill::handle(&config, &file, context, lookups, key, format).await
        }
        Commands::Submit { file, values, carryforward } => {
            commands::submit::handle(&file, &values, carryforward, format)
        }
        Commands::Settings { action } => commands::settings::handle(action, &config, format).await,
        Commands::Config { action } => commands::config::handle(action, cli.profile.as_deref()),
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_defaults_to_warn() {
        assert_eq!(log_filter(None), "warn");
        assert_eq!(log_filter(Some("  ".into())), "warn");
        assert_eq!(log_filter(Some("forms_prefill=debug".into())), "forms_prefill=debug");
    }
}
