//! autostage: command-line front end for the builtin overlay.

use std::path::PathBuf;

use autostage_cli::commands::{self, EvalRequest};
use autostage_cli::config::AutostageConfig;
use autostage_cli::CliError;
use clap::{Parser as ClapParser, Subcommand};
use tracing_subscriber::EnvFilter;

fn red(s: &str) -> String {
    format!("\x1b[31m{}\x1b[0m", s)
}

#[derive(ClapParser)]
#[command(name = "autostage", version, about = "Evaluate builtin calls natively or staged")]
struct Cli {
    /// Config file (default: nearest autostage.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression or `;`-separated statements
    Eval {
        /// Source to evaluate
        #[arg()]
        source: String,

        /// Bind a host value: NAME=JSON
        #[arg(long = "let", value_name = "NAME=JSON")]
        lets: Vec<String>,

        /// Declare a staged placeholder: NAME:DTYPE:DIMS (`?` unknown size,
        /// `*` unknown rank, empty for a scalar)
        #[arg(long = "placeholder", value_name = "NAME:DTYPE:DIMS")]
        placeholders: Vec<String>,

        /// Feed a placeholder when running a staged result: NAME=JSON
        #[arg(long = "feed", value_name = "NAME=JSON")]
        feeds: Vec<String>,
    },
    /// List the builtins that have overloads
    Builtins,
}

fn init_logging(config: &AutostageConfig) {
    let filter = config.log_filter(std::env::var("RUST_LOG").ok());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = AutostageConfig::load(cli.config.as_deref())?;
    init_logging(&config);
    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Commands::Eval {
            source,
            lets,
            placeholders,
            feeds,
        } => {
            let request = EvalRequest {
                source,
                lets,
                placeholders,
                feeds,
            };
            commands::eval(&request, &config, &mut stdout)
        }
        Commands::Builtins => commands::builtins(&mut stdout),
    }
}

fn main() {
    if let Err(e) = run(Cli::parse()) {
        eprintln!("{} {}", red("error:"), e);
        std::process::exit(1);
    }
}
