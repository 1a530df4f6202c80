use std::fmt;
use std::path::PathBuf;

use services::{AppServices, EnvOverrides};
use storage::DEFAULT_CONFIG_FILE;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

mod commands;
mod render;
mod repl;

use repl::Repl;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidConfigPath { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidConfigPath { raw } => write!(f, "invalid --config value: {raw:?}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  study-tutor [--config <path>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --config {DEFAULT_CONFIG_FILE}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TUTOR_CONFIG, TUTOR_API_KEY, TUTOR_MODEL, TUTOR_BASE_URL, RUST_LOG");
}

struct Args {
    config_path: PathBuf,
    show_help: bool,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut config_path = std::env::var("TUTOR_CONFIG")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from);
        let mut show_help = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    let value = require_value(args, "--config")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidConfigPath { raw: value });
                    }
                    config_path = PathBuf::from(value);
                }
                "--help" | "-h" => show_help = true,
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            config_path,
            show_help,
        })
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout belongs to the prompt.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    if args.show_help {
        print_usage();
        return Ok(());
    }

    init_tracing();

    let overrides = EnvOverrides::from_env();
    if !overrides.is_empty() {
        tracing::info!("environment overrides active");
    }
    let services = AppServices::new_ini(&args.config_path, overrides);
    tracing::info!(config = %args.config_path.display(), "starting tutor");
    let (coordinator, events) = services.coordinator().await?;

    let config_path = services.config_path().map(PathBuf::from);
    Repl::new(coordinator, events, config_path, tokio::io::stdout())
        .run(BufReader::new(tokio::io::stdin()))
        .await
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
