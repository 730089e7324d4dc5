//! # Relat CLI
//!
//! ## Usage
//!
//! ```bash
//! relat parse "x : rel | x > 150"
//! relat translate "^edge" --input edge=edge.json
//! relat run "^edge" --input edge=edge.json
//! ```
//!
//! Input files hold either `{"types": [...], "tuples": [...]}` or a bare
//! array of tuples (types inferred from the first tuple).
//!
//! ## Environment
//!
//! - `RELAT_LOG` - log level / filter (overrides `logging.level`)
//! - `RELAT_LOG_FORMAT` - `text` or `json` (overrides `logging.format`)
//! - `RELAT_LOG_FILE` - write logs to a file (overrides `logging.file`)

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use relat::config::{Config, LoggingConfig};
use relat::engine::{EnginePool, Relations, SouffleEngine};
use relat::run::{prepare, run_relat_pooled};
use relat::value::Relation;
use tracing::info;

/// Keeps the non-blocking log writer alive for the life of the process
static TRACE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(version, about = "Relat: relational queries compiled to Souffle Datalog", long_about = None)]
struct Cli {
    /// Configuration file (default: relat.toml, relat.local.toml, RELAT_* env)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the parsed expression tree
    Parse {
        /// Relat query
        query: String,
    },
    /// Print the Datalog program for a query
    Translate(QueryArgs),
    /// Evaluate a query with Souffle and print the result as JSON
    Run(QueryArgs),
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Relat query
    query: String,

    /// Input relation, as NAME=FILE.json (repeatable)
    #[arg(short, long = "input", value_name = "NAME=FILE")]
    inputs: Vec<String>,

    /// Omit the per-relation source comments
    #[arg(long)]
    no_comments: bool,

    /// Souffle binary (overrides engine.souffle_path)
    #[arg(long, value_name = "PATH")]
    souffle: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    }
    .context("loading configuration")?;
    init_tracing(&config.logging);

    match cli.command {
        Command::Parse { query } => {
            println!("{}", relat::parse(&query)?);
        }
        Command::Translate(args) => {
            let inputs = load_inputs(&args.inputs)?;
            let mut options = config.translate_options();
            options.emit_comments &= !args.no_comments;
            let query = prepare(&args.query, &inputs, options)?;
            println!("{}", query.program);
        }
        Command::Run(args) => {
            let inputs = load_inputs(&args.inputs)?;
            let souffle_path = args.souffle.unwrap_or_else(|| config.engine.souffle_path.clone());
            let engine = SouffleEngine::new(souffle_path).with_args(config.engine.extra_args.clone());
            let pool = EnginePool::new(Arc::new(engine), config.engine.workers);
            info!(workers = pool.workers(), inputs = inputs.len(), "run_started");
            let result = run_relat_pooled(&args.query, inputs, &pool).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }
    Ok(())
}

/// Read every `NAME=FILE` input
fn load_inputs(pairs: &[String]) -> Result<Relations> {
    let mut inputs = Relations::new();
    for pair in pairs {
        let Some((name, file)) = pair.split_once('=') else {
            bail!("input must be NAME=FILE, got '{pair}'");
        };
        if inputs.contains_key(name) {
            bail!("input '{name}' given more than once");
        }
        let relation = load_relation(Path::new(file)).with_context(|| format!("reading input '{name}'"))?;
        inputs.insert(name.to_string(), relation);
    }
    Ok(inputs)
}

fn load_relation(path: &Path) -> Result<Relation> {
    let text = fs::read_to_string(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(Relation::from_json(&text)?)
}

fn init_tracing(logging_config: &LoggingConfig) {
    // Environment variables take precedence over config file values
    let level = env::var("RELAT_LOG").unwrap_or_else(|_| logging_config.level.clone());
    let json = env::var("RELAT_LOG_FORMAT")
        .map_or_else(|_| logging_config.format == "json", |v| v == "json");
    let log_path = env::var("RELAT_LOG_FILE")
        .ok()
        .map(PathBuf::from)
        .or_else(|| logging_config.file.clone());

    let filter = tracing_subscriber::EnvFilter::try_new(&level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let writer = match log_path {
        Some(path) => {
            let file = match fs::OpenOptions::new().create(true).append(true).open(&path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("ERROR: Unable to open log file '{}': {e}", path.display());
                    return;
                }
            };
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let _ = TRACE_GUARD.set(guard);
            non_blocking
        }
        None => {
            let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());
            let _ = TRACE_GUARD.set(guard);
            non_blocking
        }
    };

    let base = || {
        tracing_subscriber::fmt()
            .with_env_filter(filter.clone())
            .with_ansi(false)
            .with_writer(writer.clone())
    };

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if json {
        Box::new(base().json().finish())
    } else {
        Box::new(base().compact().finish())
    };

    let _ = tracing::subscriber::set_global_default(subscriber);
}
