//! Fanout Lookup CLI Application
//!
//! Looks up several accounts at once, waits for every lookup to finish, and
//! prints the results in the order they were asked for together with the
//! total elapsed time.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use fanout_lookup_lib::{
    load_env_config, parse_duration, parse_keys, read_keys_file, AggregateOutcome,
    ConfigManager, DefaultsConfig, EnvConfig, FanOutCoordinator, FanOutError, FileConfig,
    LookupConfig, LookupKey, SourceKind,
};
use std::process;
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Keys looked up when none are given.
const DEMO_KEYS: [&str; 3] = ["PivotalSoftware", "CloudFoundry", "Spring-Projects"];

/// CLI arguments for fanout-lookup
#[derive(Parser, Debug)]
#[command(name = "fanout-lookup")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Look up several accounts concurrently and report once all of them finish")]
#[command(
    long_about = "Look up several accounts concurrently and report once all of them finish.\n\nEvery lookup is started before any is awaited. Results are printed in input order with the total elapsed time; if any lookup fails, every failed key is reported and nothing else is printed."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Keys to look up (user or page names)
    #[arg(value_name = "KEYS", help_heading = "Input")]
    pub keys: Vec<String>,

    /// Input file with keys (one per line, '#' starts a comment)
    #[arg(short = 'f', long = "file", value_name = "FILE", help_heading = "Input")]
    pub file: Option<String>,

    /// Remote source to query: github or facebook
    #[arg(short = 's', long = "source", value_name = "SOURCE", help_heading = "Lookup")]
    pub source: Option<String>,

    /// Override the source's base URL
    #[arg(long = "base-url", value_name = "URL", help_heading = "Lookup")]
    pub base_url: Option<String>,

    /// Per-lookup timeout (e.g. 5s, 2m)
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Lookup")]
    pub timeout: Option<String>,

    /// Simulated latency added after each successful lookup (e.g. 1000ms)
    #[arg(long = "delay", value_name = "DURATION", help_heading = "Lookup")]
    pub delay: Option<String>,

    /// Output results as JSON
    #[arg(short = 'j', long = "json", help_heading = "Output")]
    pub json: bool,

    /// Enable colorful, formatted output
    #[arg(short = 'p', long = "pretty", help_heading = "Output")]
    pub pretty: bool,

    /// Configuration file (skips config discovery)
    #[arg(short = 'c', long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show detailed progress logs
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

/// Everything a run needs once CLI, environment and files are merged.
#[derive(Debug, Clone)]
struct Settings {
    source: SourceKind,
    base_url: Option<String>,
    lookup: LookupConfig,
    json: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the verbosity flag.
fn init_tracing(verbose: bool) {
    let level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("fanout_lookup={0},fanout_lookup_lib={0}", level))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> Result<(), FanOutError> {
    let env_config = load_env_config();
    let file_config = load_file_config(&args, &env_config)?;
    let settings = build_settings(&args, &env_config, &file_config)?;
    let keys = get_keys_to_lookup(&args).await?;

    tracing::info!(
        source = %settings.source,
        count = keys.len(),
        "starting lookups"
    );

    let coordinator = FanOutCoordinator::for_source(
        settings.source,
        settings.base_url.as_deref(),
        settings.lookup.clone(),
    )?;

    if args.pretty && !settings.json {
        ui::print_header(&keys, &settings.source, settings.lookup.simulated_latency);
    }

    let outcome = coordinator.run_all(&keys).await.map_err(|err| {
        if args.pretty {
            ui::print_failures(&err);
        }
        FanOutError::from(err)
    })?;

    display_outcome(&outcome, &args, settings.json)
}

/// Load an explicit config file if one is named, otherwise discover one.
fn load_file_config(args: &Args, env_config: &EnvConfig) -> Result<FileConfig, FanOutError> {
    let manager = ConfigManager::new(args.verbose);
    match args.config.as_ref().or(env_config.config.as_ref()) {
        Some(path) => manager.load_file(path),
        None => Ok(manager.discover_and_load()),
    }
}

/// Merge settings with precedence CLI > environment > config file > defaults.
fn build_settings(
    args: &Args,
    env_config: &EnvConfig,
    file_config: &FileConfig,
) -> Result<Settings, FanOutError> {
    let cli_defaults = DefaultsConfig {
        source: args.source.clone(),
        base_url: args.base_url.clone(),
        timeout: args.timeout.clone(),
        delay: args.delay.clone(),
        json: args.json.then_some(true),
    };

    let merged = file_config
        .defaults
        .clone()
        .unwrap_or_default()
        .overlay(env_config.as_defaults())
        .overlay(cli_defaults);

    let source = match &merged.source {
        Some(source) => source.parse::<SourceKind>()?,
        None => SourceKind::GitHub,
    };

    let mut lookup = LookupConfig::default();
    if let Some(timeout) = &merged.timeout {
        let timeout = parse_duration_setting("timeout", timeout)?;
        if timeout.is_zero() {
            return Err(FanOutError::config(
                "Invalid timeout: must be greater than zero",
            ));
        }
        lookup = lookup.with_task_timeout(timeout);
    }
    if let Some(delay) = &merged.delay {
        lookup = lookup.with_simulated_latency(parse_duration_setting("delay", delay)?);
    }

    Ok(Settings {
        source,
        base_url: merged.base_url,
        lookup,
        json: merged.json.unwrap_or(false),
    })
}

fn parse_duration_setting(
    name: &str,
    value: &str,
) -> Result<std::time::Duration, FanOutError> {
    parse_duration(value).ok_or_else(|| {
        FanOutError::config(format!(
            "Invalid {} '{}'. Use format like '250ms', '5s', '2m'",
            name, value
        ))
    })
}

/// Keys from the command line, then from `--file`, in that order.
async fn get_keys_to_lookup(args: &Args) -> Result<Vec<LookupKey>, FanOutError> {
    let mut keys = parse_keys(&args.keys)?;

    if let Some(file) = &args.file {
        keys.extend(read_keys_file(file).await?);
    }

    if keys.is_empty() {
        tracing::info!("no keys given, looking up demo organizations");
        keys = parse_keys(&DEMO_KEYS)?;
    }

    Ok(keys)
}

fn display_outcome(
    outcome: &AggregateOutcome,
    args: &Args,
    json: bool,
) -> Result<(), FanOutError> {
    if json {
        let rendered = serde_json::to_string_pretty(outcome)
            .map_err(|e| FanOutError::config(format!("Failed to render JSON: {}", e)))?;
        println!("{}", rendered);
    } else if args.pretty {
        ui::print_outcome(outcome);
    } else {
        println!("Elapsed time: {}ms", outcome.elapsed.as_millis());
        for result in &outcome.results {
            println!("{}: {}", result.key, result.payload);
        }
    }
    Ok(())
}
