//! `scope` - run scan preparation plugins from the command line.
//!
//! Results are written to stdout as one JSON envelope per line; logs go to
//! stderr.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use scope_core::{Config, PluginRegistry, ResultReceiver, Runner, Target, Task};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "scope", version, about = "Run scan preparation plugins")]
struct Cli {
    /// Path to the configuration file (default: nearest scope.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log filter, overrides RUST_LOG and the configured level
    #[arg(long, value_name = "FILTER", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List registered plugins as module/plugin
    List,
    /// Run one plugin against a set of targets
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Module the plugin belongs to
    #[arg(short, long)]
    module: String,

    /// Plugin name within the module
    #[arg(short, long)]
    plugin: String,

    /// Raw parameter string, overrides the configured one
    #[arg(long, allow_hyphen_values = true)]
    parameter: Option<String>,

    /// JSON array of hosts or target objects
    #[arg(long, value_name = "FILE")]
    targets_file: Option<PathBuf>,

    /// Correlation id stamped on every result (default: random)
    #[arg(long)]
    correlation_id: Option<Uuid>,

    /// Hosts or IP addresses
    #[arg(value_name = "TARGET")]
    targets: Vec<String>,
}

/// Entry of a targets file
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TargetEntry {
    Host(String),
    Target(Target),
}

impl From<TargetEntry> for Target {
    fn from(entry: TargetEntry) -> Self {
        match entry {
            TargetEntry::Host(host) => Target::from(host.as_str()),
            TargetEntry::Target(target) => target,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::from_project_root()?,
    };
    init_logging(cli.log_level.as_deref(), &config.log.level)?;

    let registry = PluginRegistry::with_builtins()?;

    match cli.command {
        Commands::List => {
            for descriptor in registry.descriptors() {
                println!("{}", descriptor);
            }
            Ok(())
        }
        Commands::Run(args) => run(registry, &config, args).await,
    }
}

fn init_logging(cli_level: Option<&str>, config_level: &str) -> Result<()> {
    let filter = match cli_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(config_level))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn run(registry: PluginRegistry, config: &Config, args: RunArgs) -> Result<()> {
    let mut targets: Vec<Target> = args.targets.iter().map(|t| Target::from(t.as_str())).collect();
    if let Some(path) = &args.targets_file {
        targets.extend(load_targets(path)?);
    }
    if targets.is_empty() {
        bail!("No targets given");
    }

    let correlation_id = args.correlation_id.unwrap_or_else(Uuid::new_v4);
    let (mut runner, receiver) = Runner::new(registry, config);
    for (descriptor, e) in runner.install_all() {
        warn!(plugin = %descriptor, "Skipping plugin for this run: {}", e);
    }

    let printer = tokio::spawn(print_results(receiver));

    let tasks = targets.into_iter().map(|target| {
        let task =
            Task::new(&args.module, &args.plugin, target).with_correlation_id(correlation_id);
        match &args.parameter {
            Some(parameter) => task.with_parameter(parameter.clone()),
            None => task,
        }
    });
    let summary = runner.run_all(tasks).await;
    drop(runner);

    let printed = printer.await??;
    info!(%correlation_id, printed, "Results written");

    if summary.dispatched == 0 {
        bail!(
            "Nothing could be dispatched to {}/{}",
            args.module,
            args.plugin
        );
    }
    Ok(())
}

fn load_targets(path: &Path) -> Result<Vec<Target>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read targets file {}", path.display()))?;
    let entries: Vec<TargetEntry> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid targets file {}", path.display()))?;
    Ok(entries.into_iter().map(Target::from).collect())
}

async fn print_results(mut receiver: ResultReceiver) -> Result<usize> {
    let mut printed = 0;
    while let Some(envelope) = receiver.recv().await {
        println!("{}", serde_json::to_string(&envelope)?);
        printed += 1;
    }
    Ok(printed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use tempfile::tempdir;

    #[test]
    fn test_load_targets() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("targets.json");
        std::fs::write(
            &path,
            r#"["192.0.2.1", {"host": "www.example.com", "cnames": ["a.cloudfront.net"]}]"#,
        )
        .unwrap();

        let targets = load_targets(&path).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].addresses, vec!["192.0.2.1".parse::<IpAddr>().unwrap()]);
        assert_eq!(targets[1].host, "www.example.com");
        assert_eq!(targets[1].cnames, vec!["a.cloudfront.net".to_string()]);
    }

    #[test]
    fn test_load_targets_rejects_bad_json() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("targets.json");
        std::fs::write(&path, r#"{"host": "not-a-list"}"#).unwrap();

        assert!(load_targets(&path).is_err());
        assert!(load_targets(&temp_dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "scope",
            "run",
            "--module",
            "PortScanPreparation",
            "--plugin",
            "SkipCdn",
            "--parameter",
            "-ranges 192.0.2.0/24",
            "example.com",
            "192.0.2.1",
        ])
        .unwrap();

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.parameter.as_deref(), Some("-ranges 192.0.2.0/24"));
                assert_eq!(args.targets, vec!["example.com", "192.0.2.1"]);
            }
            Commands::List => panic!("expected run"),
        }
    }
}
