//! prodcon - producer/consumer simulation over bounded buffers.

mod config;
mod runner;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::config::{BufferKind, ScenarioConfig};
use crate::runner::RunSummary;

/// Producer/consumer simulation over bounded buffers.
#[derive(Parser, Debug)]
#[command(name = "prodcon")]
#[command(about = "Producer/consumer simulation over bounded buffers")]
struct Cli {
    /// Verbose output (debug logs)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a configured scenario
    Run(RunArgs),
    /// Run a built-in demonstration
    Demo(DemoArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Scenario YAML file (flags override its values)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Buffer kind
    #[arg(short, long, value_enum)]
    kind: Option<BufferKind>,

    /// Initial capacity (0 selects the default of 10)
    #[arg(long)]
    capacity: Option<usize>,

    /// Number of producer threads
    #[arg(short, long)]
    producers: Option<usize>,

    /// Number of consumer threads
    #[arg(short = 'n', long)]
    consumers: Option<usize>,

    /// Items per producer
    #[arg(short, long)]
    items: Option<usize>,

    /// Pause after each produce, in ms (unset: 10-50 ms jitter)
    #[arg(long)]
    producer_delay_ms: Option<u64>,

    /// Pause after each consume, in ms
    #[arg(long)]
    consumer_delay_ms: Option<u64>,

    /// Cancel all workers after this many ms
    #[arg(short, long)]
    timeout_ms: Option<u64>,
}

#[derive(Args, Debug)]
struct DemoArgs {
    /// Which demonstration to run
    #[arg(short, long, value_enum, default_value_t = DemoScenario::Visual)]
    scenario: DemoScenario,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DemoScenario {
    /// Fixed buffer of 5, fast producer, slow consumer
    Visual,
    /// Fixed buffer of 3 that fills up
    Fixed,
    /// Elastic buffer of 2 that has to grow
    Elastic,
}

impl RunArgs {
    fn into_config(self) -> Result<ScenarioConfig> {
        let mut config = match &self.config {
            Some(path) => ScenarioConfig::load(path)?,
            None => ScenarioConfig::default(),
        };

        if let Some(kind) = self.kind {
            config.kind = kind;
        }
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if let Some(producers) = self.producers {
            config.producers = producers;
        }
        if let Some(consumers) = self.consumers {
            config.consumers = consumers;
        }
        if let Some(items) = self.items {
            config.items = items;
        }
        if self.producer_delay_ms.is_some() {
            config.producer_delay_ms = self.producer_delay_ms;
        }
        if self.consumer_delay_ms.is_some() {
            config.consumer_delay_ms = self.consumer_delay_ms;
        }
        if self.timeout_ms.is_some() {
            config.timeout_ms = self.timeout_ms;
        }
        Ok(config)
    }
}

impl DemoScenario {
    fn config(self) -> ScenarioConfig {
        match self {
            DemoScenario::Visual => ScenarioConfig::demo(),
            DemoScenario::Fixed => ScenarioConfig::fixed_demo(),
            DemoScenario::Elastic => ScenarioConfig::elastic_demo(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let config = match cli.command {
        Commands::Run(args) => args.into_config()?,
        Commands::Demo(args) => {
            println!("=== Demo: {:?} ===", args.scenario);
            args.scenario.config()
        }
    };

    let summary = runner::run(&config)?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("=== Run Summary ===");
    println!("Buffer:     {:?}", summary.kind);
    println!("Produced:   {}", summary.produced);
    println!("Consumed:   {}", summary.consumed);
    println!("Left:       {}", summary.final_size);
    println!(
        "Capacity:   {} -> {}",
        summary.initial_capacity, summary.final_capacity
    );
    if !summary.cancelled.is_empty() {
        println!("Cancelled:  {}", summary.cancelled.join(", "));
    }
    println!("Elapsed:    {:.2?}", summary.elapsed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "prodcon", "run", "--kind", "elastic", "--capacity", "4", "-p", "2", "-n", "3",
            "--items", "6", "--timeout-ms", "500",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        let config = args.into_config().unwrap();
        assert_eq!(config.kind, BufferKind::Elastic);
        assert_eq!(config.capacity, 4);
        assert_eq!(config.producers, 2);
        assert_eq!(config.consumers, 3);
        assert_eq!(config.items, 6);
        assert_eq!(config.timeout_ms, Some(500));
        assert_eq!(config.producer_delay_ms, None);
    }

    #[test]
    fn test_flags_override_file() {
        let path = std::env::temp_dir().join(format!("prodcon-cli-{}.yaml", std::process::id()));
        std::fs::write(&path, "kind: elastic\ncapacity: 8\nitems: 3\n").unwrap();

        let cli = Cli::try_parse_from([
            "prodcon",
            "run",
            "--config",
            path.to_str().unwrap(),
            "--capacity",
            "2",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        let config = args.into_config().unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.kind, BufferKind::Elastic);
        assert_eq!(config.capacity, 2);
        assert_eq!(config.items, 3);
    }

    #[test]
    fn test_demo_default_scenario() {
        let cli = Cli::try_parse_from(["prodcon", "-v", "demo"]).unwrap();
        assert!(cli.verbose);
        let Commands::Demo(args) = cli.command else {
            panic!("expected demo command");
        };
        assert_eq!(args.scenario, DemoScenario::Visual);
        assert_eq!(args.scenario.config(), ScenarioConfig::demo());
    }
}
