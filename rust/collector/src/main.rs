//! Distributed Metric Harvesting Collector
//!
//! This binary is the driver around the harvesting library: it polls the
//! shared store for the values the workers of a job are expected to write
//! and forwards them to the tracking sink.
//!
//! # Usage
//!
//! ```bash
//! # Harvest the keys listed in the [schedule] table of a config file
//! mh-collector --config collector.toml harvest
//!
//! # Same, for the second attempt of the job, giving up after 10 minutes
//! mh-collector --config collector.toml harvest --n-try 1 --timeout-secs 600
//!
//! # Export end-of-job timings
//! mh-collector --config collector.toml durations durations.toml
//!
//! # Write a value the way a worker would
//! mh-collector --config collector.toml publish worker0 loss 0.25
//! ```

mod driver;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use driver::{open_sink, open_store, StopReason};
use harvest_core::metrics::MetricKey;
use harvest_core::{DurationAggregate, HarvestConfig, HarvestError, OneShotHarvester};

/// Distributed Metric Harvesting Collector
#[derive(Parser, Debug)]
#[command(name = "mh-collector")]
#[command(about = "Collects metrics published by distributed workers into a tracking sink")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "MH_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the store until every scheduled key is harvested
    Harvest {
        /// Attempt number of the job
        #[arg(long)]
        n_try: Option<u32>,

        /// Delay between drain passes in milliseconds
        #[arg(long)]
        poll_interval_ms: Option<u64>,

        /// Stop waiting for missing keys after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Export a duration aggregate (TOML) to the sink
    Durations {
        file: PathBuf,

        /// Attempt number of the job
        #[arg(long)]
        n_try: Option<u32>,
    },

    /// Write a value into the store as a worker would
    Publish {
        task: String,
        key: String,
        value: String,
    },
}

fn load_config(path: Option<&PathBuf>) -> harvest_core::Result<HarvestConfig> {
    let config = match path {
        Some(path) => HarvestConfig::from_file(path)?,
        None => HarvestConfig::default(),
    };
    Ok(config.with_env_overrides())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let filter = tracing_subscriber::filter::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = load_config(args.config.as_ref())?;

    match args.command {
        Command::Harvest {
            n_try,
            poll_interval_ms,
            timeout_secs,
        } => {
            if let Some(n_try) = n_try {
                config.harvest.n_try = n_try;
            }
            if let Some(ms) = poll_interval_ms {
                config.harvest.poll_interval_ms = ms;
            }
            if let Some(secs) = timeout_secs {
                config.harvest.timeout_secs = secs;
            }
            config.validate()?;

            tracing::info!("Starting metric collector");
            tracing::info!("  Store: {}", config.store.base_path.display());
            tracing::info!("  Sink: {:?} {}", config.sink.kind, config.sink.path.display());
            tracing::info!("  Attempt: {}", config.harvest.n_try);
            tracing::info!("  Poll interval: {}ms", config.harvest.poll_interval_ms);

            let store = open_store(&config.store)?;
            let sink = open_sink(&config.sink)?;
            let mut harvester =
                OneShotHarvester::new(store, sink, Some(&config.schedule), config.harvest.n_try);
            tracing::info!("  Expected keys: {}", harvester.pending().len());

            let summary = driver::run(
                &mut harvester,
                config.harvest.poll_interval(),
                config.harvest.timeout(),
                async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::warn!("failed to listen for CTRL+C: {}", e);
                        std::future::pending::<()>().await;
                    }
                    tracing::info!("Shutting down collector...");
                },
            )
            .await;

            tracing::info!(
                "Harvested {} key(s) in {} pass(es), {} undecodable, {} transport fault(s)",
                summary.harvested,
                summary.passes,
                summary.undecodable,
                summary.faults
            );
            if summary.reason != StopReason::Complete {
                for key in &summary.pending {
                    tracing::info!("  never written: {}", key);
                }
            }
        }

        Command::Durations { file, n_try } => {
            config.validate()?;
            let n_try = n_try.unwrap_or(config.harvest.n_try);

            let content = std::fs::read_to_string(&file)
                .map_err(|e| HarvestError::io_with_source(&file, "failed to read durations", e))?;
            let aggregate: DurationAggregate = toml::from_str(&content).map_err(|e| {
                HarvestError::config_with_source("failed to parse durations file", e)
            })?;

            let sink = open_sink(&config.sink)?;
            aggregate.log_to(sink.as_ref(), n_try)?;
            tracing::info!(
                "Exported {} duration metric(s) for attempt {}",
                aggregate.to_metrics(n_try).len(),
                n_try
            );
        }

        Command::Publish { task, key, value } => {
            let key = MetricKey::new(&task, &key);
            let store = open_store(&config.store)?;
            store.inner().put(key.as_str(), value.as_bytes())?;
            tracing::info!("Published {} under {}", key, store.inner().base_path().display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_harvest_overrides() {
        let args = Args::parse_from([
            "mh-collector",
            "--config",
            "collector.toml",
            "harvest",
            "--n-try",
            "2",
            "--timeout-secs",
            "30",
        ]);

        assert_eq!(args.config, Some(PathBuf::from("collector.toml")));
        match args.command {
            Command::Harvest {
                n_try,
                poll_interval_ms,
                timeout_secs,
            } => {
                assert_eq!(n_try, Some(2));
                assert_eq!(poll_interval_ms, None);
                assert_eq!(timeout_secs, Some(30));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[schedule]\nworker0 = [\"loss\"]").unwrap();

        let config = load_config(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.schedule["worker0"], vec!["loss"]);
    }

    #[test]
    fn test_publish_then_harvest_roundtrip() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut config = HarvestConfig::default();
        config.store.base_path = temp.path().join("kv");
        config.sink.path = temp.path().join("metrics.jsonl");
        config
            .schedule
            .insert("worker0".to_string(), vec!["loss".to_string()]);

        let store = open_store(&config.store).unwrap();
        store.inner().put("worker0/loss", b"0.25").unwrap();

        let sink = open_sink(&config.sink).unwrap();
        let mut harvester = OneShotHarvester::new(store, sink, Some(&config.schedule), 3);
        harvester.drain_once();
        assert!(harvester.is_done());

        let lines = harvest_core::JsonLinesSink::read_all(&config.sink.path).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].record.name(), "worker0/loss_3");
    }

    #[test]
    fn test_durations_file_export() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("durations.toml");
        std::fs::write(
            &path,
            "total_training_duration = 120.0\n\n[container_duration]\nchief = 150.0\n",
        )
        .unwrap();

        let aggregate: DurationAggregate =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let sink = harvest_core::MemorySink::new();
        aggregate.log_to(&sink, 0).unwrap();

        assert_eq!(
            sink.metrics(),
            vec![
                ("total_training_duration_0".to_string(), 120.0, None),
                ("chief_container_duration_0".to_string(), 150.0, None),
            ]
        );
    }
}
