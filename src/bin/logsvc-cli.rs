use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use logsvc::config::{load_config, ConfigValidator};
use logsvc::prelude::*;

#[derive(Parser)]
#[command(name = "logsvc-cli")]
#[command(about = "Exercise the structured logging service", long_about = None)]
struct Cli {
    /// TOML logging configuration; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base directory for the relative log directory
    #[arg(short, long)]
    working_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file and print the effective settings
    Check,
    /// Log from several concurrent tasks, then close
    Emit {
        #[arg(short, long, default_value_t = 4)]
        tasks: usize,
        #[arg(short, long, default_value_t = 10)]
        records: usize,
    },
    /// Dump a sample value tree at debug level
    Dump,
}

#[derive(Serialize)]
struct Sample {
    name: &'static str,
    ports: Vec<u16>,
    limits: std::collections::BTreeMap<&'static str, u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logsvc=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let validator = ConfigValidator::new();
    let config = match &cli.config {
        // load_config validates; defaults are valid as written
        Some(path) => load_config(path, &validator)?,
        None => LoggingConfig::default(),
    };

    let service = match cli.command {
        Commands::Check => {
            println!("{}", toml::to_string_pretty(&config)?);
            return Ok(());
        }
        Commands::Emit { tasks, records } => {
            let service = build_service(cli.working_dir.as_deref(), validator);
            service.initialize(&config)?;
            service.hook(|r: &mut logsvc::Record| r.push("pid", std::process::id()));

            let mut handles = Vec::with_capacity(tasks);
            for task in 0..tasks {
                let logger = service.with().uint("task", task as u64).logger();
                handles.push(tokio::spawn(async move {
                    for seq in 0..records {
                        logger
                            .info_with()
                            .uint("seq", seq as u64)
                            .dur("uptime", Duration::from_millis(seq as u64))
                            .msg("tick");
                        tokio::task::yield_now().await;
                    }
                    let err = OpError::new("worker.Finish", "task drained")
                        .with_cause(std::io::Error::other("queue empty"));
                    logger.warn_with().err(&err).msg("worker stopped");
                }));
            }
            for handle in handles {
                handle.await?;
            }
            service
        }
        Commands::Dump => {
            let config = dump_config(config, cli.config.is_some());
            let service = build_service(cli.working_dir.as_deref(), validator);
            service.initialize(&config)?;
            let sample = Sample {
                name: "edge",
                ports: vec![80, 443],
                limits: [("rps", 100), ("burst", 20)].into_iter().collect(),
            };
            service.dump_serialized(&sample);
            service
        }
    };

    tracing::info!(active = service.active_operations(), "Closing logging service");
    service.close()?;
    Ok(())
}

fn build_service(working_dir: Option<&Path>, validator: ConfigValidator) -> Service {
    let mut builder = Service::builder().with_validator(validator);
    if let Some(dir) = working_dir {
        builder = builder.with_working_dir(dir);
    }
    builder.build()
}

/// Dumps are written at debug level. Built-in defaults are lowered to debug;
/// a config file is respected, with a notice when it hides the dump.
fn dump_config(mut config: LoggingConfig, from_file: bool) -> LoggingConfig {
    let hides_debug = config
        .level
        .parse::<Level>()
        .map(|level| level > Level::Debug)
        .unwrap_or(false);
    if !hides_debug {
        return config;
    }
    if from_file {
        tracing::warn!(
            level = %config.level,
            "Configured level hides debug records; the dump will be empty"
        );
    } else {
        config.level = Level::Debug.to_string();
    }
    config
}
