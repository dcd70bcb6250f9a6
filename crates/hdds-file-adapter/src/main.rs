// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HDDS File Adapter CLI
//!
//! Routes shape samples from CSV files, one stream per file, until every
//! file is exhausted. Samples are printed on stdout as JSON lines.
//!
//! # Usage
//!
//! ```bash
//! # Two file-backed streams
//! hdds-file-adapter --stream Square=square.csv --stream Circle=circle.csv
//!
//! # Faster pacing, 5 samples per read
//! hdds-file-adapter --stream Square=square.csv --sample-period-ms 10 --batch-size 5
//!
//! # Using configuration file
//! hdds-file-adapter --config adapter.toml
//! ```

use clap::{Parser, Subcommand};
use hdds_file_adapter::{
    AdapterConfig, ConfigError, RoutingEngine, SampleSink, ShapeSample, StreamInfo, StreamSource,
};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// HDDS File Adapter
#[derive(Parser, Debug)]
#[command(name = "hdds-file-adapter")]
#[command(about = "HDDS File Adapter - file-backed stream discovery and routing")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// File-backed stream (format: "name=path", can repeat)
    #[arg(short, long, conflicts_with = "config")]
    stream: Vec<String>,

    /// Registered type name for streams given with --stream
    #[arg(long, default_value = hdds_file_adapter::config::DEFAULT_TYPE_NAME)]
    type_name: String,

    /// Delay between two reads of a file (milliseconds)
    #[arg(long, default_value = "100")]
    sample_period_ms: u64,

    /// Samples read per period
    #[arg(long, default_value = "1")]
    batch_size: usize,

    /// Statistics reporting interval (seconds, 0 to disable)
    #[arg(long, default_value = "10")]
    stats_interval: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "adapter.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// One routed sample as printed on stdout.
#[derive(Serialize)]
struct RoutedSample<'a> {
    stream: &'a str,
    type_name: &'a str,
    #[serde(flatten)]
    sample: &'a ShapeSample,
}

/// Prints samples as JSON lines.
struct StdoutSink;

impl SampleSink for StdoutSink {
    fn on_samples(&self, stream: &StreamInfo, samples: &[ShapeSample]) {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for sample in samples {
            let routed = RoutedSample {
                stream: &stream.stream_name,
                type_name: &stream.type_info.type_name,
                sample,
            };
            match serde_json::to_string(&routed) {
                Ok(line) => {
                    if let Err(err) = writeln!(out, "{}", line) {
                        tracing::warn!("Failed to write sample: {}", err);
                    }
                }
                Err(err) => tracing::warn!("Failed to encode sample: {}", err),
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging (stderr, stdout carries samples)
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Handle subcommands
    if let Some(cmd) = args.command {
        return match cmd {
            Commands::GenConfig { output } => cmd_gen_config(output),
            Commands::Validate { config } => cmd_validate(config),
        };
    }

    let config = build_config(&args)?;
    let mut engine = RoutingEngine::new(config, Arc::new(StdoutSink))?;

    eprintln!("HDDS File Adapter v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("=====================================");
    for source in engine.discovery().sources() {
        eprintln!(
            "Stream: {} ({}) <- {}",
            source.stream_name,
            source.type_name,
            source.file_path.display()
        );
    }
    eprintln!();
    eprintln!("Press Ctrl+C to stop...");

    let handle = engine.run().await?;

    // Stats reporting task
    let stats_interval = args.stats_interval;
    let stats_handle = handle.clone();
    if stats_interval > 0 {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(stats_interval));
            interval.tick().await;
            loop {
                interval.tick().await;
                if !stats_handle.is_running() {
                    break;
                }
                print_stats(&stats_handle.stats());
            }
        });
    }

    // Run until every stream is retired or Ctrl+C
    let mut idle_check = tokio::time::interval(Duration::from_millis(100));
    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res?;
                eprintln!("\nShutting down...");
                break;
            }
            _ = idle_check.tick() => {
                if handle.is_idle() {
                    tracing::info!("All streams retired");
                    break;
                }
            }
        }
    }

    handle.shutdown().await?;

    eprintln!("\nFinal Statistics:");
    eprintln!("Uptime: {}s", engine.uptime_secs());
    print_stats(&handle.stats());

    Ok(())
}

fn build_config(args: &Args) -> Result<AdapterConfig, ConfigError> {
    // Load from file if specified
    if let Some(ref config_path) = args.config {
        return AdapterConfig::from_file(config_path);
    }

    if args.stream.is_empty() {
        return Err(ConfigError::Invalid(
            "Missing --stream (or use --config)".into(),
        ));
    }

    let mut config = AdapterConfig::default();
    for entry in &args.stream {
        let (name, path) = entry.split_once('=').ok_or_else(|| {
            ConfigError::Invalid(format!(
                "Invalid stream format: {} (expected name=path)",
                entry
            ))
        })?;
        config.add_stream(StreamSource::new(name, path).type_name(args.type_name.clone()));
    }

    config.adapter.sample_period_ms = args.sample_period_ms;
    config.adapter.batch_size = args.batch_size;
    config.adapter.log_level = args.log_level.clone();
    config.validate()?;

    Ok(config)
}

fn cmd_gen_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AdapterConfig::default();
    config.adapter.name = "shapes-file-adapter".into();
    config.add_stream(StreamSource::new("Square", "square.csv"));
    config.add_stream(StreamSource::new("Circle", "circle.csv"));
    config.add_stream(StreamSource::new("Triangle", "triangle.csv"));

    let toml_str = toml::to_string_pretty(&config)?;

    let content = format!(
        r#"# HDDS File Adapter Configuration
# Generated by hdds-file-adapter gen-config
#
# Each file holds one "color,x,y,shapesize" record per line.

{}
"#,
        toml_str
    );

    std::fs::write(&output, content)?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    match AdapterConfig::from_file(&config_path) {
        Ok(config) => {
            println!("Configuration valid!");
            println!();
            println!("Adapter: {}", config.adapter.name);
            println!("Streams: {}", config.streams.len());
            for (i, stream) in config.streams.iter().enumerate() {
                println!(
                    "  [{}] {} ({}) <- {} {}",
                    i,
                    stream.stream_name,
                    stream.type_name,
                    stream.file_path.display(),
                    if stream.file_path.is_file() {
                        ""
                    } else {
                        "(missing)"
                    }
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_stats(stats: &[hdds_file_adapter::RouteStatsSnapshot]) {
    eprintln!("--- Route Statistics ---");
    for stat in stats {
        eprintln!(
            "  {}: {} samples ({:.1} samples/s), {} batches, {} errors{}",
            stat.stream_name,
            stat.samples_routed,
            stat.samples_per_second(),
            stat.batches_routed,
            stat.errors,
            if stat.finished { " [finished]" } else { "" }
        );
    }
}
