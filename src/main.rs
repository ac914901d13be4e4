//! inferbench CLI entry point.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use inferbench::channel::{Marker, Receiver, RunLog, Sender};
use inferbench::classify::{dataset_classes, LabelMap};
use inferbench::compile::{compile_dir, render_report, write_json, write_table_csv};
use inferbench::config::Framing;
use inferbench::power::{analyze_run, PowerWindow};
use inferbench::profile::load_report;
use inferbench::BenchConfig;

#[derive(Parser)]
#[command(name = "inferbench")]
#[command(about = "Power, timing and accuracy benchmarking for image classifiers")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Accept one sender and record its lifecycle markers
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        /// Run log file (defaults to the configured one)
        #[arg(long, conflicts_with = "run_id")]
        run_log: Option<PathBuf>,

        /// Run prefix; the log becomes `<data_dir>/<prefix> - profile_output.txt`
        #[arg(long)]
        run_id: Option<String>,

        /// Add to a run log that already holds a run
        #[arg(long)]
        append: bool,

        /// Newline-delimited markers instead of one per read
        #[arg(long)]
        newline: bool,

        /// Give up after this many milliseconds without data
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Connect to a receiver and send markers in order
    Send {
        /// Markers or free text (run_start, profile_end, done_transmit, ...)
        #[arg(required = true)]
        markers: Vec<String>,

        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        #[arg(long)]
        newline: bool,
    },

    /// Energy and power statistics for one run window
    Correlate {
        /// Power meter log
        power: PathBuf,

        /// Timing file whose first two lines bound the window
        timing: PathBuf,
    },

    /// Summarize a call-profile report
    Profile {
        report: PathBuf,

        /// Rows to print, by cumulative time
        #[arg(long, default_value = "10")]
        top: usize,

        /// Print the cumulative time of this `file:line(function)`
        #[arg(long)]
        location: Option<String>,
    },

    /// List dataset classes and check them against the label file
    Dataset {
        dir: PathBuf,

        /// Label file (defaults to the configured one)
        #[arg(long)]
        labels: Option<PathBuf>,
    },

    /// Join every run in a directory into one table
    Compile {
        /// Data directory (defaults to the configured one)
        dir: Option<PathBuf>,

        /// Write the table as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Write records and exclusions as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match load_config(cli.config.as_deref()) {
        Ok(config) => run(cli.command, config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<BenchConfig> {
    match path {
        Some(path) => BenchConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(BenchConfig::default()),
    }
}

async fn run(command: Commands, mut config: BenchConfig) -> Result<()> {
    match command {
        Commands::Serve {
            host,
            port,
            run_log,
            run_id,
            append,
            newline,
            timeout_ms,
        } => {
            apply_channel_overrides(&mut config, host, port, newline);
            if timeout_ms.is_some() {
                config.channel.read_timeout_ms = timeout_ms;
            }
            config.validate()?;
            let run_log = match (run_log, run_id) {
                (Some(path), _) => path,
                (None, Some(prefix)) => config.paths.run_log_for(&prefix)?,
                (None, None) => config.paths.run_log_path(),
            };
            serve_command(&config, &run_log, append).await
        }
        Commands::Send {
            markers,
            host,
            port,
            newline,
        } => {
            apply_channel_overrides(&mut config, host, port, newline);
            config.validate()?;
            send_command(&config, &markers).await
        }
        Commands::Correlate { power, timing } => correlate_command(&power, &timing),
        Commands::Profile {
            report,
            top,
            location,
        } => profile_command(&report, top, location.as_deref()),
        Commands::Dataset { dir, labels } => {
            let labels = labels.unwrap_or_else(|| config.label_file());
            dataset_command(&dir, &labels)
        }
        Commands::Compile { dir, csv, json } => {
            let dir = dir.unwrap_or_else(|| config.paths.data_dir.clone());
            compile_command(&dir, csv.as_deref(), json.as_deref())
        }
    }
}

fn apply_channel_overrides(config: &mut BenchConfig, host: Option<String>, port: Option<u16>, newline: bool) {
    if let Some(host) = host {
        config.channel.host = host;
    }
    if let Some(port) = port {
        config.channel.port = port;
    }
    if newline {
        config.channel.framing = Framing::Newline;
    }
}

async fn serve_command(config: &BenchConfig, run_log: &Path, append: bool) -> Result<()> {
    let mut log = if append {
        RunLog::open_append(run_log).await?
    } else {
        RunLog::open(run_log)
            .await
            .context("pass --append to continue this log or --run-id to start a new one")?
    };
    let mut session = Receiver::serve(&config.channel).await?;
    let receipts = session.run(Some(&mut log)).await?;

    println!("Received {} markers from {}", receipts.len(), session.peer());
    match PowerWindow::from_receipts(&receipts)? {
        Some(window) => println!(
            "Window: {} .. {} ({:.3}s)",
            window.start(),
            window.end(),
            window.duration_secs()
        ),
        None => println!("No complete start/end pair received"),
    }
    info!("run log at {}", log.path().display());
    Ok(())
}

async fn send_command(config: &BenchConfig, markers: &[String]) -> Result<()> {
    let mut sender = Sender::connect_with(&config.channel).await?;
    for raw in markers {
        sender.send(&Marker::parse(raw)).await?;
    }
    sender.close().await?;
    println!("Sent {} markers to {}", markers.len(), sender.peer());
    Ok(())
}

fn correlate_command(power: &Path, timing: &Path) -> Result<()> {
    let result = analyze_run(power, timing)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn profile_command(report: &Path, top: usize, location: Option<&str>) -> Result<()> {
    let report = load_report(report)?;
    println!("Total: {:.3} min ({} rows)", report.total_minutes(), report.rows.len());
    println!("{:>10} {:>10} {:>10}  location", "ncalls", "tottime", "cumtime");
    for row in report.rows.iter().take(top) {
        println!(
            "{:>10} {:>10.3} {:>10.3}  {}",
            row.call_count, row.total_time, row.cumulative_time, row.source_location
        );
    }
    if let Some(location) = location {
        println!("{}: {:.3}s cumulative", location, report.lookup(location)?);
    }
    Ok(())
}

fn dataset_command(dir: &Path, labels: &Path) -> Result<()> {
    let classes = dataset_classes(dir)?;
    let labels = LabelMap::load(labels)
        .with_context(|| format!("loading labels from {}", labels.display()))?;
    let mut missing = 0;
    for class in &classes {
        let images = std::fs::read_dir(&class.dir)
            .with_context(|| format!("reading {}", class.dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .count();
        let covered = labels.contains_label(&class.name);
        if !covered {
            missing += 1;
        }
        println!(
            "{:<30} {:>6} images{}",
            class.name,
            images,
            if covered { "" } else { "  (not in label file)" }
        );
    }
    println!("{} classes, {} without a label", classes.len(), missing);
    Ok(())
}

fn compile_command(dir: &Path, csv: Option<&Path>, json: Option<&Path>) -> Result<()> {
    let compilation = compile_dir(dir)?;
    println!("{}", render_report(&compilation));
    if let Some(path) = csv {
        write_table_csv(path, &compilation.records)?;
        info!("wrote {}", path.display());
    }
    if let Some(path) = json {
        write_json(path, &compilation)?;
        info!("wrote {}", path.display());
    }
    Ok(())
}
