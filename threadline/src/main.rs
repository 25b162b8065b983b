//! threadline - segment an agent conversation log into delegated activity
//!
//! Reads an event log (JSON array or JSON Lines), groups research, critique
//! and planning delegations, and prints either the groups or the merged
//! timeline.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/threadline/config.toml (~/.config/threadline/config.toml)
//! - Logs: $XDG_STATE_HOME/threadline/threadline.log (~/.local/state/threadline/threadline.log)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use threadline_core::{
    eventlog, ActivityGroup, CollectingDiagnostics, Config, Diagnostics, KindGroups,
    PayloadSource, Segmentation, Segmenter, TimelineActivity, TracingDiagnostics,
};

#[derive(Parser)]
#[command(name = "threadline")]
#[command(about = "Group delegated sub-agent work in a conversation log")]
#[command(version)]
struct Args {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text, global = true)]
    format: Format,

    /// Config file (default: $XDG_CONFIG_HOME/threadline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print data-quality anomalies to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show activity groups for every delegation kind
    Groups {
        /// Event log file
        log: PathBuf,
    },

    /// Show the merged activity timeline
    Timeline {
        /// Event log file
        log: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Longest payload preview shown in text output
const PREVIEW_CHARS: usize = 100;

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Config::load().context("failed to load configuration")?,
    };

    let _log_guard =
        threadline_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let log = match &args.command {
        Command::Groups { log } | Command::Timeline { log } => log,
    };
    let segmentation = segment_file(log, &config, args.verbose)?;

    match (&args.command, args.format) {
        (Command::Groups { .. }, Format::Text) => print_groups(&segmentation.groups),
        (Command::Groups { .. }, Format::Json) => {
            println!("{}", serde_json::to_string_pretty(&segmentation.groups)?)
        }
        (Command::Timeline { .. }, Format::Text) => print_timeline(&segmentation.timeline),
        (Command::Timeline { .. }, Format::Json) => {
            println!("{}", serde_json::to_string_pretty(&segmentation.timeline)?)
        }
    }

    Ok(())
}

fn segment_file(path: &Path, config: &Config, verbose: bool) -> Result<Segmentation> {
    let events = eventlog::read_events(path)
        .with_context(|| format!("failed to read event log {}", path.display()))?;

    let sink = CollectingDiagnostics::new();
    let segmentation = Segmenter::from_config(config)
        .segment(&events, &sink)
        .with_context(|| format!("failed to segment {}", path.display()))?;

    for anomaly in sink.anomalies() {
        if verbose {
            eprintln!("warning: {}", anomaly);
        }
        TracingDiagnostics.report(anomaly);
    }

    Ok(segmentation)
}

fn print_groups(groups: &[KindGroups]) {
    for kind_groups in groups {
        let kind = kind_groups.kind.display_name();
        match kind_groups.groups.len() {
            0 => println!("{}: no groups", kind),
            1 => println!("{} (1 group)", kind),
            n => println!("{} ({} groups)", kind, n),
        }
        for group in &kind_groups.groups {
            print_group(group);
        }
        println!();
    }
}

fn print_group(group: &ActivityGroup) {
    let description = if group.task_description.is_empty() {
        "(no description)"
    } else {
        group.task_description.as_str()
    };
    println!(
        "  [{}] {}-{} {}",
        group.status.as_str(),
        group.start_index,
        group.end_index,
        description
    );

    let artifacts = &group.artifacts;
    println!(
        "      artifacts: {} searches, {} reads, {} mutations, {} documents",
        artifacts.search_batches.len(),
        artifacts.file_reads.len(),
        artifacts.file_mutations.len(),
        artifacts.documents.len()
    );

    match (&group.final_payload, group.payload_source) {
        (Some(payload), PayloadSource::Terminal) => {
            println!("      result: {}", preview(payload))
        }
        (Some(payload), _) => println!("      narrative: {}", preview(payload)),
        (None, _) => println!("      (no payload yet)"),
    }
}

fn print_timeline(timeline: &[TimelineActivity]) {
    if timeline.is_empty() {
        println!("No activity found.");
        return;
    }
    for activity in timeline {
        println!(
            "{:>4}  {:<13} {:<13} {}",
            activity.order,
            format!("[{}]", activity.status.as_str()),
            activity.kind.as_str(),
            activity.title
        );
    }
}

/// First line of `text`, cut to a readable length.
fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or("").trim();
    if line.chars().count() <= PREVIEW_CHARS {
        return line.to_string();
    }
    let cut: String = line.chars().take(PREVIEW_CHARS - 3).collect();
    format!("{}...", cut)
}
