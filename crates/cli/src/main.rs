use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ArgAction;
use clap::{Args, Parser, Subcommand};
use folder_steward_core::{
    collect_doctor_info, run_with_callback, PipelineOptions, RunConfig, RunPhase,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "folder-steward",
    version,
    about = "Organize a folder's files into category folders, with local and remote backups."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Back up and move a folder's files into category folders.
    Organize(OrganizeArgs),
    /// Show environment and detected disk information.
    Doctor,
    /// Print the effective category table.
    Categories(CategoriesArgs),
}

#[derive(Debug, Args)]
struct OrganizeArgs {
    /// Folder whose immediate files will be organized.
    root: PathBuf,

    /// Configuration file (JSON). Defaults apply when omitted.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the minimum file size in megabytes.
    #[arg(long, value_name = "MB")]
    min_size_mb: Option<f64>,

    /// Override the maximum file age in days.
    #[arg(long, value_name = "DAYS")]
    max_age_days: Option<i64>,

    /// Exclude patterns (glob or substring, repeatable).
    #[arg(long = "exclude", value_name = "PATTERN", num_args = 1.., action = ArgAction::Append)]
    exclude: Vec<String>,

    /// Print per-file progress while organizing.
    #[arg(long)]
    progress: bool,

    /// Optional run report output path (JSON).
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct CategoriesArgs {
    /// Configuration file (JSON). Defaults apply when omitted.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Organize(args) => run_organize_command(args),
        Commands::Doctor => {
            run_doctor_command();
            Ok(())
        }
        Commands::Categories(args) => run_categories_command(args),
    }
}

fn run_organize_command(args: OrganizeArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(min_size_mb) = args.min_size_mb {
        config.min_size_mb = min_size_mb;
    }
    if let Some(max_age_days) = args.max_age_days {
        config.max_age_days = max_age_days;
    }
    config.excludes.extend(args.exclude);

    let mut options = PipelineOptions::from_config(args.root, config);
    options.emit_events = args.progress;

    let report = run_with_callback(&options, |event| {
        if let (RunPhase::Placing, Some(file)) = (&event.phase, &event.file) {
            println!("[{}] {}", event.processed, file);
        }
    })?;

    println!(
        "Organized {}: {} file(s) seen, {} moved, {} skipped, {} error(s), {} warning(s).",
        report.root,
        report.summary.total_files,
        report.summary.moved_files,
        report.summary.skipped_files,
        report.summary.errors,
        report.warnings.len()
    );
    for warning in &report.warnings {
        println!("Warning: {warning}");
    }

    if let Some(output) = args.output {
        let payload =
            serde_json::to_string_pretty(&report).context("failed to serialize run report")?;
        fs::write(&output, payload)
            .with_context(|| format!("failed to write report to {}", output.display()))?;
        println!("Report written to {}", output.display());
    }

    Ok(())
}

fn run_categories_command(args: CategoriesArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    for category in config.category_table() {
        println!("{}: {}", category.name, category.extensions.join(" "));
    }
    Ok(())
}

fn run_doctor_command() {
    let info = collect_doctor_info();
    println!("OS: {} ({})", info.os, info.arch);
    if let Some(current_dir) = info.current_dir {
        println!("Current directory: {current_dir}");
    }
    println!("Detected disks: {}", info.disks.len());
    for disk in info.disks {
        println!(
            "- {} [{}] total={} free={} fs={} removable={}",
            disk.name,
            disk.mount_point,
            human_bytes(disk.total_space_bytes),
            human_bytes(disk.free_space_bytes),
            disk.file_system.as_deref().unwrap_or("unknown"),
            disk.is_removable
        );
    }
    for note in info.notes {
        println!("Note: {note}");
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<RunConfig> {
    match path {
        Some(path) => RunConfig::load(path),
        None => Ok(RunConfig::default()),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn human_bytes(value: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if value == 0 {
        return "0 B".to_string();
    }
    let mut size = value as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}
