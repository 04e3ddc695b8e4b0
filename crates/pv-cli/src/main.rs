//! player_variables merge CLI
//!
//! Command-line tool for merging several mods' player_variables.scr changes
//! and extra files into a single pak.

use clap::{Parser, Subcommand, ValueEnum};
use pv_core::{
    analyze, run_merge, ConsolePrompt, Decider, FirstChoice, LastChoice, MergeConfig,
    MergeOutcome, MergeReport, ParamSet, SkippedMod,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pv-cli")]
#[command(about = "Merge player_variables.scr mods into one pak", long_about = None)]
#[command(version)]
struct Cli {
    /// Log progress (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where paths come from: a config file, or the folder layout under a root
#[derive(clap::Args)]
struct Location {
    /// Root folder holding the conventional layout
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// JSON config file (takes precedence over --root)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Location {
    fn load(&self) -> pv_core::Result<MergeConfig> {
        match &self.config {
            Some(path) => MergeConfig::load(path),
            None => Ok(MergeConfig::for_root(&self.root)),
        }
    }
}

/// How conflicts are decided
#[derive(Clone, Copy, ValueEnum)]
enum Policy {
    /// Ask on the terminal
    Interactive,
    /// Take the earliest mod's version
    First,
    /// Take the latest mod's version
    Last,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the folder layout (base, mods, output)
    Init {
        /// Root folder to create the layout in
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Also write a config file describing the layout
        #[arg(long)]
        write_config: Option<PathBuf>,
    },

    /// Merge all mods and write the output pak
    Merge {
        #[command(flatten)]
        location: Location,

        /// Conflict policy
        #[arg(short, long, value_enum, default_value = "interactive")]
        policy: Policy,

        /// Write a JSON report of every decision
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Show every changed parameter and extra file without writing anything
    Diff {
        #[command(flatten)]
        location: Location,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse and list the declarations of a single parameter file
    Params {
        /// Path to the .scr file
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Commands) -> pv_core::Result<()> {
    match command {
        Commands::Init { root, write_config } => cmd_init(&root, write_config.as_deref()),
        Commands::Merge {
            location,
            policy,
            report,
        } => cmd_merge(&location.load()?, policy, report.as_deref()),
        Commands::Diff { location, json } => cmd_diff(&location.load()?, json),
        Commands::Params { file } => cmd_params(&file),
    }
}

fn cmd_init(root: &Path, write_config: Option<&Path>) -> pv_core::Result<()> {
    let config = MergeConfig::for_root(root);
    let created = config.create_dirs()?;

    if created.is_empty() {
        println!("Folder layout already exists under {}", root.display());
    } else {
        for dir in &created {
            println!("Created {}", dir.display());
        }
    }

    if let Some(path) = write_config {
        config.save(path)?;
        println!("Wrote config: {}", path.display());
    }

    println!();
    println!("Put the original base pak at: {}", config.base_archive.display());
    println!("Put mods into:                {}", config.mods_dir.display());
    Ok(())
}

fn cmd_merge(config: &MergeConfig, policy: Policy, report_path: Option<&Path>) -> pv_core::Result<()> {
    let outcome = match policy {
        Policy::Interactive => merge_with(config, &mut ConsolePrompt::stdio())?,
        Policy::First => merge_with(config, &mut FirstChoice)?,
        Policy::Last => merge_with(config, &mut LastChoice)?,
    };

    match outcome {
        MergeOutcome::Written(report) => {
            print_report(&report);
            if let Some(path) = report_path {
                report.save(path)?;
                println!("Report written to {}", path.display());
            }
        }
        MergeOutcome::NoMods { skipped } => {
            print_skipped(&skipped);
            println!();
            println!("Process finished as no suitable mods were found.");
        }
        MergeOutcome::NoChanges { skipped } => {
            print_skipped(&skipped);
            println!();
            println!("=== Process finished. No changes were found to apply. ===");
        }
    }

    Ok(())
}

fn merge_with<D: Decider>(config: &MergeConfig, decider: &mut D) -> pv_core::Result<MergeOutcome> {
    run_merge(config, decider)
}

fn print_report(report: &MergeReport) {
    println!();
    println!("Parameters:");
    for d in &report.params {
        let how = if d.was_conflict() { "Chosen" } else { "Auto" };
        println!("  [{}] '{}' from '{}'", how, d.subject, d.source);
    }
    if report.params.is_empty() {
        println!("  (no parameter changes)");
    }

    println!();
    println!("Additional files:");
    for d in &report.files {
        let how = if d.was_conflict() { "Chosen" } else { "Auto" };
        println!("  [{}] '{}' from '{}'", how, d.subject, d.source);
    }
    if report.files.is_empty() {
        println!("  (no additional files)");
    }

    print_skipped(&report.skipped);

    println!();
    println!(
        "Parameter file: {} replaced, {} inserted, {} appended",
        report.stats.replaced, report.stats.inserted, report.stats.appended
    );
    println!(
        "Archive: {} files, {} bytes",
        report.archive.files_written, report.archive.bytes_written
    );
    println!();
    println!("=== Utility finished successfully! ===");
    println!("Your finished mod can be found here: {}", report.archive.output.display());
}

fn print_skipped(skipped: &[SkippedMod]) {
    if skipped.is_empty() {
        return;
    }
    println!();
    println!("Skipped mods ({}):", skipped.len());
    for s in skipped {
        println!("  {}: {}", s.source, s.reason);
    }
}

fn cmd_diff(config: &MergeConfig, json: bool) -> pv_core::Result<()> {
    let analysis = analyze(config)?;

    if json {
        let value = serde_json::json!({
            "params": &analysis.param_changes,
            "files": analysis
                .registry
                .entries()
                .iter()
                .map(|(path, c)| (path.clone(), c.iter().map(|c| c.source.clone()).collect::<Vec<_>>()))
                .collect::<std::collections::BTreeMap<_, _>>(),
            "file_conflicts": analysis.registry.conflicting_paths().collect::<Vec<_>>(),
            "skipped": &analysis.intake.skipped,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return analysis.close();
    }

    println!(
        "Base: {} parameters from {}",
        analysis.base_params.len(),
        config.base_archive.display()
    );
    println!(
        "Mods: {} looked at, {} with a parameter file",
        analysis.intake.mods_seen,
        analysis.intake.param_sources.len()
    );
    print_skipped(&analysis.intake.skipped);

    println!();
    println!("Changed parameters ({}):", analysis.param_changes.len());
    for (key, candidates) in &analysis.param_changes {
        let marker = if candidates.len() > 1 { " [CONFLICT]" } else { "" };
        let base = analysis.base_params.get(key).unwrap_or("<new>");
        println!("  {}{}", key, marker);
        println!("    base: {}", base);
        for (i, c) in candidates.iter().enumerate() {
            println!("    {}. {} (from {})", i + 1, c.value, c.source);
        }
    }

    println!();
    println!("Additional files ({}):", analysis.registry.len());
    for (path, candidates) in analysis.registry.entries() {
        let marker = if candidates.len() > 1 { " [CONFLICT]" } else { "" };
        let sources: Vec<&str> = candidates.iter().map(|c| c.source.as_str()).collect();
        println!("  {}{} <- {}", path, marker, sources.join(", "));
    }

    let conflicting: Vec<&str> = analysis.registry.conflicting_paths().collect();
    if !conflicting.is_empty() {
        println!();
        println!("File conflicts to decide ({}): {}", conflicting.len(), conflicting.join(", "));
    }

    analysis.close()
}

fn cmd_params(file: &Path) -> pv_core::Result<()> {
    let bytes = fs::read(file).map_err(|e| pv_core::Error::FileRead {
        path: file.to_path_buf(),
        source: e,
    })?;
    let params = ParamSet::from_text(&String::from_utf8_lossy(&bytes));

    println!("File: {}", file.display());
    println!("Parameters: {}", params.len());
    println!();

    for (key, declaration) in params.iter() {
        println!("{}\t{}", key, declaration);
    }

    Ok(())
}
