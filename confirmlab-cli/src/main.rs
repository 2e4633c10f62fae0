//! ConfirmLab CLI — synthetic batch runs and configuration checks.
//!
//! Commands:
//! - `simulate` — generate a seeded synthetic cohort, run a batch, print the summary
//! - `check-config` — validate a TOML config and print its fingerprint

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use confirmlab_runner::{BatchOutput, BatchRunner, DetectionConfig, SyntheticCohort};

#[derive(Parser)]
#[command(
    name = "confirmlab",
    about = "ConfirmLab CLI — confirmed progression detection"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a batch on a seeded synthetic cohort.
    Simulate {
        /// Path to a TOML config file. Defaults to clinical defaults.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of synthetic subjects.
        #[arg(long, default_value_t = 1000)]
        subjects: usize,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Worker threads (0 = all cores).
        #[arg(long, default_value_t = 0)]
        threads: usize,

        /// Print records and diagnostics as JSON on stdout.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Validate a TOML config and print its fingerprint.
    CheckConfig {
        /// Path to a TOML config file.
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            config,
            subjects,
            seed,
            threads,
            json,
        } => run_simulate(config, subjects, seed, threads, json),
        Commands::CheckConfig { config } => run_check_config(config),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<DetectionConfig> {
    match path {
        Some(path) => DetectionConfig::from_file(&path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(DetectionConfig::default()),
    }
}

fn run_simulate(
    config: Option<PathBuf>,
    subjects: usize,
    seed: u64,
    threads: usize,
    json: bool,
) -> Result<()> {
    let config = load_config(config)?;
    let cohort = SyntheticCohort {
        subjects,
        seed,
        ..SyntheticCohort::default()
    }
    .generate()
    .context("generating synthetic cohort")?;
    info!("generated {} synthetic subject(s) with seed {seed}", cohort.len());

    let runner = BatchRunner::new(config)?.with_threads(threads);
    let total = cohort.len();
    let step = (total / 10).max(1);
    let output = runner.run_with_progress(&cohort, |done, total| {
        if done % step == 0 || done == total {
            info!("{done}/{total} subjects analysed");
        }
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_summary(&output);
    }
    Ok(())
}

fn run_check_config(path: PathBuf) -> Result<()> {
    let config = load_config(Some(path))?;
    config.validate()?;
    println!("config OK");
    println!("  fingerprint: {}", config.fingerprint());
    println!("  target:      {}", config.progression_target()?.name());
    println!("  roving:      {:?}", config.roving_policy());
    Ok(())
}

fn print_summary(output: &BatchOutput) {
    let s = &output.summary;
    println!("=== Batch Summary ===");
    println!("Subjects:           {}", s.subjects_total);
    println!("  with event:       {}", s.subjects_with_events);
    println!("  excluded:         {}", s.subjects_excluded);
    println!("Events:             {}", s.events_total);
    println!("  independent:      {}", s.independent);
    println!("  episode-assoc.:   {}", s.episode_associated);
    println!("  unclassified:     {}", s.unclassified);
    println!("Rejections:         {}", s.rejections_total);
    println!("Dropped rows:       {}", s.dropped_measurements);
    println!("Config fingerprint: {}", s.config_fingerprint);

    if !output.diagnostics.is_empty() {
        println!();
        println!("=== Diagnostics ===");
        for d in &output.diagnostics {
            println!("{:<12} {:<22} {}", d.subject.to_string(), d.code, d.message);
        }
    }
}
