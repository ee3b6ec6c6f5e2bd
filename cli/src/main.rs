use anyhow::{bail, Context, Result};
use backend::{compare, evaluate, generate, InputBundle, ScheduledEventDraft};
use clap::{Parser, Subcommand};
use std::{fs, path::Path, path::PathBuf};

#[derive(Debug, Parser)]
#[command(version, about = "Little League season scheduler", long_about = None)]
struct Args {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Generate a schedule from an input bundle
    Generate {
        /// Path to the JSON input bundle
        #[arg(long, required(true))]
        bundle: PathBuf,
        /// Pin the matchup shuffle for reproducible output
        #[arg(long)]
        seed: Option<u64>,
        /// Write the scheduled events here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Evaluate a schedule against its bundle
    Evaluate {
        #[arg(long, required(true))]
        bundle: PathBuf,
        /// Path to a JSON list of scheduled events
        #[arg(long, required(true))]
        events: PathBuf,
    },
    /// Compare two schedules over the same bundle
    Compare {
        #[arg(long, required(true))]
        bundle: PathBuf,
        #[arg(long, required(true))]
        before: PathBuf,
        #[arg(long, required(true))]
        after: PathBuf,
    },
}

fn load_bundle(path: &Path) -> Result<InputBundle> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read bundle at {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("could not parse bundle at {}", path.display()))
}

fn load_events(path: &Path) -> Result<Vec<ScheduledEventDraft>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read events at {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("could not parse events at {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    match args.cmd {
        Commands::Generate { bundle, seed, out } => {
            let bundle = load_bundle(&bundle)?;
            log::info!(
                "generating schedule for {} teams in {} divisions",
                bundle.teams.len(),
                bundle.divisions.len()
            );

            let result = generate(&bundle, seed, None);

            if !result.errors.is_empty() {
                for error in &result.errors {
                    eprintln!("error: {error}");
                }
                bail!("generation failed with {} error(s)", result.errors.len());
            }

            for warning in &result.warnings {
                eprintln!("warning: {}", warning.message);
            }
            eprintln!(
                "placed {} events ({:?}), avg {:.1} per team",
                result.stats.total_events, result.status, result.stats.avg_per_team
            );

            let json = serde_json::to_string_pretty(&result.events)?;
            match out {
                Some(path) => fs::write(&path, json)
                    .with_context(|| format!("could not write {}", path.display()))?,
                None => println!("{json}"),
            }
        }
        Commands::Evaluate { bundle, events } => {
            let bundle = load_bundle(&bundle)?;
            let events = load_events(&events)?;

            let report = evaluate(&bundle, &events);
            for (name, metric) in report.metrics.named() {
                let mark = if metric.passed { "PASS" } else { "FAIL" };
                println!("{mark}  {name}: {}", metric.summary);
                for detail in &metric.details {
                    println!("      - {} ({})", detail.note, detail.subject);
                }
            }
            println!("overall score: {}/100", report.overall_score);
        }
        Commands::Compare {
            bundle,
            before,
            after,
        } => {
            let bundle = load_bundle(&bundle)?;
            let before = load_events(&before)?;
            let after = load_events(&after)?;

            let report = compare(&bundle, &before, &after);
            for (name, comparison) in &report.metrics {
                println!(
                    "{:?}  {name}: {} -> {}",
                    comparison.change, comparison.before, comparison.after
                );
            }
            println!(
                "score {} -> {} ({:+})",
                report.score_before, report.score_after, report.score_delta
            );
        }
    }

    Ok(())
}
