use std::{
    fs, io,
    path::{Path, PathBuf},
    process,
    time::Instant,
};

use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use memory_stats::memory_stats;
use serde::Serialize;
use thiserror::Error;
use tiga::{ParseError, Strategy, formats};

pub mod models;
use models::*;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Read the strategy from a file printed by Tiga.
    #[arg(short, long, conflicts_with = "model")]
    input: Option<PathBuf>,
    /// Output file, writes the strategy as JSON.
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[arg(value_enum, short, long, default_value_t = Format::Summary)]
    format: Format,
    #[arg(value_enum, short, long, default_value_t = Model::TwoClocks, conflicts_with = "input")]
    model: Model,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum Format {
    Summary,
    Json,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("Unable to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Unable to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("Invalid strategy in {name}: {source}")]
    Parse { name: String, source: ParseError },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct Report<'s> {
    source: &'s str,
    strategy: &'s Strategy,
}

fn parse_file(path: &Path) -> Result<Strategy, CliError> {
    let source = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_owned(),
        source,
    })?;
    parse_source(&path.display().to_string(), &source)
}

fn parse_source(name: &str, source: &str) -> Result<Strategy, CliError> {
    let time_start = Instant::now();
    let strategy = formats::tiga::parse(source).map_err(|source| CliError::Parse {
        name: name.to_owned(),
        source,
    })?;
    info!(
        "Parsed {} rules over {} variables from {}. Elapsed: {:?}",
        strategy.len(),
        strategy.variables().len(),
        name,
        time_start.elapsed()
    );
    Ok(strategy)
}

fn print_summary(strategy: &Strategy) {
    println!("Variables: {}", strategy.variables().join(", "));
    for (state, actions) in strategy.sorted() {
        println!("State {state}");
        for guarded in actions {
            println!("    {guarded}");
        }
    }
    println!(
        "{} states, {} distinct transitions.",
        strategy.len(),
        strategy.transitions().len()
    );
}

fn run(args: &Args) -> Result<(), CliError> {
    let (name, strategy) = match &args.input {
        Some(path) => (path.display().to_string(), parse_file(path)?),
        None => {
            info!("Using built-in model [{}].", args.model);
            let name = args.model.to_string();
            let strategy = parse_source(&name, args.model.source())?;
            (name, strategy)
        }
    };
    let report = Report {
        source: &name,
        strategy: &strategy,
    };

    match args.format {
        Format::Summary => print_summary(&strategy),
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if let Some(path) = &args.output {
        fs::write(path, serde_json::to_string_pretty(&report)?).map_err(|source| {
            CliError::Write {
                path: path.clone(),
                source,
            }
        })?;
        info!("Wrote strategy to {}.", path.display());
    }
    Ok(())
}

fn memory_usage() -> (usize, usize) {
    if let Some(usage) = memory_stats() {
        (usage.physical_mem, usage.virtual_mem)
    } else {
        warn!("Couldn't get the current memory usage :(");
        (0, 0)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let (pre_physical_mem, pre_virtual_mem) = memory_usage();
    let time_start = Instant::now();

    if let Err(err) = run(&args) {
        error!("{err}");
        process::exit(1);
    }

    let elapsed = time_start.elapsed();
    let (post_physical_mem, post_virtual_mem) = memory_usage();
    info!(
        "Elapsed: {:?}. physical mem used: {:.2} MB. virtual mem used: {:.2} MB",
        elapsed,
        post_physical_mem.saturating_sub(pre_physical_mem) as f64 / 1048576.0,
        post_virtual_mem.saturating_sub(pre_virtual_mem) as f64 / 1048576.0
    );
}
