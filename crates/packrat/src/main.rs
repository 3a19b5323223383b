#![allow(clippy::print_stdout)] // phase banners are the CLI's output contract

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
use packrat::{
    collector::DependencyCollector,
    config::Config,
    observer::PytestProbe,
};

#[derive(Parser)]
#[command(
    name = "packrat",
    version,
    about = "Package a Python script's dependencies into a deployment bundle"
)]
struct Cli {
    /// Path to the entry-point script
    entry_path: PathBuf,

    /// Root directory of the project
    root_path: PathBuf,

    /// Output directory for the bundle (defaults to the entry point's
    /// parent directory)
    #[arg(long)]
    output_path: Option<PathBuf>,

    /// Path to the test suite used for runtime discovery
    #[arg(long, required = true)]
    tests_path: PathBuf,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let config = Config::load(&cli.root_path)?;
    let probe = PytestProbe::new(config.python_executable.clone());

    let mut collector = DependencyCollector::new(
        config,
        &cli.entry_path,
        &cli.root_path,
        cli.output_path.as_deref(),
    )?;

    println!("Collecting static dependencies...");
    collector.collect_static()?;

    println!("\nCollecting runtime dependencies...");
    collector.collect_runtime(&probe, &cli.tests_path)?;

    println!("\nCopying dependencies...");
    collector.assemble_bundle()?;

    Ok(())
}
