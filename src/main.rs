use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::info;

use cartographer::driver::{Batch, BatchSummary};
use cartographer::settings::CartographerConfig;

#[derive(Parser, Debug)]
#[command(name = "cartographer")]
#[command(about = "Export tiled planetary maps and terrain reports")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Override the output root of the configuration file
    #[arg(short, long, global = true)]
    output_root: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export every `maps` entry of a configuration file
    Maps { config: PathBuf },
    /// Write the lowest/highest point report of every `info` entry
    Info { config: PathBuf },
    /// Maps, then info
    All { config: PathBuf },
    /// Print a documented example configuration
    SampleConfig {
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn load(path: &PathBuf, output_root: Option<PathBuf>) -> Result<Batch, Box<dyn Error>> {
    let mut config = CartographerConfig::load(path)?;
    if let Some(root) = output_root {
        config.output_root = root;
    }
    info!(
        "Loaded {} with {} bodies, {} map and {} info entries",
        path.display(),
        config.bodies.len(),
        config.maps.len(),
        config.info.len()
    );
    Ok(Batch::new(config))
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let summary = match args.command {
        Command::SampleConfig { output } => {
            let json = serde_json::to_string_pretty(&CartographerConfig::sample())?;
            match output {
                Some(path) => {
                    fs::write(&path, json)?;
                    info!("Wrote example configuration to {}", path.display());
                }
                None => println!("{}", json),
            }
            return Ok(());
        }
        Command::Maps { config } => {
            let batch = load(&config, args.output_root)?;
            let mut summary = BatchSummary::default();
            batch.run_maps(&mut summary);
            summary
        }
        Command::Info { config } => {
            let batch = load(&config, args.output_root)?;
            let mut summary = BatchSummary::default();
            batch.run_info(&mut summary);
            summary
        }
        Command::All { config } => load(&config, args.output_root)?.run_all(),
    };

    let tiles: usize = summary.maps.iter().map(|m| m.tiles.len()).sum();
    let failed: usize = summary.maps.iter().map(|m| m.failed.len()).sum();
    info!(
        "Done: {} tiles written, {} tiles failed, {} reports, {} aborted passes",
        tiles,
        failed,
        summary.reports.len(),
        summary.failures
    );

    if summary.failures > 0 || failed > 0 {
        return Err(format!("{} passes aborted, {} tiles failed", summary.failures, failed).into());
    }
    Ok(())
}
