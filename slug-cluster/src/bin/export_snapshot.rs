//! Export per-trial values at one time step across cluster masses
//!
//! Writes one fixed-width table per quantity (`LFUV0.txt`, `QH0.txt`,
//! `Lbol0.txt`, `hnuH0.txt`, `hnuFUV0.txt` for time index 0), one column per
//! cluster mass and one row per trial. Aggregates come from the cache and are
//! computed on demand.
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --bin export_snapshot -- --output-dir /data/slug --format json --out-dir tables
//! ```

use std::path::PathBuf;

use clap::Parser;
use log::info;
use slug_cluster::export::{default_snapshots, write_snapshot_file};
use slug_cluster::shared_args::AnalysisArgs;
use slug_cluster::{ClusterAnalysis, JsonTableReader};

#[derive(Parser, Debug)]
#[command(
    name = "Snapshot Export",
    about = "Writes per-trial band energetics at one time step as text tables",
    long_about = None
)]
struct Args {
    #[command(flatten)]
    analysis: AnalysisArgs,

    /// Time step to export
    #[arg(long, default_value_t = 0)]
    time_index: usize,

    /// Directory for the text tables
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Recompute aggregates even when cached
    #[arg(long)]
    force: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let config = args.analysis.to_config()?;

    let analysis = ClusterAnalysis::new(config, JsonTableReader::new())?;
    let results = analysis.integrate_all(args.force)?;

    std::fs::create_dir_all(&args.out_dir)?;
    for spec in default_snapshots(args.time_index) {
        let path = write_snapshot_file(&args.out_dir, &spec, &results, args.time_index)?;
        info!("Wrote {}", path.display());
        println!("{}", path.display());
    }

    Ok(())
}
