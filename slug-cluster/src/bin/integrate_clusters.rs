//! Integrate and cache every configured cluster mass
//!
//! Reads the per-trial spectra of each (mass, process) model, integrates them
//! over the configured energy bands, stacks all trials and writes the
//! aggregate to the cache under `<output-dir>/cache`. Masses that are already
//! cached are only re-read from the cache unless `--force` is given.
//!
//! # Usage
//!
//! ```bash
//! # All default masses from JSON tables
//! cargo run --release --bin integrate_clusters -- --output-dir /data/slug --format json
//!
//! # Two masses with Simpson's rule, recomputing the cache
//! cargo run --release --bin integrate_clusters -- --output-dir /data/slug --format json \
//!     --log-mass 2.0,3.0 --rule simpson --force
//! ```

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use slug_cluster::config::AnalysisConfig;
use slug_cluster::result::AggregateResult;
use slug_cluster::shared_args::AnalysisArgs;
use slug_cluster::{ClusterAnalysis, JsonTableReader, OutputFormat};

#[derive(Parser, Debug)]
#[command(
    name = "Cluster Integrator",
    about = "Integrates cluster spectra over energy bands and caches trial statistics",
    long_about = None
)]
struct Args {
    #[command(flatten)]
    analysis: AnalysisArgs,

    /// Recompute even when a cached aggregate exists
    #[arg(long)]
    force: bool,

    /// Time step shown in the summary table
    #[arg(long, default_value_t = 0)]
    time_index: usize,

    /// Write the effective configuration to this JSON file and exit
    #[arg(long)]
    dump_config: Option<std::path::PathBuf>,
}

fn print_summary(config: &AnalysisConfig, results: &[AggregateResult], time_index: usize) {
    let mut header = format!("{:<8} {:>7} {:>11} {:>11}", "logM", "trials", "M0 [Msun]", "Lbol/M");
    for band in &config.bands {
        header.push_str(&format!(
            " {:>11} {:>11}",
            format!("Psi_{}", band.label),
            format!("Xi_{}", band.label)
        ));
    }
    println!("{header}");
    println!("{:-<width$}", "", width = header.len());

    for result in results {
        if time_index >= result.ntime {
            println!(
                "{:<8.1} time index {} out of range ({} steps)",
                result.log_mass, time_index, result.ntime
            );
            continue;
        }
        let mut line = format!(
            "{:<8.1} {:>7} {:>11.4e} {:>11.4e}",
            result.log_mass,
            result.ntrial_tot,
            result.target_mass,
            result.lbol_per_mass[time_index]
        );
        for band in &result.bands {
            line.push_str(&format!(
                " {:>11.4e} {:>11.4e}",
                band.luminosity_per_mass[time_index], band.photon_rate_per_mass[time_index]
            ));
        }
        println!("{line}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let config = args.analysis.to_config()?;

    if let Some(path) = &args.dump_config {
        config.save_to_file(path)?;
        println!("Wrote configuration to {}", path.display());
        return Ok(());
    }

    if config.format != OutputFormat::Json {
        return Err(format!(
            "This tool reads JSON tables; convert the {} output first and pass --format json",
            config.format
        )
        .into());
    }

    let analysis = ClusterAnalysis::new(config.clone(), JsonTableReader::new())?;

    let progress = ProgressBar::new(config.log_masses.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let mut results = Vec::with_capacity(config.log_masses.len());
    for &log_mass in &config.log_masses {
        progress.set_message(format!("logM {:.1}", log_mass));
        results.push(analysis.integrate_spec(log_mass, args.force)?);
        progress.inc(1);
    }
    progress.finish_with_message("done");

    info!("Cache directory: {}", analysis.cache().dir().display());
    println!();
    print_summary(&config, &results, args.time_index);

    Ok(())
}
