//! Band-integrated energetics of stochastic star cluster simulations
//!
//! Stochastic population synthesis produces many realizations ("trials") of a
//! cluster with a given initial mass, spread over several process partitions.
//! This crate integrates each trial's spectra over named energy bands,
//! stacks the results across all trials and partitions, reduces them to
//! medians and percentiles, and caches the aggregate per cluster mass.
//!
//! ```no_run
//! use slug_cluster::{AnalysisConfig, ClusterAnalysis, JsonTableReader};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let analysis = ClusterAnalysis::new(AnalysisConfig::default(), JsonTableReader::new())?;
//! let result = analysis.integrate_spec(2.0, false)?;
//! println!("{} trials, median Lbol(t0) = {:.3e}", result.ntrial_tot, result.lbol_median[0]);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod analysis;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod export;
pub mod integrator;
pub mod photometry;
pub mod reader;
pub mod result;
pub mod shared_args;
pub mod stats;

pub use aggregate::TrialAggregator;
pub use analysis::{AnalysisError, ClusterAnalysis};
pub use cache::AggregateCache;
pub use config::AnalysisConfig;
pub use dataset::{ClusterDataset, WavelengthGrid};
pub use integrator::{TrialIntegrationResult, TrialKey};
pub use reader::{JsonTableReader, MemoryReader, OutputFormat, SimulationOutputReader};
pub use result::{AggregateResult, Field};
