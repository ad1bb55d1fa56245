//! Cache-backed integration of cluster simulation batches
//!
//! [`ClusterAnalysis::integrate_spec`] is the entry point: it returns the
//! cached aggregate of a cluster mass when one exists, and otherwise reads
//! every process partition, integrates and stacks all trials, reduces them to
//! medians and stores the result before returning it.

use log::{debug, info};
use thiserror::Error;

use crate::aggregate::{AggregateError, TrialAggregator};
use crate::cache::{AggregateCache, CacheError};
use crate::config::{AnalysisConfig, ConfigError};
use crate::dataset::{ClusterDataset, DatasetError};
use crate::reader::{ReaderError, SimulationOutputReader};
use crate::result::AggregateResult;

/// Any failure while producing the aggregate of a cluster mass
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Reading model '{model}' failed: {source}")]
    Reader {
        model: String,
        #[source]
        source: ReaderError,
    },

    #[error("Model '{model}' has an invalid layout: {source}")]
    Dataset {
        model: String,
        #[source]
        source: DatasetError,
    },

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Integration of one batch of cluster simulations
pub struct ClusterAnalysis<R> {
    config: AnalysisConfig,
    reader: R,
    cache: AggregateCache,
}

impl<R: SimulationOutputReader> ClusterAnalysis<R> {
    /// Create an analysis over a validated configuration
    pub fn new(config: AnalysisConfig, reader: R) -> Result<Self, AnalysisError> {
        config.validate()?;
        let cache = config.cache();
        Ok(Self {
            config,
            reader,
            cache,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn cache(&self) -> &AggregateCache {
        &self.cache
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Aggregate of one cluster mass, from cache unless `force_override`
    ///
    /// Cached entries are returned unchanged. A failure on any partition
    /// aborts the whole mass; nothing is cached in that case.
    pub fn integrate_spec(
        &self,
        log_mass: f64,
        force_override: bool,
    ) -> Result<AggregateResult, AnalysisError> {
        if !force_override {
            if let Some(cached) = self.cache.load(log_mass)? {
                info!(
                    "logM {:.1}: read from cache {}",
                    log_mass,
                    self.cache.entry_path(log_mass).display()
                );
                return Ok(cached);
            }
        }

        info!(
            "logM {:.1}: integrating {} partitions from {}",
            log_mass,
            self.config.processes.len(),
            self.config.output_dir.display()
        );

        let mut aggregator = TrialAggregator::new(self.config.bands.clone());
        for &process in &self.config.processes {
            let dataset = self.read_partition(log_mass, process)?;
            let appended = aggregator.extend(&dataset, self.config.rule)?;
            info!(
                "logM {:.1}: process {} contributed {} trials",
                log_mass, process, appended
            );
        }

        let result = aggregator.finish(log_mass, self.config.model_base.clone(), self.config.rule)?;
        let path = self.cache.store(&result)?;
        info!(
            "logM {:.1}: {} trials aggregated, cached at {}",
            log_mass,
            result.ntrial_tot,
            path.display()
        );
        Ok(result)
    }

    /// Aggregates of every configured mass, in configuration order
    pub fn integrate_all(&self, force_override: bool) -> Result<Vec<AggregateResult>, AnalysisError> {
        self.config
            .log_masses
            .iter()
            .map(|&log_mass| self.integrate_spec(log_mass, force_override))
            .collect()
    }

    /// Read the three tables of one partition and assemble the dataset
    fn read_partition(&self, log_mass: f64, process: u32) -> Result<ClusterDataset, AnalysisError> {
        let model = self.config.model_name(log_mass, process);
        let dir = &self.config.output_dir;
        let format = self.config.format;
        debug!("Reading {} ({}) from {}", model, format, dir.display());

        let reader_err = |source| AnalysisError::Reader {
            model: model.clone(),
            source,
        };
        let spectra = self
            .reader
            .read_spectra(&model, dir, format)
            .map_err(reader_err)?;
        let photometry = self
            .reader
            .read_photometry(&model, dir, format)
            .map_err(reader_err)?;
        let properties = self
            .reader
            .read_properties(&model, dir, format)
            .map_err(reader_err)?;

        ClusterDataset::from_tables(model.clone(), process, spectra, photometry, properties)
            .map_err(|source| AnalysisError::Dataset { model, source })
    }
}
