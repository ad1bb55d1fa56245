//! Stacking of per-trial results across process partitions
//!
//! The aggregator is fed one [`ClusterDataset`] per process partition. Each
//! call to [`TrialAggregator::extend`] integrates every trial of the partition
//! and appends one row per trial to the stacked quantities, so the row order is
//! always the (process, trial) visiting order. That order is also recorded in
//! the trial keys so consumers never have to rely on position alone.

use log::{debug, warn};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use thiserror::Error;

use crate::dataset::{ClusterDataset, DatasetError};
use crate::integrator::{integrate_trial, IntegrationError, TrialIntegrationResult, TrialKey};
use crate::photometry::band::{resolve_bands, BandError, EnergyBand};
use crate::photometry::quadrature::IntegrationRule;
use crate::result::{AggregateResult, BandAggregate, CACHE_FORMAT_VERSION};
use crate::stats::median_axis0;

/// Errors raised while stacking trials
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("Model '{model}': {source}")]
    Band {
        model: String,
        #[source]
        source: BandError,
    },

    #[error("Partition {process} does not share the time axis of earlier partitions")]
    TimeAxisMismatch { process: u32 },

    #[error("No trials were aggregated")]
    Empty,

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Integration(#[from] IntegrationError),

    #[error("Failed to stack trial rows: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Stacked quantities of one band, trials × time
#[derive(Debug, Clone)]
struct BandStack {
    luminosity: Array2<f64>,
    photon_rate: Array2<f64>,
    mean_photon_energy: Array2<f64>,
}

impl BandStack {
    fn empty(ntime: usize) -> Self {
        Self {
            luminosity: Array2::zeros((0, ntime)),
            photon_rate: Array2::zeros((0, ntime)),
            mean_photon_energy: Array2::zeros((0, ntime)),
        }
    }
}

/// Running stack of trial results for one cluster mass
#[derive(Debug, Clone)]
pub struct TrialAggregator {
    bands: Vec<EnergyBand>,
    time: Option<Array1<f64>>,
    target_mass: Option<f64>,
    keys: Vec<TrialKey>,
    lbol: Array2<f64>,
    stacks: Vec<BandStack>,
}

impl TrialAggregator {
    /// Start an empty aggregate over the given bands
    pub fn new(bands: Vec<EnergyBand>) -> Self {
        let stacks = bands.iter().map(|_| BandStack::empty(0)).collect();
        Self {
            bands,
            time: None,
            target_mass: None,
            keys: Vec::new(),
            lbol: Array2::zeros((0, 0)),
            stacks,
        }
    }

    /// Number of trials stacked so far
    pub fn ntrial_tot(&self) -> usize {
        self.keys.len()
    }

    /// Identity of every stacked row, in row order
    pub fn trial_keys(&self) -> &[TrialKey] {
        &self.keys
    }

    /// Bolometric luminosity stacked so far
    pub fn lbol(&self) -> &Array2<f64> {
        &self.lbol
    }

    /// Integrate every trial of a partition and append the rows
    ///
    /// Bands are resolved onto the wavelength grid of every partition. The
    /// first partition fixes the time axis; later partitions must match it.
    /// Trials are integrated in parallel and stacked in ascending trial order.
    /// Returns the number of trials appended.
    pub fn extend(
        &mut self,
        dataset: &ClusterDataset,
        rule: IntegrationRule,
    ) -> Result<usize, AggregateError> {
        let resolved = resolve_bands(dataset.wavelength().as_slice(), &self.bands).map_err(
            |source| AggregateError::Band {
                model: dataset.model_name().to_string(),
                source,
            },
        )?;
        for r in &resolved {
            debug!(
                "{}: band {} -> samples {}..={}",
                dataset.model_name(),
                r.band.label,
                r.range.low,
                r.range.high
            );
        }

        if let Some(time) = &self.time {
            if time.view() != dataset.time() {
                return Err(AggregateError::TimeAxisMismatch {
                    process: dataset.process(),
                });
            }
        } else {
            let ntime = dataset.ntime();
            self.time = Some(dataset.time().to_owned());
            self.lbol = Array2::zeros((0, ntime));
            self.stacks = self.bands.iter().map(|_| BandStack::empty(ntime)).collect();
        }

        match self.target_mass {
            None => self.target_mass = Some(dataset.target_mass()),
            Some(mass) if mass != dataset.target_mass() => warn!(
                "Partition {} of {} has target mass {} but {} was seen first; keeping {}",
                dataset.process(),
                dataset.model_name(),
                dataset.target_mass(),
                mass,
                mass
            ),
            Some(_) => {}
        }

        let trials: Vec<u32> = dataset.trials().collect();
        let results = trials
            .into_par_iter()
            .map(|trial| -> Result<TrialIntegrationResult, AggregateError> {
                let key = TrialKey {
                    process: dataset.process(),
                    trial,
                };
                let spectra = dataset.trial_spectra(trial)?;
                Ok(integrate_trial(
                    key,
                    spectra,
                    dataset.wavelength(),
                    &resolved,
                    rule,
                )?)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let appended = results.len();
        for result in results {
            self.push(result)?;
        }
        debug!(
            "Stacked {} trials from {} ({} total)",
            appended,
            dataset.model_name(),
            self.ntrial_tot()
        );
        Ok(appended)
    }

    fn push(&mut self, result: TrialIntegrationResult) -> Result<(), AggregateError> {
        self.lbol.push_row(result.lbol.view())?;
        for (stack, series) in self.stacks.iter_mut().zip(&result.bands) {
            stack.luminosity.push_row(series.luminosity.view())?;
            stack.photon_rate.push_row(series.photon_rate.view())?;
            stack
                .mean_photon_energy
                .push_row(series.mean_photon_energy.view())?;
        }
        self.keys.push(result.key);
        Ok(())
    }

    /// Reduce the stacked trials to medians and mass-normalized medians
    pub fn finish(
        self,
        log_mass: f64,
        model_base: impl Into<String>,
        rule: IntegrationRule,
    ) -> Result<AggregateResult, AggregateError> {
        let (time, target_mass) = match (self.time, self.target_mass) {
            (Some(time), Some(mass)) if !self.keys.is_empty() => (time, mass),
            _ => return Err(AggregateError::Empty),
        };

        let lbol_median = median_axis0(&self.lbol);
        let lbol_per_mass = &lbol_median / target_mass;

        let bands = self
            .bands
            .into_iter()
            .zip(self.stacks)
            .map(|(band, stack)| {
                let luminosity_median = median_axis0(&stack.luminosity);
                let photon_rate_median = median_axis0(&stack.photon_rate);
                BandAggregate {
                    band,
                    mean_photon_energy_median: median_axis0(&stack.mean_photon_energy),
                    luminosity_per_mass: &luminosity_median / target_mass,
                    photon_rate_per_mass: &photon_rate_median / target_mass,
                    luminosity: stack.luminosity,
                    photon_rate: stack.photon_rate,
                    mean_photon_energy: stack.mean_photon_energy,
                    luminosity_median,
                    photon_rate_median,
                }
            })
            .collect();

        Ok(AggregateResult {
            version: CACHE_FORMAT_VERSION,
            log_mass,
            model_base: model_base.into(),
            rule,
            ntrial_tot: self.keys.len(),
            ntime: time.len(),
            time,
            target_mass,
            trial_keys: self.keys,
            lbol: self.lbol,
            lbol_median,
            lbol_per_mass,
            bands,
        })
    }
}
