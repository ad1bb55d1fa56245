//! Aggregated cluster energetics
//!
//! [`AggregateResult`] is what gets cached per cluster mass: the stacked
//! per-trial time series of every quantity (rows in the order recorded in
//! `trial_keys`), their medians over trials, and the medians normalized by the
//! initial cluster mass.

use std::str::FromStr;

use ndarray::{s, Array1, Array2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::integrator::TrialKey;
use crate::photometry::band::EnergyBand;
use crate::photometry::quadrature::IntegrationRule;
use crate::stats::percentile_axis0;

/// Version of the cached [`AggregateResult`] layout
///
/// Bump whenever a field is added, removed or changes meaning; older cache
/// entries are then recomputed instead of decoded.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Errors from selecting a quantity out of an aggregate
#[derive(Debug, Error, PartialEq)]
pub enum FieldError {
    #[error("Unknown field '{0}', expected one of Lbol, L, Q, hnu")]
    UnknownField(String),

    #[error("Field '{0}' requires a band")]
    MissingBand(Field),

    #[error("Band '{0}' is not part of this aggregate")]
    UnknownBand(String),

    #[error("Time index {index} out of range, aggregate has {ntime} steps")]
    TimeIndexOutOfRange { index: usize, ntime: usize },
}

/// Quantity selector for consumers of the aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Bolometric luminosity
    Lbol,
    /// Band luminosity
    Luminosity,
    /// Band photon emission rate
    PhotonRate,
    /// Band mean photon energy
    MeanPhotonEnergy,
}

impl Field {
    pub fn requires_band(&self) -> bool {
        !matches!(self, Field::Lbol)
    }

    /// Short name used in file names and on the command line
    pub fn short_name(&self) -> &'static str {
        match self {
            Field::Lbol => "Lbol",
            Field::Luminosity => "L",
            Field::PhotonRate => "Q",
            Field::MeanPhotonEnergy => "hnu",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

impl FromStr for Field {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Lbol" => Ok(Field::Lbol),
            "L" => Ok(Field::Luminosity),
            "Q" => Ok(Field::PhotonRate),
            "hnu" => Ok(Field::MeanPhotonEnergy),
            other => Err(FieldError::UnknownField(other.to_string())),
        }
    }
}

/// Stacked and median values of one band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandAggregate {
    pub band: EnergyBand,
    /// trials × time, L☉
    pub luminosity: Array2<f64>,
    /// trials × time, photons s⁻¹
    pub photon_rate: Array2<f64>,
    /// trials × time, eV
    pub mean_photon_energy: Array2<f64>,
    pub luminosity_median: Array1<f64>,
    pub photon_rate_median: Array1<f64>,
    pub mean_photon_energy_median: Array1<f64>,
    /// Ψ: median luminosity per unit initial mass, L☉ M☉⁻¹
    pub luminosity_per_mass: Array1<f64>,
    /// Ξ: median photon rate per unit initial mass, s⁻¹ M☉⁻¹
    pub photon_rate_per_mass: Array1<f64>,
}

/// Trial-aggregated energetics of one cluster mass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub version: u32,
    /// log10 of the initial cluster mass
    pub log_mass: f64,
    pub model_base: String,
    pub rule: IntegrationRule,
    /// Total number of trials over all process partitions
    pub ntrial_tot: usize,
    pub ntime: usize,
    /// Simulation times in years
    pub time: Array1<f64>,
    /// Target initial mass in M☉
    pub target_mass: f64,
    /// Identity of every stacked row
    pub trial_keys: Vec<TrialKey>,
    /// trials × time, L☉
    pub lbol: Array2<f64>,
    pub lbol_median: Array1<f64>,
    /// Median bolometric luminosity per unit initial mass
    pub lbol_per_mass: Array1<f64>,
    /// Per-band aggregates in band order
    pub bands: Vec<BandAggregate>,
}

/// Borrowed stacked values and median of one quantity
#[derive(Debug, Clone, Copy)]
pub struct FieldView<'a> {
    pub stacked: &'a Array2<f64>,
    pub median: &'a Array1<f64>,
}

/// Percentile envelope and median of one quantity, normalized
#[derive(Debug, Clone, PartialEq)]
pub struct PercentileBand {
    pub lower: Array1<f64>,
    pub upper: Array1<f64>,
    pub median: Array1<f64>,
}

impl AggregateResult {
    /// Whether this result was written with the current cache layout
    pub fn is_current(&self) -> bool {
        self.version == CACHE_FORMAT_VERSION
    }

    /// Labels of all bands, in order
    pub fn band_labels(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.band.label.as_str()).collect()
    }

    pub fn band(&self, label: &str) -> Option<&BandAggregate> {
        self.bands.iter().find(|b| b.band.label == label)
    }

    /// Select a quantity, with a band for everything except `Lbol`
    pub fn field(&self, field: Field, band: Option<&str>) -> Result<FieldView<'_>, FieldError> {
        let view = match field {
            Field::Lbol => FieldView {
                stacked: &self.lbol,
                median: &self.lbol_median,
            },
            Field::Luminosity => {
                let agg = self.band_for(field, band)?;
                FieldView {
                    stacked: &agg.luminosity,
                    median: &agg.luminosity_median,
                }
            }
            Field::PhotonRate => {
                let agg = self.band_for(field, band)?;
                FieldView {
                    stacked: &agg.photon_rate,
                    median: &agg.photon_rate_median,
                }
            }
            Field::MeanPhotonEnergy => {
                let agg = self.band_for(field, band)?;
                FieldView {
                    stacked: &agg.mean_photon_energy,
                    median: &agg.mean_photon_energy_median,
                }
            }
        };
        Ok(view)
    }

    fn band_for(&self, field: Field, band: Option<&str>) -> Result<&BandAggregate, FieldError> {
        let label = band.ok_or(FieldError::MissingBand(field))?;
        self.band(label)
            .ok_or_else(|| FieldError::UnknownBand(label.to_string()))
    }

    /// Values of every trial at one time step
    pub fn snapshot(
        &self,
        field: Field,
        band: Option<&str>,
        time_index: usize,
    ) -> Result<Array1<f64>, FieldError> {
        if time_index >= self.ntime {
            return Err(FieldError::TimeIndexOutOfRange {
                index: time_index,
                ntime: self.ntime,
            });
        }
        let view = self.field(field, band)?;
        Ok(view.stacked.slice(s![.., time_index]).to_owned())
    }

    /// Lower / upper percentile curves and median over time
    ///
    /// Energetic quantities are divided by the target mass; mean photon energy
    /// is left as is.
    pub fn percentile_band(
        &self,
        field: Field,
        band: Option<&str>,
        percentiles: (f64, f64),
    ) -> Result<PercentileBand, FieldError> {
        let view = self.field(field, band)?;
        let norm = match field {
            Field::MeanPhotonEnergy => 1.0,
            _ => self.target_mass,
        };

        let normalized = view.stacked / norm;
        Ok(PercentileBand {
            lower: percentile_axis0(&normalized, percentiles.0),
            upper: percentile_axis0(&normalized, percentiles.1),
            median: view.median / norm,
        })
    }
}
