//! Energy bands and their resolution onto a sampled wavelength grid
//!
//! An [`EnergyBand`] is a named wavelength window in angstroms. Before any
//! integration can happen the band has to be mapped onto the sample indices of
//! the wavelength grid a dataset was produced on; see [`resolve_bands`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::ev_to_angstrom;

/// Wavelength of the hydrogen Lyman edge (13.6 eV) in angstroms
pub const LYMAN_EDGE_ANGSTROM: f64 = 912.11;

/// Long wavelength end of the Lyman-Werner band (~11.2 eV) in angstroms
pub const LYMAN_WERNER_UPPER_ANGSTROM: f64 = 1108.0;

/// Errors that can occur when defining or resolving energy bands
#[derive(Debug, Error, PartialEq)]
pub enum BandError {
    #[error("Band '{label}' has non-finite bounds")]
    NonFinite { label: String },

    #[error("Band '{label}' has negative bounds {low}..{high}")]
    Negative { label: String, low: f64, high: f64 },

    #[error("Band '{label}' is inverted or empty: {low}..{high}")]
    Inverted { label: String, low: f64, high: f64 },

    #[error("Band '{label}' lies above the wavelength grid: no sample exceeds {low} Å")]
    AboveGrid { label: String, low: f64 },

    #[error("Band '{label}' lies below the wavelength grid: no sample is under {high} Å")]
    BelowGrid { label: String, high: f64 },

    #[error("Band '{label}' ({low}..{high} Å) contains no grid samples")]
    EmptyRange { label: String, low: f64, high: f64 },
}

/// A named wavelength interval in angstroms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyBand {
    /// Short identifier, e.g. "H0" or "FUV"
    pub label: String,

    /// Lower wavelength bound in angstroms
    pub wl_low: f64,

    /// Upper wavelength bound in angstroms
    pub wl_high: f64,
}

impl EnergyBand {
    /// Create a new band from angstrom bounds
    ///
    /// # Arguments
    ///
    /// * `label` - Identifier used to look the band up in results
    /// * `wl_low` - Lower wavelength bound in angstroms
    /// * `wl_high` - Upper wavelength bound in angstroms
    ///
    /// # Returns
    ///
    /// The band, or an error if the bounds are non-finite, negative or inverted
    pub fn new(label: impl Into<String>, wl_low: f64, wl_high: f64) -> Result<Self, BandError> {
        let label = label.into();
        if !wl_low.is_finite() || !wl_high.is_finite() {
            return Err(BandError::NonFinite { label });
        }
        if wl_low < 0.0 || wl_high < 0.0 {
            return Err(BandError::Negative {
                label,
                low: wl_low,
                high: wl_high,
            });
        }
        if wl_low >= wl_high {
            return Err(BandError::Inverted {
                label,
                low: wl_low,
                high: wl_high,
            });
        }
        Ok(Self {
            label,
            wl_low,
            wl_high,
        })
    }

    /// Create a band from photon energy bounds in electron-volts
    ///
    /// The higher energy maps to the lower wavelength bound.
    pub fn from_ev_bounds(
        label: impl Into<String>,
        low_ev: f64,
        high_ev: f64,
    ) -> Result<Self, BandError> {
        Self::new(label, ev_to_angstrom(high_ev), ev_to_angstrom(low_ev))
    }

    /// Width of the band in angstroms
    pub fn width(&self) -> f64 {
        self.wl_high - self.wl_low
    }
}

/// The band set used throughout the cluster analysis
///
/// * `H0`  - hydrogen ionizing photons, shortward of the Lyman edge
/// * `FUV` - far ultraviolet, Lyman edge to 6 eV
/// * `LW`  - Lyman-Werner, Lyman edge to 1108 Å (Sternberg et al. 2014)
pub fn default_bands() -> Vec<EnergyBand> {
    vec![
        EnergyBand {
            label: "H0".to_string(),
            wl_low: 0.0,
            wl_high: LYMAN_EDGE_ANGSTROM,
        },
        EnergyBand {
            label: "FUV".to_string(),
            wl_low: LYMAN_EDGE_ANGSTROM,
            wl_high: ev_to_angstrom(6.0),
        },
        EnergyBand {
            label: "LW".to_string(),
            wl_low: LYMAN_EDGE_ANGSTROM,
            wl_high: LYMAN_WERNER_UPPER_ANGSTROM,
        },
    ]
}

/// Inclusive index range of a band on a wavelength grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandIndexRange {
    /// First sample strictly above the lower bound
    pub low: usize,

    /// Last sample strictly below the upper bound
    pub high: usize,
}

impl BandIndexRange {
    /// Number of grid samples in the range
    pub fn sample_count(&self) -> usize {
        self.high - self.low + 1
    }

    /// Slice a per-wavelength row down to the band
    pub fn slice<'a>(&self, values: &'a [f64]) -> &'a [f64] {
        &values[self.low..=self.high]
    }
}

/// A band together with its index range on one particular grid
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBand {
    pub band: EnergyBand,
    pub range: BandIndexRange,
}

/// Resolve a single band onto an ascending wavelength grid
///
/// Samples that sit exactly on a band edge are excluded. With typical grid
/// resolution this is an acceptable approximation, not a quadrature boundary.
pub fn resolve_band(grid: &[f64], band: &EnergyBand) -> Result<BandIndexRange, BandError> {
    let low = grid
        .iter()
        .position(|&wl| wl > band.wl_low)
        .ok_or_else(|| BandError::AboveGrid {
            label: band.label.clone(),
            low: band.wl_low,
        })?;

    let high = grid
        .iter()
        .rposition(|&wl| wl < band.wl_high)
        .ok_or_else(|| BandError::BelowGrid {
            label: band.label.clone(),
            high: band.wl_high,
        })?;

    if low > high {
        return Err(BandError::EmptyRange {
            label: band.label.clone(),
            low: band.wl_low,
            high: band.wl_high,
        });
    }

    Ok(BandIndexRange { low, high })
}

/// Resolve every band onto the grid, preserving band order
///
/// Fails on the first band that does not intersect the grid.
pub fn resolve_bands(grid: &[f64], bands: &[EnergyBand]) -> Result<Vec<ResolvedBand>, BandError> {
    bands
        .iter()
        .map(|band| {
            resolve_band(grid, band).map(|range| ResolvedBand {
                band: band.clone(),
                range,
            })
        })
        .collect()
}
