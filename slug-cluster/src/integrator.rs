//! Band energetics of a single trial
//!
//! For every time step of a trial's spectral time series this computes the
//! bolometric luminosity and, per energy band, the luminosity, the photon
//! emission rate and the mean photon energy:
//!
//! ```text
//! Lbol = ∫ L_λ dλ / L☉
//! L_k  = ∫_k L_λ dλ / L☉
//! Q_k  = ∫_k L_λ λ / (hc) dλ        [photons s⁻¹]
//! hν_k = L_k L☉ / Q_k               [eV]
//! ```
//!
//! with `L_λ` in erg s⁻¹ Å⁻¹ and `λ` in Å.

use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::WavelengthGrid;
use crate::photometry::band::ResolvedBand;
use crate::photometry::constants::CGS;
use crate::photometry::quadrature::{IntegrationRule, QuadratureError};

/// Errors from integrating a trial
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("Band '{label}' ends at sample {high} but the grid has {len} samples")]
    RangeOutsideGrid {
        label: String,
        high: usize,
        len: usize,
    },

    #[error(transparent)]
    Quadrature(#[from] QuadratureError),
}

/// Position of a trial in the stacked aggregate: process partition, then trial id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrialKey {
    pub process: u32,
    pub trial: u32,
}

/// Time series of one band for one trial
#[derive(Debug, Clone, PartialEq)]
pub struct BandTimeSeries {
    /// Band luminosity in solar luminosities
    pub luminosity: Array1<f64>,
    /// Photon emission rate in photons per second
    pub photon_rate: Array1<f64>,
    /// Mean photon energy in eV; NaN where the photon rate vanishes
    pub mean_photon_energy: Array1<f64>,
}

impl BandTimeSeries {
    fn zeros(ntime: usize) -> Self {
        Self {
            luminosity: Array1::zeros(ntime),
            photon_rate: Array1::zeros(ntime),
            mean_photon_energy: Array1::zeros(ntime),
        }
    }
}

/// Derived scalars of one trial at every time step
#[derive(Debug, Clone, PartialEq)]
pub struct TrialIntegrationResult {
    pub key: TrialKey,
    /// Bolometric luminosity in solar luminosities
    pub lbol: Array1<f64>,
    /// One entry per band, in band order
    pub bands: Vec<BandTimeSeries>,
}

/// Mean photon energy in eV from a band luminosity (L☉) and photon rate (s⁻¹)
///
/// Returns NaN when the photon rate is zero or not finite, since the mean
/// energy of no photons is undefined.
pub fn mean_photon_energy(luminosity_lsun: f64, photon_rate: f64) -> f64 {
    if photon_rate == 0.0 || !photon_rate.is_finite() {
        return f64::NAN;
    }
    luminosity_lsun * CGS::SOLAR_LUMINOSITY / photon_rate / CGS::ELECTRON_VOLT
}

/// Integrate one trial's spectra
///
/// # Arguments
///
/// * `key` - Identity of the trial, carried into the result
/// * `spectra` - Specific luminosity, time steps × wavelengths
/// * `grid` - Wavelength grid the spectra are sampled on
/// * `bands` - Bands resolved onto `grid`
/// * `rule` - Quadrature rule
///
/// Bands resolved on a different grid are rejected when their range does not
/// fit `grid`.
pub fn integrate_trial(
    key: TrialKey,
    spectra: ArrayView2<'_, f64>,
    grid: &WavelengthGrid,
    bands: &[ResolvedBand],
    rule: IntegrationRule,
) -> Result<TrialIntegrationResult, IntegrationError> {
    let ntime = spectra.nrows();
    let wl = grid.as_slice();

    if let Some(bad) = bands.iter().find(|b| b.range.high >= wl.len()) {
        return Err(IntegrationError::RangeOutsideGrid {
            label: bad.band.label.clone(),
            high: bad.range.high,
            len: wl.len(),
        });
    }
    if spectra.ncols() != wl.len() {
        return Err(QuadratureError::MismatchedLengths {
            y_len: spectra.ncols(),
            x_len: wl.len(),
        }
        .into());
    }

    let mut lbol = Array1::zeros(ntime);
    let mut series: Vec<BandTimeSeries> = bands.iter().map(|_| BandTimeSeries::zeros(ntime)).collect();

    // Photon-weighted row reused across bands and time steps
    let mut weighted = vec![0.0; wl.len()];

    for (j, row) in spectra.rows().into_iter().enumerate() {
        let flux = row.to_vec();
        lbol[j] = rule.integrate(&flux, wl)? / CGS::SOLAR_LUMINOSITY;

        for (k, resolved) in bands.iter().enumerate() {
            let range = resolved.range;
            let flux_k = range.slice(&flux);
            let wl_k = range.slice(wl);

            for (w, (&f, &lambda)) in weighted[range.low..=range.high]
                .iter_mut()
                .zip(flux_k.iter().zip(wl_k))
            {
                *w = f * lambda / CGS::hc();
            }

            let luminosity = rule.integrate(flux_k, wl_k)? / CGS::SOLAR_LUMINOSITY;
            let photon_rate = rule.integrate(range.slice(&weighted), wl_k)? * CGS::ANGSTROM;

            let out = &mut series[k];
            out.luminosity[j] = luminosity;
            out.photon_rate[j] = photon_rate;
            out.mean_photon_energy[j] = mean_photon_energy(luminosity, photon_rate);
        }
    }

    Ok(TrialIntegrationResult {
        key,
        lbol,
        bands: series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photometry::band::{resolve_bands, EnergyBand};
    use approx::assert_relative_eq;
    use ndarray::Array2;

    const KEY: TrialKey = TrialKey {
        process: 0,
        trial: 1,
    };

    fn fine_grid() -> WavelengthGrid {
        WavelengthGrid::new((0..=1000).map(|i| 100.0 + 2.0 * i as f64).collect()).unwrap()
    }

    #[test]
    fn test_constant_flux_bolometric_both_rules() {
        let grid = fine_grid();
        let c = 3.0e33;
        let spectra = Array2::from_elem((4, grid.len()), c);
        let expected = c * (grid.last() - grid.first()) / CGS::SOLAR_LUMINOSITY;

        for rule in [IntegrationRule::Trapezoid, IntegrationRule::Simpson] {
            let result = integrate_trial(KEY, spectra.view(), &grid, &[], rule).unwrap();
            for &l in result.lbol.iter() {
                assert_relative_eq!(l, expected, max_relative = 1e-10);
            }
        }
    }

    #[test]
    fn test_band_luminosity_and_photon_rate() {
        let grid = fine_grid();
        let bands = resolve_bands(
            grid.as_slice(),
            &[EnergyBand::new("mid", 499.0, 1001.0).unwrap()],
        )
        .unwrap();
        // Band covers samples 500..=1000 Å
        assert_eq!(bands[0].range.low, 200);
        assert_eq!(bands[0].range.high, 450);

        let c = 1.0e35;
        let spectra = Array2::from_elem((1, grid.len()), c);
        let result =
            integrate_trial(KEY, spectra.view(), &grid, &bands, IntegrationRule::Trapezoid).unwrap();

        let band = &result.bands[0];
        let expected_l = c * 500.0 / CGS::SOLAR_LUMINOSITY;
        // ∫ c λ / hc dλ from 500 to 1000 Å, λ converted to cm; exact for the trapezoid
        let expected_q = c * (1000.0_f64.powi(2) - 500.0_f64.powi(2)) / 2.0 / CGS::hc() * CGS::ANGSTROM;

        assert_relative_eq!(band.luminosity[0], expected_l, max_relative = 1e-12);
        assert_relative_eq!(band.photon_rate[0], expected_q, max_relative = 1e-12);
        assert_relative_eq!(
            band.mean_photon_energy[0],
            expected_l * CGS::SOLAR_LUMINOSITY / expected_q / CGS::ELECTRON_VOLT,
            max_relative = 1e-12
        );
        // Mean energy of a flat L_λ between 500 and 1000 Å sits between the edge energies
        assert!(band.mean_photon_energy[0] > 12.4 && band.mean_photon_energy[0] < 24.8);
    }

    #[test]
    fn test_zero_flux_band_yields_nan_energy() {
        let grid = WavelengthGrid::new(vec![100.0, 200.0, 300.0, 400.0]).unwrap();
        let bands = resolve_bands(
            grid.as_slice(),
            &[EnergyBand::new("dark", 150.0, 350.0).unwrap()],
        )
        .unwrap();
        // Flux only outside the band on the second time step
        let spectra = Array2::from_shape_fn((2, 4), |(j, k)| {
            if j == 1 && (k == 0 || k == 3) {
                1e33
            } else if j == 0 {
                1e33
            } else {
                0.0
            }
        });

        let result =
            integrate_trial(KEY, spectra.view(), &grid, &bands, IntegrationRule::Trapezoid).unwrap();
        let band = &result.bands[0];

        assert!(band.mean_photon_energy[0].is_finite());
        assert_eq!(band.photon_rate[1], 0.0);
        assert_eq!(band.luminosity[1], 0.0);
        assert!(band.mean_photon_energy[1].is_nan());
        assert!(result.lbol[1] > 0.0);
    }

    #[test]
    fn test_ranges_from_another_grid_rejected() {
        let bands = resolve_bands(
            fine_grid().as_slice(),
            &[EnergyBand::new("mid", 499.0, 1001.0).unwrap()],
        )
        .unwrap();
        let coarse = WavelengthGrid::new(vec![100.0, 600.0, 1200.0]).unwrap();
        let spectra = Array2::from_elem((2, coarse.len()), 1e33);

        assert!(matches!(
            integrate_trial(KEY, spectra.view(), &coarse, &bands, IntegrationRule::Trapezoid),
            Err(IntegrationError::RangeOutsideGrid { high: 450, len: 3, .. })
        ));

        let narrow = Array2::from_elem((2, 2), 1e33);
        assert!(matches!(
            integrate_trial(KEY, narrow.view(), &coarse, &[], IntegrationRule::Trapezoid),
            Err(IntegrationError::Quadrature(QuadratureError::MismatchedLengths { .. }))
        ));
    }

    #[test]
    fn test_mean_photon_energy_guards() {
        assert!(mean_photon_energy(1.0, 0.0).is_nan());
        assert!(mean_photon_energy(1.0, f64::INFINITY).is_nan());
        assert!(mean_photon_energy(0.0, 0.0).is_nan());
        assert_relative_eq!(
            mean_photon_energy(1.0, CGS::SOLAR_LUMINOSITY / CGS::ELECTRON_VOLT),
            1.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_deterministic() {
        let grid = fine_grid();
        let bands = resolve_bands(grid.as_slice(), &crate::photometry::band::default_bands()[1..])
            .unwrap();
        let spectra = Array2::from_shape_fn((3, grid.len()), |(j, k)| 1e30 * (1.0 + j as f64) / (1.0 + k as f64));

        let a = integrate_trial(KEY, spectra.view(), &grid, &bands, IntegrationRule::Simpson).unwrap();
        let b = integrate_trial(KEY, spectra.view(), &grid, &bands, IntegrationRule::Simpson).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.bands.len(), 2);
    }
}
