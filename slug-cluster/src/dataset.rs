//! Per-partition cluster simulation datasets
//!
//! A simulation run writes every trial's time series back to back: rows
//! `(trial - 1) * ntime .. trial * ntime` of the spectra and photometry
//! matrices belong to `trial`. [`ClusterDataset::from_tables`] checks that
//! layout once so the integrator can slice trials without further validation.

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while assembling a dataset from reader tables
#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    #[error("Wavelength grid is empty")]
    EmptyGrid,

    #[error("Wavelength grid must be strictly ascending (index {index})")]
    UnsortedGrid { index: usize },

    #[error("Dataset contains no trials")]
    NoTrials,

    #[error("{table} table has {rows} rows but {expected} were expected")]
    RowCount {
        table: &'static str,
        rows: usize,
        expected: usize,
    },

    #[error("Spectra have {columns} wavelength columns but the grid has {grid} samples")]
    GridWidth { columns: usize, grid: usize },

    #[error("Row {row} belongs to trial {found} but trial {expected} was expected")]
    TrialLayout {
        row: usize,
        found: u32,
        expected: u32,
    },

    #[error("Trial {trial} does not share the time axis of trial 1 (step {step})")]
    TimeAxisMismatch { trial: u32, step: usize },

    #[error("Spectra and photometry disagree on row {row}")]
    TableMismatch { row: usize },

    #[error("Properties table is empty")]
    NoProperties,

    #[error("Trial {trial} is out of range 1..={ntrial}")]
    TrialOutOfRange { trial: u32, ntrial: u32 },
}

/// Ascending wavelength samples in angstroms
///
/// Never empty; deserialization goes through the same checks as [`WavelengthGrid::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct WavelengthGrid(Vec<f64>);

impl TryFrom<Vec<f64>> for WavelengthGrid {
    type Error = DatasetError;

    fn try_from(wavelengths: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(wavelengths)
    }
}

impl From<WavelengthGrid> for Vec<f64> {
    fn from(grid: WavelengthGrid) -> Self {
        grid.0
    }
}

impl WavelengthGrid {
    /// Validate and wrap a wavelength vector
    pub fn new(wavelengths: Vec<f64>) -> Result<Self, DatasetError> {
        if wavelengths.is_empty() {
            return Err(DatasetError::EmptyGrid);
        }
        if let Some(index) = wavelengths
            .windows(2)
            .position(|w| !(w[1] > w[0]))
            .map(|i| i + 1)
        {
            return Err(DatasetError::UnsortedGrid { index });
        }
        Ok(Self(wavelengths))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> f64 {
        self.0[0]
    }

    pub fn last(&self) -> f64 {
        self.0[self.0.len() - 1]
    }
}

/// Cluster spectra as returned by a reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectraTable {
    /// Trial id of every row
    pub trial: Vec<u32>,
    /// Simulation time of every row, in years
    pub time: Vec<f64>,
    /// Wavelength grid in angstroms
    pub wl: Vec<f64>,
    /// Specific luminosity, erg s⁻¹ Å⁻¹; rows × wavelengths
    pub spec: Array2<f64>,
}

/// Cluster photometry as returned by a reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotometryTable {
    pub trial: Vec<u32>,
    pub time: Vec<f64>,
    pub filter_names: Vec<String>,
    /// rows × filters
    pub phot: Array2<f64>,
}

/// Cluster physical properties as returned by a reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertiesTable {
    pub trial: Vec<u32>,
    /// Target initial stellar mass per row, in solar masses
    pub target_mass: Vec<f64>,
}

/// All trials of one (cluster mass, process) simulation partition
#[derive(Debug, Clone)]
pub struct ClusterDataset {
    model_name: String,
    process: u32,
    time: Array1<f64>,
    target_mass: f64,
    wavelength: WavelengthGrid,
    spectra: Array2<f64>,
    photometry: Array2<f64>,
    filter_names: Vec<String>,
    ntrial: u32,
}

impl ClusterDataset {
    /// Assemble a dataset from the three reader tables
    ///
    /// The number of time steps is taken from the rows of trial 1; every other
    /// trial must follow in order with an identical time axis.
    pub fn from_tables(
        model_name: impl Into<String>,
        process: u32,
        spectra: SpectraTable,
        photometry: PhotometryTable,
        properties: PropertiesTable,
    ) -> Result<Self, DatasetError> {
        let wavelength = WavelengthGrid::new(spectra.wl)?;

        let ntime = photometry.trial.iter().filter(|&&t| t == 1).count();
        if ntime == 0 {
            return Err(DatasetError::NoTrials);
        }
        let nrows = photometry.trial.len();
        if nrows % ntime != 0 {
            return Err(DatasetError::RowCount {
                table: "photometry",
                rows: nrows,
                expected: (nrows / ntime + 1) * ntime,
            });
        }
        let ntrial = (nrows / ntime) as u32;

        check_rows("photometry time", photometry.time.len(), nrows)?;
        check_rows("photometry", photometry.phot.nrows(), nrows)?;
        check_rows("spectra trial", spectra.trial.len(), nrows)?;
        check_rows("spectra time", spectra.time.len(), nrows)?;
        check_rows("spectra", spectra.spec.nrows(), nrows)?;

        if spectra.spec.ncols() != wavelength.len() {
            return Err(DatasetError::GridWidth {
                columns: spectra.spec.ncols(),
                grid: wavelength.len(),
            });
        }

        for (row, &found) in photometry.trial.iter().enumerate() {
            let expected = (row / ntime) as u32 + 1;
            if found != expected {
                return Err(DatasetError::TrialLayout {
                    row,
                    found,
                    expected,
                });
            }
            if photometry.time[row] != photometry.time[row % ntime] {
                return Err(DatasetError::TimeAxisMismatch {
                    trial: found,
                    step: row % ntime,
                });
            }
            if spectra.trial[row] != found || spectra.time[row] != photometry.time[row] {
                return Err(DatasetError::TableMismatch { row });
            }
        }

        let target_mass = *properties
            .target_mass
            .first()
            .ok_or(DatasetError::NoProperties)?;

        Ok(Self {
            model_name: model_name.into(),
            process,
            time: Array1::from(photometry.time[..ntime].to_vec()),
            target_mass,
            wavelength,
            spectra: spectra.spec,
            photometry: photometry.phot,
            filter_names: photometry.filter_names,
            ntrial,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Process partition this dataset was read from
    pub fn process(&self) -> u32 {
        self.process
    }

    pub fn time(&self) -> ArrayView1<'_, f64> {
        self.time.view()
    }

    pub fn ntime(&self) -> usize {
        self.time.len()
    }

    pub fn ntrial(&self) -> u32 {
        self.ntrial
    }

    /// Trial ids in ascending order
    pub fn trials(&self) -> impl Iterator<Item = u32> {
        1..=self.ntrial
    }

    pub fn target_mass(&self) -> f64 {
        self.target_mass
    }

    pub fn wavelength(&self) -> &WavelengthGrid {
        &self.wavelength
    }

    pub fn filter_names(&self) -> &[String] {
        &self.filter_names
    }

    fn trial_rows(&self, trial: u32) -> Result<(usize, usize), DatasetError> {
        if trial == 0 || trial > self.ntrial {
            return Err(DatasetError::TrialOutOfRange {
                trial,
                ntrial: self.ntrial,
            });
        }
        let start = (trial as usize - 1) * self.ntime();
        Ok((start, start + self.ntime()))
    }

    /// Spectra of one trial, time steps × wavelengths
    pub fn trial_spectra(&self, trial: u32) -> Result<ArrayView2<'_, f64>, DatasetError> {
        let (start, end) = self.trial_rows(trial)?;
        Ok(self.spectra.slice(s![start..end, ..]))
    }

    /// Photometry of one trial, time steps × filters
    pub fn trial_photometry(&self, trial: u32) -> Result<ArrayView2<'_, f64>, DatasetError> {
        let (start, end) = self.trial_rows(trial)?;
        Ok(self.photometry.slice(s![start..end, ..]))
    }
}

fn check_rows(table: &'static str, rows: usize, expected: usize) -> Result<(), DatasetError> {
    if rows != expected {
        return Err(DatasetError::RowCount {
            table,
            rows,
            expected,
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[test]
    fn test_grid_deserialization_validates() {
        let grid: WavelengthGrid = serde_json::from_str("[100.0, 200.0, 300.0]").unwrap();
        assert_eq!(grid.first(), 100.0);
        assert_eq!(grid.last(), 300.0);
        assert_eq!(serde_json::to_string(&grid).unwrap(), "[100.0,200.0,300.0]");

        assert!(serde_json::from_str::<WavelengthGrid>("[]").is_err());
        assert!(serde_json::from_str::<WavelengthGrid>("[300.0, 200.0]").is_err());
    }

    /// Build reader tables for `ntrial` trials sampled on `time` and `wl`
    ///
    /// `flux(trial, step, wl_index)` gives the spectrum value.
    pub(crate) fn synthetic_tables(
        ntrial: u32,
        time: &[f64],
        wl: &[f64],
        flux: impl Fn(u32, usize, usize) -> f64,
    ) -> (SpectraTable, PhotometryTable, PropertiesTable) {
        let ntime = time.len();
        let nrows = ntrial as usize * ntime;
        let mut trial = Vec::with_capacity(nrows);
        let mut times = Vec::with_capacity(nrows);
        let mut spec = Array2::zeros((nrows, wl.len()));
        for t in 1..=ntrial {
            for (j, &tj) in time.iter().enumerate() {
                let row = (t as usize - 1) * ntime + j;
                trial.push(t);
                times.push(tj);
                for k in 0..wl.len() {
                    spec[[row, k]] = flux(t, j, k);
                }
            }
        }
        let phot = Array2::from_shape_fn((nrows, 1), |(row, _)| row as f64);

        (
            SpectraTable {
                trial: trial.clone(),
                time: times.clone(),
                wl: wl.to_vec(),
                spec,
            },
            PhotometryTable {
                trial: trial.clone(),
                time: times,
                filter_names: vec!["QH0".to_string()],
                phot,
            },
            PropertiesTable {
                trial: (1..=ntrial).collect(),
                target_mass: vec![100.0; ntrial as usize],
            },
        )
    }

    #[test]
    fn test_grid_validation() {
        assert_eq!(WavelengthGrid::new(vec![]), Err(DatasetError::EmptyGrid));
        assert_eq!(
            WavelengthGrid::new(vec![1.0, 2.0, 2.0]),
            Err(DatasetError::UnsortedGrid { index: 2 })
        );
        let grid = WavelengthGrid::new(vec![1.0, 2.0, 5.0]).unwrap();
        assert_eq!(grid.first(), 1.0);
        assert_eq!(grid.last(), 5.0);
        assert_eq!(grid.len(), 3);
    }

    #[test]
    fn test_from_tables_layout() {
        let (spec, phot, prop) =
            synthetic_tables(3, &[1e5, 2e5], &[100.0, 500.0, 1000.0], |t, j, k| {
                (t * 100) as f64 + (j * 10) as f64 + k as f64
            });
        let ds = ClusterDataset::from_tables("m", 2, spec, phot, prop).unwrap();

        assert_eq!(ds.ntrial(), 3);
        assert_eq!(ds.ntime(), 2);
        assert_eq!(ds.process(), 2);
        assert_eq!(ds.target_mass(), 100.0);
        assert_eq!(ds.time().to_vec(), vec![1e5, 2e5]);
        assert_eq!(ds.trials().collect::<Vec<_>>(), vec![1, 2, 3]);

        let trial2 = ds.trial_spectra(2).unwrap();
        assert_eq!(trial2.dim(), (2, 3));
        assert_eq!(trial2[[1, 2]], 212.0);
        assert_eq!(ds.trial_photometry(3).unwrap()[[0, 0]], 4.0);
    }

    #[test]
    fn test_trial_out_of_range() {
        let (spec, phot, prop) = synthetic_tables(2, &[1.0], &[1.0, 2.0], |_, _, _| 1.0);
        let ds = ClusterDataset::from_tables("m", 0, spec, phot, prop).unwrap();
        assert!(matches!(
            ds.trial_spectra(0),
            Err(DatasetError::TrialOutOfRange { .. })
        ));
        assert!(matches!(
            ds.trial_spectra(3),
            Err(DatasetError::TrialOutOfRange { .. })
        ));
    }

    #[test]
    fn test_rejects_misordered_trials() {
        let (spec, mut phot, prop) = synthetic_tables(2, &[1.0, 2.0], &[1.0, 2.0], |_, _, _| 1.0);
        phot.trial = vec![1, 2, 1, 2];
        let result = ClusterDataset::from_tables("m", 0, spec, phot, prop);
        assert!(matches!(result, Err(DatasetError::TrialLayout { row: 1, .. })));
    }

    #[test]
    fn test_rejects_divergent_time_axis() {
        let (spec, mut phot, prop) = synthetic_tables(2, &[1.0, 2.0], &[1.0, 2.0], |_, _, _| 1.0);
        phot.time[3] = 3.0;
        let result = ClusterDataset::from_tables("m", 0, spec, phot, prop);
        assert_eq!(
            result.unwrap_err(),
            DatasetError::TimeAxisMismatch { trial: 2, step: 1 }
        );
    }

    #[test]
    fn test_rejects_grid_width_mismatch() {
        let (mut spec, phot, prop) = synthetic_tables(1, &[1.0], &[1.0, 2.0], |_, _, _| 1.0);
        spec.wl = vec![1.0, 2.0, 3.0];
        let result = ClusterDataset::from_tables("m", 0, spec, phot, prop);
        assert_eq!(
            result.unwrap_err(),
            DatasetError::GridWidth {
                columns: 2,
                grid: 3
            }
        );
    }

    #[test]
    fn test_rejects_empty_properties() {
        let (spec, phot, mut prop) = synthetic_tables(1, &[1.0], &[1.0, 2.0], |_, _, _| 1.0);
        prop.target_mass.clear();
        let result = ClusterDataset::from_tables("m", 0, spec, phot, prop);
        assert_eq!(result.unwrap_err(), DatasetError::NoProperties);
    }
}
