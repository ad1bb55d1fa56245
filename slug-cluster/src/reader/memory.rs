//! In-memory simulation output
//!
//! Holds reader tables keyed by model name and counts every read, which makes
//! it possible to check that cached results never go back to the reader.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{OutputFormat, ReaderError, SimulationOutputReader};
use crate::dataset::{PhotometryTable, PropertiesTable, SpectraTable};

#[derive(Debug, Clone)]
struct ModelTables {
    spectra: SpectraTable,
    photometry: PhotometryTable,
    properties: PropertiesTable,
}

#[derive(Debug, Default)]
pub struct MemoryReader {
    models: HashMap<String, ModelTables>,
    reads: AtomicUsize,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the output of one model, replacing any previous tables
    pub fn insert(
        &mut self,
        model_name: impl Into<String>,
        spectra: SpectraTable,
        photometry: PhotometryTable,
        properties: PropertiesTable,
    ) {
        self.models.insert(
            model_name.into(),
            ModelTables {
                spectra,
                photometry,
                properties,
            },
        );
    }

    /// Total number of table reads served or attempted
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn lookup(
        &self,
        kind: &'static str,
        model_name: &str,
        output_dir: &Path,
    ) -> Result<&ModelTables, ReaderError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.models
            .get(model_name)
            .ok_or_else(|| ReaderError::Missing {
                kind,
                model: model_name.to_string(),
                dir: output_dir.to_path_buf(),
            })
    }
}

impl SimulationOutputReader for MemoryReader {
    fn read_spectra(
        &self,
        model_name: &str,
        output_dir: &Path,
        _format: OutputFormat,
    ) -> Result<SpectraTable, ReaderError> {
        Ok(self.lookup("spec", model_name, output_dir)?.spectra.clone())
    }

    fn read_photometry(
        &self,
        model_name: &str,
        output_dir: &Path,
        _format: OutputFormat,
    ) -> Result<PhotometryTable, ReaderError> {
        Ok(self.lookup("phot", model_name, output_dir)?.photometry.clone())
    }

    fn read_properties(
        &self,
        model_name: &str,
        output_dir: &Path,
        _format: OutputFormat,
    ) -> Result<PropertiesTable, ReaderError> {
        Ok(self.lookup("prop", model_name, output_dir)?.properties.clone())
    }
}
