//! JSON table reader
//!
//! Reads `{model}_cluster_spec.json`, `{model}_cluster_phot.json` and
//! `{model}_cluster_prop.json`, each holding the serde form of the
//! corresponding table. Useful for output that was converted once from the
//! native formats.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use super::{OutputFormat, ReaderError, SimulationOutputReader};
use crate::dataset::{PhotometryTable, PropertiesTable, SpectraTable};

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTableReader;

impl JsonTableReader {
    pub fn new() -> Self {
        Self
    }

    /// Path of one table file for a model
    pub fn table_path(output_dir: &Path, model_name: &str, kind: &str) -> PathBuf {
        output_dir.join(format!("{model_name}_cluster_{kind}.json"))
    }

    fn read_table<T: DeserializeOwned>(
        &self,
        kind: &'static str,
        model_name: &str,
        output_dir: &Path,
        format: OutputFormat,
    ) -> Result<T, ReaderError> {
        if format != OutputFormat::Json {
            return Err(ReaderError::UnsupportedFormat { format });
        }

        let path = Self::table_path(output_dir, model_name, kind);
        if !path.exists() {
            return Err(ReaderError::Missing {
                kind,
                model: model_name.to_string(),
                dir: output_dir.to_path_buf(),
            });
        }

        let file = File::open(&path).map_err(|source| ReaderError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|source| ReaderError::Malformed { kind, path, source })
    }
}

impl SimulationOutputReader for JsonTableReader {
    fn read_spectra(
        &self,
        model_name: &str,
        output_dir: &Path,
        format: OutputFormat,
    ) -> Result<SpectraTable, ReaderError> {
        self.read_table("spec", model_name, output_dir, format)
    }

    fn read_photometry(
        &self,
        model_name: &str,
        output_dir: &Path,
        format: OutputFormat,
    ) -> Result<PhotometryTable, ReaderError> {
        self.read_table("phot", model_name, output_dir, format)
    }

    fn read_properties(
        &self,
        model_name: &str,
        output_dir: &Path,
        format: OutputFormat,
    ) -> Result<PropertiesTable, ReaderError> {
        self.read_table("prop", model_name, output_dir, format)
    }
}
