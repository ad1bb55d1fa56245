//! Access to simulation output
//!
//! The stochastic population synthesis code writes spectra, photometry and
//! physical properties per model. Decoding its native formats is left to
//! implementations of [`SimulationOutputReader`]; this crate only ships a JSON
//! table reader and an in-memory reader.

pub mod json;
pub mod memory;

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::{PhotometryTable, PropertiesTable, SpectraTable};

pub use json::JsonTableReader;
pub use memory::MemoryReader;

/// Errors produced while reading simulation output
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("Output format {format} is not supported by this reader")]
    UnsupportedFormat { format: OutputFormat },

    #[error("No {kind} output for model '{model}' in {dir}")]
    Missing {
        kind: &'static str,
        model: String,
        dir: PathBuf,
    },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed {kind} output in {path}: {source}")]
    Malformed {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// On-disk format of the simulation output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum OutputFormat {
    Ascii,
    #[default]
    Binary,
    Fits,
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Ascii => write!(f, "ascii"),
            OutputFormat::Binary => write!(f, "binary"),
            OutputFormat::Fits => write!(f, "fits"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Source of per-model cluster spectra, photometry and properties
pub trait SimulationOutputReader {
    fn read_spectra(
        &self,
        model_name: &str,
        output_dir: &Path,
        format: OutputFormat,
    ) -> Result<SpectraTable, ReaderError>;

    fn read_photometry(
        &self,
        model_name: &str,
        output_dir: &Path,
        format: OutputFormat,
    ) -> Result<PhotometryTable, ReaderError>;

    fn read_properties(
        &self,
        model_name: &str,
        output_dir: &Path,
        format: OutputFormat,
    ) -> Result<PropertiesTable, ReaderError>;
}

impl<R: SimulationOutputReader + ?Sized> SimulationOutputReader for &R {
    fn read_spectra(
        &self,
        model_name: &str,
        output_dir: &Path,
        format: OutputFormat,
    ) -> Result<SpectraTable, ReaderError> {
        (**self).read_spectra(model_name, output_dir, format)
    }

    fn read_photometry(
        &self,
        model_name: &str,
        output_dir: &Path,
        format: OutputFormat,
    ) -> Result<PhotometryTable, ReaderError> {
        (**self).read_photometry(model_name, output_dir, format)
    }

    fn read_properties(
        &self,
        model_name: &str,
        output_dir: &Path,
        format: OutputFormat,
    ) -> Result<PropertiesTable, ReaderError> {
        (**self).read_properties(model_name, output_dir, format)
    }
}
