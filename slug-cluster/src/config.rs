//! Analysis configuration
//!
//! Describes where simulation output lives, how models are named, which
//! cluster masses and process partitions exist, and how spectra are
//! integrated. Stored as JSON so a batch of runs can be re-analysed with the
//! exact same settings.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::{mass_key, AggregateCache};
use crate::photometry::band::{default_bands, EnergyBand};
use crate::photometry::quadrature::IntegrationRule;
use crate::reader::OutputFormat;

/// Errors from loading or validating a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration lists no cluster masses")]
    NoMasses,

    #[error("Configuration lists no process partitions")]
    NoProcesses,

    #[error("Configuration lists no energy bands")]
    NoBands,

    #[error("Band label '{0}' is used more than once")]
    DuplicateBand(String),

    #[error("Cluster mass logM = {0} is not finite")]
    InvalidMass(f64),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed configuration {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings of one cluster analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Directory holding the simulation output
    pub output_dir: PathBuf,
    /// Model name prefix; followed by the mass key and partition suffix
    pub model_base: String,
    pub format: OutputFormat,
    /// log10 initial cluster masses to analyse
    pub log_masses: Vec<f64>,
    /// Process partitions written for every mass, in processing order
    pub processes: Vec<u32>,
    pub bands: Vec<EnergyBand>,
    pub rule: IntegrationRule,
    /// Cache location relative to `output_dir`
    pub cache_subdir: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output_slug2"),
            model_base: "cluster_logM".to_string(),
            format: OutputFormat::Binary,
            log_masses: linspace(2.0, 3.0, 6),
            processes: (0..5).collect(),
            bands: default_bands(),
            rule: IntegrationRule::Trapezoid,
            cache_subdir: "cache".to_string(),
        }
    }
}

/// `n` evenly spaced values from `start` to `stop` inclusive
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

impl AnalysisConfig {
    /// Check the configuration for settings that cannot produce a result
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_masses.is_empty() {
            return Err(ConfigError::NoMasses);
        }
        if let Some(&bad) = self.log_masses.iter().find(|m| !m.is_finite()) {
            return Err(ConfigError::InvalidMass(bad));
        }
        if self.processes.is_empty() {
            return Err(ConfigError::NoProcesses);
        }
        if self.bands.is_empty() {
            return Err(ConfigError::NoBands);
        }
        let mut seen = HashSet::new();
        for band in &self.bands {
            if !seen.insert(band.label.as_str()) {
                return Err(ConfigError::DuplicateBand(band.label.clone()));
            }
        }
        Ok(())
    }

    /// Name of the model written for one cluster mass and process partition
    ///
    /// e.g. `cluster_logM24_p00003_n00000_0000`
    pub fn model_name(&self, log_mass: f64, process: u32) -> String {
        format!(
            "{}{:02}_p{:05}_n00000_0000",
            self.model_base,
            mass_key(log_mass),
            process
        )
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.output_dir.join(&self.cache_subdir)
    }

    /// Cache for the aggregates of this analysis
    pub fn cache(&self) -> AggregateCache {
        AggregateCache::new(self.cache_dir(), self.model_base.clone())
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from JSON file; missing keys take their default values
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.log_masses.len(), 6);
        assert_relative_eq!(config.log_masses[3], 2.6, epsilon = 1e-12);
        assert_eq!(config.processes, vec![0, 1, 2, 3, 4]);
        assert_eq!(config.bands.len(), 3);
        assert!(config.validate().is_ok());
        assert_eq!(config.cache_dir(), PathBuf::from("output_slug2/cache"));
    }

    #[test]
    fn test_model_name() {
        let config = AnalysisConfig::default();
        assert_eq!(
            config.model_name(config.log_masses[2], 3),
            "cluster_logM24_p00003_n00000_0000"
        );
        assert_eq!(config.model_name(3.0, 0), "cluster_logM30_p00000_n00000_0000");
    }

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(0.0, 1.0, 0), Vec::<f64>::new());
        assert_eq!(linspace(5.0, 1.0, 1), vec![5.0]);
        assert_eq!(linspace(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_validation_failures() {
        let mut config = AnalysisConfig::default();
        config.processes.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoProcesses)));

        let mut config = AnalysisConfig::default();
        config.bands.push(config.bands[0].clone());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateBand(label)) if label == "H0"
        ));

        let mut config = AnalysisConfig::default();
        config.log_masses = vec![f64::NAN];
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMass(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("analysis.json");
        let mut config = AnalysisConfig::default();
        config.rule = IntegrationRule::Simpson;
        config.processes = vec![0, 1];

        config.save_to_file(&path).unwrap();
        let loaded = AnalysisConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("analysis.json");
        std::fs::write(&path, r#"{"log_masses": [4.0, 5.0], "format": "Json"}"#).unwrap();

        let loaded = AnalysisConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.log_masses, vec![4.0, 5.0]);
        assert_eq!(loaded.format, OutputFormat::Json);
        assert_eq!(loaded.model_base, "cluster_logM");
    }
}
