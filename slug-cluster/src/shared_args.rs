use crate::config::{AnalysisConfig, ConfigError};
use crate::photometry::band::EnergyBand;
use crate::photometry::quadrature::IntegrationRule;
use crate::reader::OutputFormat;
use clap::Parser;
use std::path::PathBuf;

/// Parse band string in format "label:low:high" (angstroms)
fn parse_band(s: &str) -> Result<EnergyBand, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 {
        return Err("Band must be in format 'label:low:high'".to_string());
    }

    let low = parts[1]
        .trim()
        .parse::<f64>()
        .map_err(|_| "Invalid lower wavelength".to_string())?;
    let high = parts[2]
        .trim()
        .parse::<f64>()
        .map_err(|_| "Invalid upper wavelength".to_string())?;

    EnergyBand::new(parts[0].trim(), low, high).map_err(|e| format!("Invalid band: {}", e))
}

/// Common arguments shared by the analysis binaries
///
/// Values given on the command line override the configuration file, which in
/// turn overrides the built-in defaults.
#[derive(Parser, Debug, Clone, Default)]
pub struct AnalysisArgs {
    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding the simulation output
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Model name prefix (e.g. "cluster_logM")
    #[arg(long)]
    pub model_base: Option<String>,

    /// Format of the simulation output
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// log10 cluster masses to process, comma separated (e.g. "2.0,2.4,3.0")
    #[arg(long, value_delimiter = ',')]
    pub log_mass: Vec<f64>,

    /// Process partitions written per mass, comma separated
    #[arg(long, value_delimiter = ',')]
    pub processes: Vec<u32>,

    /// Energy band "label:low:high" in angstroms; repeat to replace the default set
    #[arg(long = "band", value_parser = parse_band)]
    pub bands: Vec<EnergyBand>,

    /// Quadrature rule for spectral integrals
    #[arg(long, value_enum)]
    pub rule: Option<IntegrationRule>,
}

impl AnalysisArgs {
    /// Build the effective configuration
    pub fn to_config(&self) -> Result<AnalysisConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load_from_file(path)?,
            None => AnalysisConfig::default(),
        };

        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(base) = &self.model_base {
            config.model_base = base.clone();
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if !self.log_mass.is_empty() {
            config.log_masses = self.log_mass.clone();
        }
        if !self.processes.is_empty() {
            config.processes = self.processes.clone();
        }
        if !self.bands.is_empty() {
            config.bands = self.bands.clone();
        }
        if let Some(rule) = self.rule {
            config.rule = rule;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        analysis: AnalysisArgs,
    }

    #[test]
    fn test_band_parsing() {
        let band = parse_band("LW:912.11:1108").unwrap();
        assert_eq!(band.label, "LW");
        assert_eq!(band.wl_low, 912.11);
        assert_eq!(band.wl_high, 1108.0);

        assert!(parse_band("LW:912.11").is_err());
        assert!(parse_band("LW:abc:1108").is_err());
        assert!(parse_band("LW:1108:912").is_err());
    }

    #[test]
    fn test_overrides() {
        let cli = TestCli::parse_from([
            "test",
            "--output-dir",
            "/data/slug",
            "--log-mass",
            "4.0,5.0",
            "--processes",
            "0",
            "--band",
            "H0:0:912.11",
            "--rule",
            "simpson",
            "--format",
            "json",
        ]);
        let config = cli.analysis.to_config().unwrap();

        assert_eq!(config.output_dir, PathBuf::from("/data/slug"));
        assert_eq!(config.log_masses, vec![4.0, 5.0]);
        assert_eq!(config.processes, vec![0]);
        assert_eq!(config.bands.len(), 1);
        assert_eq!(config.rule, IntegrationRule::Simpson);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.model_base, "cluster_logM");
    }

    #[test]
    fn test_defaults_without_flags() {
        let cli = TestCli::parse_from(["test"]);
        assert_eq!(cli.analysis.to_config().unwrap(), AnalysisConfig::default());
    }
}
