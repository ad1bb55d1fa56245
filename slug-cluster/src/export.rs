//! Fixed-width text tables of per-trial values at one time step
//!
//! One column per cluster mass, one row per trial:
//!
//! ```text
//!      logM20      logM22
//! 1.23450e+02 4.56000e+02
//! 2.00000e+02 3.10000e+02
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::Array1;
use thiserror::Error;

use crate::cache::mass_key;
use crate::result::{AggregateResult, Field, FieldError};

/// Width of every header label
const LABEL_WIDTH: usize = 11;

/// Errors from building or writing snapshot tables
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No columns to export")]
    NoColumns,

    #[error("Column logM{key:02} has {len} trials but the first column has {expected}")]
    RaggedColumns {
        key: i64,
        len: usize,
        expected: usize,
    },

    #[error("Time index {index} out of range for logM{key:02} with {ntime} steps")]
    TimeIndexOutOfRange { key: i64, index: usize, ntime: usize },

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error writing snapshot table: {source}")]
    Write {
        #[source]
        source: std::io::Error,
    },
}

/// Per-trial values of one cluster mass
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotColumn {
    pub log_mass: f64,
    pub values: Array1<f64>,
}

/// A quantity to export, e.g. the FUV luminosity
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotSpec {
    pub field: Field,
    pub band: Option<String>,
    /// Fixed table name; derived from field, band and time index when unset
    pub table_name: Option<String>,
}

impl SnapshotSpec {
    pub fn new(field: Field, band: Option<&str>) -> Self {
        Self {
            field,
            band: band.map(str::to_string),
            table_name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    /// Table name, e.g. `LFUV3` for the FUV luminosity at time index 3
    ///
    /// Band labels ending in a digit are separated from the time index by an
    /// underscore (`QH0_3`).
    pub fn name(&self, time_index: usize) -> String {
        if let Some(name) = &self.table_name {
            return name.clone();
        }
        let band = self.band.as_deref().unwrap_or("");
        let sep = if band.ends_with(|c: char| c.is_ascii_digit()) {
            "_"
        } else {
            ""
        };
        format!("{}{}{}{}", self.field.short_name(), band, sep, time_index)
    }
}

/// FUV luminosity, H0 photon rate, bolometric luminosity and the H0 / FUV
/// mean photon energies at one time step
///
/// The first time step keeps the historical table names `LFUV0`, `QH0`,
/// `Lbol0`, `hnuH0` and `hnuFUV0`.
pub fn default_snapshots(time_index: usize) -> Vec<SnapshotSpec> {
    let specs = [
        (Field::Luminosity, Some("FUV"), "LFUV0"),
        (Field::PhotonRate, Some("H0"), "QH0"),
        (Field::Lbol, None, "Lbol0"),
        (Field::MeanPhotonEnergy, Some("H0"), "hnuH0"),
        (Field::MeanPhotonEnergy, Some("FUV"), "hnuFUV0"),
    ];
    specs
        .into_iter()
        .map(|(field, band, first_name)| {
            let spec = SnapshotSpec::new(field, band);
            if time_index == 0 {
                spec.with_name(first_name)
            } else {
                spec
            }
        })
        .collect()
}

/// Header label of a cluster mass, e.g. `logM24`
pub fn mass_label(log_mass: f64) -> String {
    format!("logM{:02}", mass_key(log_mass))
}

/// Scientific notation with five decimals and a signed, two digit exponent
pub fn format_sci(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let formatted = format!("{:.5e}", value);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let exp: i32 = exponent.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => formatted,
    }
}

/// Gather one column per aggregate at a time step
pub fn snapshot_columns(
    results: &[AggregateResult],
    spec: &SnapshotSpec,
    time_index: usize,
) -> Result<Vec<SnapshotColumn>, ExportError> {
    results
        .iter()
        .map(|result| {
            if time_index >= result.ntime {
                return Err(ExportError::TimeIndexOutOfRange {
                    key: mass_key(result.log_mass),
                    index: time_index,
                    ntime: result.ntime,
                });
            }
            let values = result.snapshot(spec.field, spec.band.as_deref(), time_index)?;
            Ok(SnapshotColumn {
                log_mass: result.log_mass,
                values,
            })
        })
        .collect()
}

/// Write the header and one row per trial
///
/// The columns are checked before anything is written; ragged or missing
/// columns leave the writer untouched.
pub fn write_snapshot_table<W: Write>(
    writer: &mut W,
    columns: &[SnapshotColumn],
) -> Result<(), ExportError> {
    check_columns(columns)?;
    write_rows(writer, columns).map_err(|source| ExportError::Write { source })
}

fn write_rows<W: Write>(writer: &mut W, columns: &[SnapshotColumn]) -> std::io::Result<()> {
    let header: Vec<String> = columns
        .iter()
        .map(|c| format!("{:>width$}", mass_label(c.log_mass), width = LABEL_WIDTH))
        .collect();
    writeln!(writer, "{}", header.join(" "))?;

    let ntrial = columns.first().map_or(0, |c| c.values.len());
    for i in 0..ntrial {
        let row: Vec<String> = columns.iter().map(|c| format_sci(c.values[i])).collect();
        writeln!(writer, "{}", row.join(" "))?;
    }
    Ok(())
}

fn check_columns(columns: &[SnapshotColumn]) -> Result<(), ExportError> {
    let expected = columns.first().ok_or(ExportError::NoColumns)?.values.len();
    for column in columns {
        if column.values.len() != expected {
            return Err(ExportError::RaggedColumns {
                key: mass_key(column.log_mass),
                len: column.values.len(),
                expected,
            });
        }
    }
    Ok(())
}

/// Write `{dir}/{name}.txt` for one snapshot across all aggregates
pub fn write_snapshot_file(
    dir: &Path,
    spec: &SnapshotSpec,
    results: &[AggregateResult],
    time_index: usize,
) -> Result<PathBuf, ExportError> {
    let columns = snapshot_columns(results, spec, time_index)?;
    check_columns(&columns)?;

    let path = dir.join(format!("{}.txt", spec.name(time_index)));
    let io_err = |source| ExportError::Io {
        path: path.clone(),
        source,
    };
    let file = File::create(&path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    write_rows(&mut writer, &columns).map_err(io_err)?;
    writer.flush().map_err(io_err)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::tests::sample_result;
    use ndarray::array;
    use tempfile::TempDir;

    #[test]
    fn test_format_sci() {
        assert_eq!(format_sci(123.45), "1.23450e+02");
        assert_eq!(format_sci(0.000012345), "1.23450e-05");
        assert_eq!(format_sci(-4.2e40), "-4.20000e+40");
        assert_eq!(format_sci(0.0), "0.00000e+00");
        assert_eq!(format_sci(1e-300), "1.00000e-300");
        assert_eq!(format_sci(f64::NAN), "nan");
    }

    #[test]
    fn test_names_and_labels() {
        let names: Vec<String> = default_snapshots(0).iter().map(|s| s.name(0)).collect();
        assert_eq!(names, vec!["LFUV0", "QH0", "Lbol0", "hnuH0", "hnuFUV0"]);

        let later: Vec<String> = default_snapshots(3).iter().map(|s| s.name(3)).collect();
        assert_eq!(later, vec!["LFUV3", "QH0_3", "Lbol3", "hnuH0_3", "hnuFUV3"]);
        assert_eq!(SnapshotSpec::new(Field::Luminosity, Some("LW")).name(2), "LLW2");
        assert_eq!(mass_label(2.4000000000000004), "logM24");
    }

    #[test]
    fn test_write_table_layout() {
        let columns = vec![
            SnapshotColumn {
                log_mass: 2.0,
                values: array![123.45, 200.0],
            },
            SnapshotColumn {
                log_mass: 2.2,
                values: array![456.0, 310.0],
            },
        ];
        let mut out = Vec::new();
        write_snapshot_table(&mut out, &columns).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "     logM20      logM22");
        assert_eq!(lines[1], "1.23450e+02 4.56000e+02");
        assert_eq!(lines[2], "2.00000e+02 3.10000e+02");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_write_table_rejects_ragged_columns() {
        let columns = vec![
            SnapshotColumn {
                log_mass: 2.0,
                values: array![1.0, 2.0],
            },
            SnapshotColumn {
                log_mass: 2.2,
                values: array![3.0],
            },
        ];
        let mut out = Vec::new();
        assert!(matches!(
            write_snapshot_table(&mut out, &columns),
            Err(ExportError::RaggedColumns { key: 22, len: 1, expected: 2 })
        ));
        assert!(out.is_empty());
        assert!(matches!(
            write_snapshot_table(&mut out, &[]),
            Err(ExportError::NoColumns)
        ));
    }

    #[test]
    fn test_write_file_from_aggregates() {
        let dir = TempDir::new().unwrap();
        let a = sample_result();
        let mut b = sample_result();
        b.log_mass = 2.2;

        let spec = SnapshotSpec::new(Field::Luminosity, Some("FUV"));
        let path = write_snapshot_file(dir.path(), &spec, &[a, b], 1).unwrap();
        assert!(path.ends_with("LFUV1.txt"));

        let text = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "2.00000e+01 2.00000e+01");
        assert_eq!(lines[3], "6.00000e+01 6.00000e+01");
    }

    #[test]
    fn test_ragged_and_out_of_range() {
        let dir = TempDir::new().unwrap();
        let a = sample_result();
        let mut b = sample_result();
        b.log_mass = 2.2;
        b.lbol = array![[1.0, 2.0]];
        b.ntrial_tot = 1;

        let spec = SnapshotSpec::new(Field::Lbol, None);
        assert!(matches!(
            write_snapshot_file(dir.path(), &spec, &[a.clone(), b], 0),
            Err(ExportError::RaggedColumns { key: 22, len: 1, expected: 3 })
        ));
        assert!(matches!(
            write_snapshot_file(dir.path(), &spec, &[a.clone()], 5),
            Err(ExportError::TimeIndexOutOfRange { index: 5, .. })
        ));
        assert!(matches!(
            write_snapshot_file(dir.path(), &SnapshotSpec::new(Field::PhotonRate, None), &[a], 0),
            Err(ExportError::Field(FieldError::MissingBand(Field::PhotonRate)))
        ));
    }
}
