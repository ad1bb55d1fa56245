//! On-disk cache of aggregated results
//!
//! One file per cluster mass, named after the model base and
//! `round(10 · logM)`. Entries are bincode-encoded [`AggregateResult`]s that
//! carry their layout version; an entry with a different version is treated as
//! missing so the caller recomputes it.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;

use crate::result::{AggregateResult, CACHE_FORMAT_VERSION};

/// Errors from reading or writing cache entries
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error on cache entry {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode or decode cache entry {path}: {source}")]
    Codec {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },
}

/// Integer key for a cluster mass: `round(10 · logM)`
///
/// Rounding keeps masses produced by floating point grids on the same key as
/// their decimal value.
pub fn mass_key(log_mass: f64) -> i64 {
    (log_mass * 10.0).round() as i64
}

/// Directory of cached aggregates for one analysis
#[derive(Debug, Clone)]
pub struct AggregateCache {
    dir: PathBuf,
    model_base: String,
}

impl AggregateCache {
    pub fn new(dir: impl Into<PathBuf>, model_base: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            model_base: model_base.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the entry for a cluster mass
    pub fn entry_path(&self, log_mass: f64) -> PathBuf {
        self.dir
            .join(format!("{}{:02}.bin", self.model_base, mass_key(log_mass)))
    }

    pub fn contains(&self, log_mass: f64) -> bool {
        self.entry_path(log_mass).is_file()
    }

    /// Load the entry for a cluster mass
    ///
    /// Returns `Ok(None)` when there is no entry or when it was written with a
    /// different layout version.
    pub fn load(&self, log_mass: f64) -> Result<Option<AggregateResult>, CacheError> {
        let path = self.entry_path(log_mass);
        if !path.is_file() {
            debug!("No cache entry at {}", path.display());
            return Ok(None);
        }

        let bytes = std::fs::read(&path).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;

        // The version leads every entry, so it can be checked before the rest
        // of a possibly incompatible layout is decoded.
        let version: u32 = bincode::deserialize(&bytes).map_err(|source| CacheError::Codec {
            path: path.clone(),
            source,
        })?;
        if version != CACHE_FORMAT_VERSION {
            warn!(
                "Cache entry {} has layout version {}, expected {}; ignoring it",
                path.display(),
                version,
                CACHE_FORMAT_VERSION
            );
            return Ok(None);
        }

        let result: AggregateResult =
            bincode::deserialize(&bytes).map_err(|source| CacheError::Codec {
                path: path.clone(),
                source,
            })?;

        Ok(Some(result))
    }

    /// Write the entry for `result.log_mass`, creating the cache directory
    ///
    /// The entry is written to a sibling temporary file and renamed into
    /// place, so a failed write leaves any previous entry intact. Returns the
    /// path that was written.
    pub fn store(&self, result: &AggregateResult) -> Result<PathBuf, CacheError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| CacheError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.entry_path(result.log_mass);
        let tmp = path.with_extension("bin.tmp");
        if let Err(err) = write_entry(&tmp, result) {
            let _ = std::fs::remove_file(&tmp);
            return Err(err);
        }
        std::fs::rename(&tmp, &path).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;

        debug!("Wrote cache entry {}", path.display());
        Ok(path)
    }
}

fn write_entry(path: &Path, result: &AggregateResult) -> Result<(), CacheError> {
    let io_err = |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, result).map_err(|source| CacheError::Codec {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_err)?;
    writer.get_ref().sync_all().map_err(io_err)
}
