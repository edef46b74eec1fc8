//! JSON file adapter for the pump table.
//!
//! Implements [`PumpStore`] over one JSON object keyed by slot:
//!
//! ```json
//! { "pump_1": { "name": "Pump 1", "pin": 17, "value": "gin" } }
//! ```
//!
//! Writes go to a sibling temp file which is then renamed over the
//! original, so a crash mid-write leaves the previous table intact.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::app::ports::PumpStore;
use crate::error::{ConfigError, PersistenceError};
use crate::registry::PumpTable;

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl PumpStore for JsonFileStore {
    fn load(&self) -> Result<PumpTable, ConfigError> {
        let text = fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: self.path.clone(),
                }
            } else {
                ConfigError::Unreadable {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;
        let table: PumpTable = serde_json::from_str(&text).map_err(|e| ConfigError::Malformed {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        info!("JsonFileStore: loaded {} slot(s) from {}", table.len(), self.path.display());
        Ok(table)
    }

    fn save(&self, table: &PumpTable) -> Result<(), PersistenceError> {
        let text = serde_json::to_string_pretty(table)?;
        let tmp = self.temp_path();
        fs::write(&tmp, text).map_err(|e| self.io_error(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(&self.path, e))?;
        debug!("JsonFileStore: wrote {}", self.path.display());
        Ok(())
    }
}
