//! Session store backed by a JSON file

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info};

use super::{sort_by_timestamp, SessionRecord, SessionStore};
use crate::error::{CalibrationError, Result};

/// Append-only store holding all records as one JSON array.
///
/// A missing file is an empty store. Writes rewrite the whole file, so this
/// suits the handful of sessions a device accumulates, not a fleet.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_records(&self) -> Result<Vec<SessionRecord>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Session file not found, starting empty");
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            CalibrationError::persistence(
                format!("failed to read session file {}", self.path.display()),
                e,
            )
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            CalibrationError::persistence(
                format!("failed to parse session file {}", self.path.display()),
                e,
            )
        })
    }
}

impl SessionStore for JsonFileStore {
    fn insert(&self, record: &SessionRecord) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut records = self.read_records()?;
        records.push(record.clone());

        let contents = serde_json::to_string_pretty(&records)
            .map_err(|e| CalibrationError::persistence("failed to serialize sessions", e))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CalibrationError::persistence("failed to create session directory", e)
            })?;
        }
        std::fs::write(&self.path, contents).map_err(|e| {
            CalibrationError::persistence(
                format!("failed to write session file {}", self.path.display()),
                e,
            )
        })?;

        info!(
            path = %self.path.display(),
            session = %record.session_name,
            total = records.len(),
            "Saved calibration session"
        );
        Ok(())
    }

    fn select_all(&self, device_id: Option<&str>) -> Result<Vec<SessionRecord>> {
        let mut records: Vec<SessionRecord> = self
            .read_records()?
            .into_iter()
            .filter(|r| device_id.map_or(true, |id| r.device_id == id))
            .collect();
        sort_by_timestamp(&mut records);
        Ok(records)
    }
}
