//! Session persistence
//!
//! The engine talks to storage through [`SessionStore`], passed in
//! explicitly by the caller. Stores are append-only: a written record is
//! never modified. Retrying failed writes is the caller's choice, see
//! [`insert_with_retry`].

pub mod file;
pub mod memory;
pub mod record;

use std::time::Duration;

use tracing::{info, warn};

use crate::config::PersistenceConfig;
use crate::error::{CalibrationError, Result};
use crate::session::CalibrationSession;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use record::{encode_timestamp, parse_timestamp, SessionRecord};

/// Read/write contract of a calibration session store
pub trait SessionStore: Send + Sync {
    /// Append a record
    fn insert(&self, record: &SessionRecord) -> Result<()>;

    /// All records, optionally only those of one device, ordered by
    /// ascending timestamp
    fn select_all(&self, device_id: Option<&str>) -> Result<Vec<SessionRecord>>;
}

/// Sort records by their decoded timestamp; undecodable timestamps go first
pub(crate) fn sort_by_timestamp(records: &mut [SessionRecord]) {
    records.sort_by_cached_key(|r| parse_timestamp(&r.timestamp).ok());
}

/// How often and how patiently a failed write is retried
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub backoff_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_delay: Duration::from_millis(100),
        }
    }
}

impl From<&PersistenceConfig> for RetryPolicy {
    fn from(config: &PersistenceConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_delay: Duration::from_millis(config.backoff_ms),
        }
    }
}

/// Insert a record, retrying failures up to `policy.max_attempts` times.
///
/// Returns the last error once the attempts are used up.
pub fn insert_with_retry(
    store: &dyn SessionStore,
    record: &SessionRecord,
    policy: &RetryPolicy,
) -> Result<()> {
    let attempts = policy.max_attempts.max(1);
    let mut last_error = None;
    for attempt in 1..=attempts {
        match store.insert(record) {
            Ok(()) => {
                info!(
                    session = %record.session_name,
                    attempt,
                    "Calibration session stored"
                );
                return Ok(());
            }
            Err(e) => {
                warn!(attempt, attempts, error = %e, "Session store write failed");
                last_error = Some(e);
                if attempt < attempts {
                    std::thread::sleep(policy.backoff_delay);
                }
            }
        }
    }
    Err(last_error.unwrap_or_else(|| CalibrationError::Persistence {
        message: "no write attempted".to_string(),
        source: None,
    }))
}

/// Load a device's history as typed sessions, oldest first.
///
/// Records that cannot be decoded are skipped with a warning so one bad row
/// does not hide the rest of the history.
pub fn load_history(store: &dyn SessionStore, device_id: &str) -> Result<Vec<CalibrationSession>> {
    let records = store.select_all(Some(device_id))?;
    let total = records.len();
    let sessions: Vec<CalibrationSession> = records
        .into_iter()
        .filter_map(|record| {
            let name = record.session_name.clone();
            match record.into_session() {
                Ok(session) => Some(session),
                Err(e) => {
                    warn!(session = %name, error = %e, "Skipping undecodable session record");
                    None
                }
            }
        })
        .collect();
    info!(
        device_id,
        loaded = sessions.len(),
        skipped = total - sessions.len(),
        "Calibration history loaded"
    );
    Ok(sessions)
}
