//! In-process session store

use parking_lot::RwLock;

use super::{sort_by_timestamp, SessionRecord, SessionStore};
use crate::error::Result;

/// Session store kept in memory, shared across threads
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<SessionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn insert(&self, record: &SessionRecord) -> Result<()> {
        self.records.write().push(record.clone());
        Ok(())
    }

    fn select_all(&self, device_id: Option<&str>) -> Result<Vec<SessionRecord>> {
        let mut selected: Vec<SessionRecord> = self
            .records
            .read()
            .iter()
            .filter(|r| device_id.map_or(true, |id| r.device_id == id))
            .cloned()
            .collect();
        sort_by_timestamp(&mut selected);
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(device: &str, timestamp: &str) -> SessionRecord {
        SessionRecord {
            device_id: device.to_string(),
            session_name: timestamp.to_string(),
            gamma_value: 2.2,
            lut: "[]".to_string(),
            camera_matrix: "[]".to_string(),
            dist_coeffs: "[]".to_string(),
            color_correction_matrix: None,
            awb_gains: None,
            mura_compensation_map: None,
            error_statistics: None,
            timestamp: format!("\"{timestamp}\""),
        }
    }

    #[test]
    fn test_select_filters_and_orders() {
        let store = MemoryStore::new();
        store.insert(&record("a", "2024-03-01T00:00:00Z")).unwrap();
        store.insert(&record("b", "2024-01-01T00:00:00Z")).unwrap();
        store.insert(&record("a", "2024-02-01T00:00:00Z")).unwrap();

        let a = store.select_all(Some("a")).unwrap();
        assert_eq!(a.len(), 2);
        assert!(a[0].session_name.starts_with("2024-02"));
        assert_eq!(store.select_all(None).unwrap().len(), 3);
        assert!(store.select_all(Some("c")).unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_inserts() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for day in 1..=5 {
                        let ts = format!("2024-0{}-0{day}T00:00:00Z", i + 1);
                        store.insert(&record("dev", &ts)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 20);
    }
}
