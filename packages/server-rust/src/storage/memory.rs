//! In-memory guest store.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use guestlist_core::UserRecord;

use super::{StoreError, UserStore};

/// `DashMap`-backed store keyed by id.
///
/// [`set_available`](Self::set_available) simulates an unreachable backend:
/// while unavailable every call fails with [`StoreError::Connection`].
#[derive(Debug)]
pub struct MemoryUserStore {
    users: DashMap<u64, UserRecord>,
    available: AtomicBool,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = UserRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.users.insert(record.id, record);
        }
        store
    }

    /// Loads a JSON array of records.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_seed_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let records: Vec<UserRecord> = serde_json::from_str(&raw)?;
        tracing::info!(path = %path.display(), count = records.len(), "seeded in-memory store");
        Ok(Self::with_records(records))
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(StoreError::Connection("in-memory store marked unavailable".to_string()))
        }
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_surname(&self, surname: &str) -> Result<Vec<UserRecord>, StoreError> {
        self.check_available()?;
        let needle = surname.to_lowercase();
        let mut found: Vec<UserRecord> = self
            .users
            .iter()
            .filter(|entry| entry.surname.to_lowercase().contains(&needle))
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by_key(|r| r.id);
        Ok(found)
    }

    async fn find_by_id(&self, id: u64) -> Result<UserRecord, StoreError> {
        self.check_available()?;
        self.users
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound { id })
    }

    async fn update_user(&self, record: &UserRecord) -> Result<(), StoreError> {
        self.check_available()?;
        match self.users.get_mut(&record.id) {
            Some(mut entry) => {
                *entry = record.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound { id: record.id }),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}
