use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::subscriber::{SubscriberPatch, SubscriberRecord};
use crate::domain::subscriber_email::SubscriberEmail;
use crate::store::{InsertError, StoreError, SubscriberStore};

/// Process-local store. Every check-and-write runs under a single lock acquisition.
#[derive(Default)]
pub struct InMemorySubscriberStore {
    records: Mutex<HashMap<String, SubscriberRecord>>,
    writes: AtomicUsize,
}

impl InMemorySubscriberStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful inserts and updates since creation.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn records(&self) -> Result<MutexGuard<'_, HashMap<String, SubscriberRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Failed("subscriber records lock is poisoned".into()))
    }
}

#[async_trait]
impl SubscriberStore for InMemorySubscriberStore {
    async fn insert(&self, record: &SubscriberRecord) -> Result<(), InsertError> {
        let mut records = self.records()?;

        if records.contains_key(record.email.as_ref()) {
            return Err(InsertError::UniqueViolation);
        }

        records.insert(record.email.as_ref().to_string(), record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(())
    }

    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<SubscriberRecord>, StoreError> {
        Ok(self.records()?.get(email.as_ref()).cloned())
    }

    async fn update(
        &self,
        email: &SubscriberEmail,
        patch: SubscriberPatch,
    ) -> Result<Option<SubscriberRecord>, StoreError> {
        let mut records = self.records()?;

        let record = match records.get_mut(email.as_ref()) {
            Some(record) if record.status == patch.expected_status => record,
            _ => return Ok(None),
        };

        patch.apply_to(record);
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(Some(record.clone()))
    }

    async fn find_active(&self) -> Result<Vec<SubscriberRecord>, StoreError> {
        let mut active: Vec<SubscriberRecord> = self
            .records()?
            .values()
            .filter(|record| record.status.is_active())
            .cloned()
            .collect();
        active.sort_by_key(|record| record.created_at);

        Ok(active)
    }
}
