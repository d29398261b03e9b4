//! In-memory document store for tests and offline use.

use super::{CheckInPatch, DocumentStore, RecordHandle, StoreError, StoreFuture, StoredCheckIn};
use crate::types::CheckInRecord;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

type Collections = HashMap<String, BTreeMap<String, CheckInRecord>>;

/// Document store kept in process memory
///
/// Handles have the form `{collection}/{id}`. Query fields are compared
/// against the record's persisted JSON form, so any persisted field name
/// works (`ticketNumber`, `donor`, ...).
///
/// Failure injection and artificial latency let tests exercise the
/// check-in error paths.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<Collections>,
    writes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    latency_ms: AtomicU64,
}

impl InMemoryDocumentStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent read fail with [`StoreError::Unavailable`]
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent write fail with [`StoreError::Unavailable`]
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Delays every call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::SeqCst);
    }

    /// Number of successful inserts and updates
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Records in `collection`, in id order
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Lock`] if the lock is poisoned.
    pub fn records(&self, collection: &str) -> Result<Vec<CheckInRecord>, StoreError> {
        let collections = self.collections.read().map_err(|_| StoreError::Lock)?;
        Ok(collections
            .get(collection)
            .map(|documents| documents.values().cloned().collect())
            .unwrap_or_default())
    }

    /// Seeds a record without counting it as a write
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Lock`] if the lock is poisoned.
    pub fn seed(&self, collection: &str, record: CheckInRecord) -> Result<RecordHandle, StoreError> {
        self.put(collection, record)
    }

    fn put(&self, collection: &str, record: CheckInRecord) -> Result<RecordHandle, StoreError> {
        let id = Uuid::new_v4().to_string();
        let mut collections = self.collections.write().map_err(|_| StoreError::Lock)?;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), record);
        Ok(RecordHandle::new(format!("{collection}/{id}")))
    }

    async fn simulate(&self, failing: &AtomicBool) -> Result<(), StoreError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }

    fn scan<F>(&self, collection: &str, mut keep: F) -> Result<Vec<StoredCheckIn>, StoreError>
    where
        F: FnMut(&CheckInRecord) -> bool,
    {
        let collections = self.collections.read().map_err(|_| StoreError::Lock)?;
        let Some(documents) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(documents
            .iter()
            .filter(|(_, record)| keep(record))
            .map(|(id, record)| StoredCheckIn {
                handle: RecordHandle::new(format!("{collection}/{id}")),
                record: record.clone(),
            })
            .collect())
    }
}

/// Whether the persisted `field` of `record` equals `value`
fn field_equals(record: &CheckInRecord, field: &str, value: &str) -> bool {
    let Ok(document) = serde_json::to_value(record) else {
        return false;
    };

    match document.get(field) {
        Some(Value::String(stored)) => stored == value,
        Some(Value::Number(stored)) => stored.to_string() == value,
        Some(Value::Bool(stored)) => stored.to_string() == value,
        _ => false,
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn list_all<'a>(&'a self, collection: &'a str) -> StoreFuture<'a, Vec<StoredCheckIn>> {
        Box::pin(async move {
            self.simulate(&self.fail_reads).await?;
            self.scan(collection, |_| true)
        })
    }

    fn find_where<'a>(
        &'a self,
        collection: &'a str,
        field: &'a str,
        value: &'a str,
    ) -> StoreFuture<'a, Vec<StoredCheckIn>> {
        Box::pin(async move {
            self.simulate(&self.fail_reads).await?;
            self.scan(collection, |record| field_equals(record, field, value))
        })
    }

    fn insert<'a>(
        &'a self,
        collection: &'a str,
        record: CheckInRecord,
    ) -> StoreFuture<'a, RecordHandle> {
        Box::pin(async move {
            self.simulate(&self.fail_writes).await?;
            let handle = self.put(collection, record)?;
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(handle)
        })
    }

    fn update<'a>(&'a self, handle: &'a RecordHandle, patch: CheckInPatch) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.simulate(&self.fail_writes).await?;

            let (collection, id) = handle
                .as_str()
                .split_once('/')
                .ok_or_else(|| StoreError::NotFound(handle.to_string()))?;

            let mut collections = self.collections.write().map_err(|_| StoreError::Lock)?;
            let record = collections
                .get_mut(collection)
                .and_then(|documents| documents.get_mut(id))
                .ok_or_else(|| StoreError::NotFound(handle.to_string()))?;

            patch.apply(record);
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use crate::documents::TICKET_NUMBER_FIELD;
    use crate::types::{TicketRecord, TicketType};
    use chrono::Utc;

    fn amina() -> CheckInRecord {
        let ticket = TicketRecord::new("Amina Yusuf", "T001", "R-100", TicketType::Table);
        CheckInRecord::for_ticket(&ticket, Utc::now(), Some(9))
    }

    fn bilal() -> CheckInRecord {
        let ticket = TicketRecord::new("Bilal", "T002", "R-200", TicketType::from_label("Individual"));
        CheckInRecord::for_ticket(&ticket, Utc::now(), None)
    }

    #[tokio::test]
    async fn insert_then_find_by_ticket_number() {
        let store = InMemoryDocumentStore::new();
        let handle = store.insert("checkIns", amina()).await.unwrap();
        store.insert("checkIns", bilal()).await.unwrap();

        assert!(handle.as_str().starts_with("checkIns/"));

        let found = store
            .find_where("checkIns", TICKET_NUMBER_FIELD, "T001")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].handle, handle);
        assert_eq!(found[0].record.remaining_guests, Some(9));

        let by_donor = store.find_where("checkIns", "donor", "Bilal").await.unwrap();
        assert_eq!(by_donor.len(), 1);

        let by_count = store
            .find_where("checkIns", "remainingGuests", "9")
            .await
            .unwrap();
        assert_eq!(by_count.len(), 1);
        assert_eq!(store.writes(), 2);
    }

    #[tokio::test]
    async fn collections_are_separate() {
        let store = InMemoryDocumentStore::new();
        store.insert("checkIns", amina()).await.unwrap();

        assert!(store.list_all("other").await.unwrap().is_empty());
        assert_eq!(store.list_all("checkIns").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_applies_patch() {
        let store = InMemoryDocumentStore::new();
        let handle = store.insert("checkIns", amina()).await.unwrap();

        store
            .update(&handle, CheckInPatch::remaining_guests(3))
            .await
            .unwrap();

        let records = store.records("checkIns").unwrap();
        assert_eq!(records[0].remaining_guests, Some(3));
    }

    #[tokio::test]
    async fn update_unknown_handle_is_not_found() {
        let store = InMemoryDocumentStore::new();
        let missing = RecordHandle::new("checkIns/nope");
        let result = store.update(&missing, CheckInPatch::remaining_guests(1)).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));

        let malformed = RecordHandle::new("nope");
        let result = store.update(&malformed, CheckInPatch::remaining_guests(1)).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn injected_failures() {
        let store = InMemoryDocumentStore::new();
        store.seed("checkIns", amina()).unwrap();

        store.fail_reads(true);
        assert!(matches!(
            store.list_all("checkIns").await,
            Err(StoreError::Unavailable(_))
        ));

        store.fail_reads(false);
        store.fail_writes(true);
        assert!(store.list_all("checkIns").await.is_ok());
        assert!(store.insert("checkIns", bilal()).await.is_err());
        assert_eq!(store.writes(), 0);
    }
}
