//! Shared document store holding check-in records.
//!
//! The desk only needs four operations on one collection: a full scan, an
//! equality query, an insert, and a partial update. [`DocumentStore`] is
//! object-safe so the environment can hold any backend behind an `Arc`.

mod firestore;
mod memory;

pub use firestore::FirestoreDocumentStore;
pub use memory::InMemoryDocumentStore;

use crate::types::CheckInRecord;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Field holding the ticket number in a persisted record
pub const TICKET_NUMBER_FIELD: &str = "ticketNumber";

/// Failure talking to the document store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The call did not complete in time
    #[error("Document store timed out")]
    Timeout,

    /// The store could not be reached
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    /// The store answered with an error
    #[error("Document store error {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// A response or document could not be decoded
    #[error("Could not decode document: {0}")]
    Decode(String),

    /// The addressed document does not exist
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Internal lock poisoned
    #[error("Document store lock poisoned")]
    Lock,
}

/// Opaque address of a stored record
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordHandle(String);

impl RecordHandle {
    /// Wraps a backend-specific document name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Backend-specific document name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A record together with its address
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredCheckIn {
    /// Where the record lives
    pub handle: RecordHandle,
    /// Record contents
    pub record: CheckInRecord,
}

/// Partial update of a stored record; unset fields are left alone
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInPatch {
    /// New remaining seat count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_guests: Option<u32>,
}

impl CheckInPatch {
    /// Patch setting the remaining seat count
    #[must_use]
    pub const fn remaining_guests(remaining: u32) -> Self {
        Self {
            remaining_guests: Some(remaining),
        }
    }

    /// Persisted names of the fields this patch sets
    #[must_use]
    pub fn field_paths(&self) -> Vec<&'static str> {
        let mut paths = Vec::new();
        if self.remaining_guests.is_some() {
            paths.push("remainingGuests");
        }
        paths
    }

    /// Applies the patch to a record
    pub fn apply(&self, record: &mut CheckInRecord) {
        if let Some(remaining) = self.remaining_guests {
            record.remaining_guests = Some(remaining);
        }
    }
}

/// Boxed future returned by [`DocumentStore`] methods
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Document store holding check-in records
///
/// Methods return boxed futures so the trait stays object-safe.
pub trait DocumentStore: Send + Sync {
    /// Every record in `collection`
    fn list_all<'a>(&'a self, collection: &'a str) -> StoreFuture<'a, Vec<StoredCheckIn>>;

    /// Records in `collection` whose `field` equals `value`
    fn find_where<'a>(
        &'a self,
        collection: &'a str,
        field: &'a str,
        value: &'a str,
    ) -> StoreFuture<'a, Vec<StoredCheckIn>>;

    /// Adds a record to `collection`
    fn insert<'a>(
        &'a self,
        collection: &'a str,
        record: CheckInRecord,
    ) -> StoreFuture<'a, RecordHandle>;

    /// Applies `patch` to the record at `handle`
    fn update<'a>(&'a self, handle: &'a RecordHandle, patch: CheckInPatch) -> StoreFuture<'a, ()>;
}
