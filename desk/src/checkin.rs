//! Check-in round trips against the document store.
//!
//! The reducer decides *whether* a check-in may happen and marks the ticket
//! as loading; the functions here run inside effects and turn the outcome of
//! the store calls into a result action. Every store call is bounded by the
//! configured timeout, so a result action always arrives and the loading
//! flag is always released.
//!
//! The find-then-write sequence is not atomic at the store. The loading flag
//! serializes check-ins of one ticket on this desk only.

use crate::documents::{
    CheckInPatch, DocumentStore, StoreError, StoreFuture, TICKET_NUMBER_FIELD,
};
use crate::error::CheckInError;
use crate::reducer::DeskEnvironment;
use crate::types::{CheckInRecord, DeskAction, TicketRecord};
use checkin_desk_core::environment::Clock;
use std::sync::Arc;
use std::time::Duration;

/// Everything a check-in effect needs, detached from the environment borrow
#[derive(Clone)]
pub(crate) struct CheckInContext {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    collection: String,
    timeout: Duration,
}

impl CheckInContext {
    pub(crate) fn new(env: &DeskEnvironment) -> Self {
        Self {
            store: Arc::clone(&env.store),
            clock: Arc::clone(&env.clock),
            collection: env.settings.collection.clone(),
            timeout: env.settings.store_timeout,
        }
    }

    async fn bounded<T>(&self, call: StoreFuture<'_, T>) -> Result<T, StoreError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| StoreError::Timeout)?
    }

    /// Full scan of the check-in collection
    #[tracing::instrument(skip(self), fields(collection = %self.collection))]
    pub(crate) async fn load(self, scan: u64) -> DeskAction {
        match self.bounded(self.store.list_all(&self.collection)).await {
            Ok(stored) => {
                tracing::debug!(records = stored.len(), "Fetched check-in records");
                DeskAction::CheckInsLoaded {
                    scan,
                    records: stored.into_iter().map(|s| s.record).collect(),
                }
            },
            Err(error) => DeskAction::CheckInsLoadFailed {
                error: CheckInError::StoreRead(error),
            },
        }
    }

    /// Single admission: write one record unless one already exists
    #[tracing::instrument(skip(self, ticket), fields(ticket_number = %ticket.ticket_number))]
    pub(crate) async fn check_in_single(self, ticket: TicketRecord) -> DeskAction {
        let ticket_number = ticket.ticket_number.clone();

        let existing = match self
            .bounded(self.store.find_where(
                &self.collection,
                TICKET_NUMBER_FIELD,
                ticket_number.as_str(),
            ))
            .await
        {
            Ok(existing) => existing,
            Err(error) => return Self::failed(&ticket, CheckInError::StoreRead(error)),
        };

        if !existing.is_empty() {
            tracing::debug!("Check-in record already exists, skipping");
            return DeskAction::CheckInSkipped { ticket_number };
        }

        let record = CheckInRecord::for_ticket(&ticket, self.clock.now(), None);
        match self
            .bounded(self.store.insert(&self.collection, record))
            .await
        {
            Ok(handle) => {
                tracing::info!(document = %handle, "Recorded check-in");
                metrics::counter!("checkin.recorded", "ticket_type" => "single").increment(1);
                DeskAction::CheckInRecorded {
                    ticket_number,
                    remaining_guests: None,
                }
            },
            Err(error) => Self::failed(&ticket, CheckInError::StoreWrite(error)),
        }
    }

    /// Table: consume one seat, creating the record on first use
    ///
    /// `remaining` is the count the desk knew before this check-in.
    #[tracing::instrument(skip(self, ticket), fields(ticket_number = %ticket.ticket_number))]
    pub(crate) async fn check_in_table(self, ticket: TicketRecord, remaining: u32) -> DeskAction {
        let ticket_number = ticket.ticket_number.clone();
        let next = remaining.saturating_sub(1);

        let existing = match self
            .bounded(self.store.find_where(
                &self.collection,
                TICKET_NUMBER_FIELD,
                ticket_number.as_str(),
            ))
            .await
        {
            Ok(existing) => existing,
            Err(error) => return Self::failed(&ticket, CheckInError::StoreRead(error)),
        };

        if existing.len() > 1 {
            tracing::warn!(
                records = existing.len(),
                "Several check-in records for one table, updating the first"
            );
        }

        let written = match existing.first() {
            None => {
                let record = CheckInRecord::for_ticket(&ticket, self.clock.now(), Some(next));
                self.bounded(self.store.insert(&self.collection, record))
                    .await
                    .map(|_| ())
            },
            Some(stored) => {
                self.bounded(
                    self.store
                        .update(&stored.handle, CheckInPatch::remaining_guests(next)),
                )
                .await
            },
        };

        match written {
            Ok(()) => {
                tracing::info!(remaining_guests = next, "Recorded table check-in");
                metrics::counter!("checkin.recorded", "ticket_type" => "table").increment(1);
                DeskAction::CheckInRecorded {
                    ticket_number,
                    remaining_guests: Some(next),
                }
            },
            Err(error) => Self::failed(&ticket, CheckInError::StoreWrite(error)),
        }
    }

    fn failed(ticket: &TicketRecord, error: CheckInError) -> DeskAction {
        metrics::counter!("checkin.failed").increment(1);
        DeskAction::CheckInFailed {
            ticket_number: ticket.ticket_number.clone(),
            error,
        }
    }
}
