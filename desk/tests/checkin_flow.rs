//! Integration tests for the check-in flow through the Store
//!
//! Drives the desk reducer with the real runtime against the in-memory
//! document store, covering table capacity, single-admission idempotency,
//! failure handling, and several desks sharing one store.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use checkin_desk::{
    CheckInError, CheckInRecord, CheckInStatus, DeskAction, DeskEnvironment, DeskReducer, DeskSettings,
    DeskState, DocumentStore, InMemoryDocumentStore, Notice, TicketNumber, TicketRecord,
    TicketType,
};
use checkin_desk_core::environment::Clock;
use checkin_desk_runtime::Store;
use checkin_desk_testing::{init_test_tracing, test_clock};
use std::sync::Arc;
use std::time::Duration;

type DeskStore = Store<DeskState, DeskAction, DeskEnvironment, DeskReducer>;

// ============================================================================
// Test Fixtures
// ============================================================================

const COLLECTION: &str = "checkIns";

fn amina() -> TicketRecord {
    TicketRecord::new("Amina Yusuf", "T001", "R-100", TicketType::Table)
}

fn bilal() -> TicketRecord {
    TicketRecord::new("Bilal", "T002", "R-200", TicketType::from_label("Individual"))
}

fn desk(documents: &Arc<InMemoryDocumentStore>) -> DeskStore {
    init_test_tracing();
    let settings = DeskSettings::default();
    let env = DeskEnvironment::new(
        Arc::clone(documents) as Arc<dyn DocumentStore>,
        Arc::new(test_clock()),
        settings.clone(),
    );
    Store::new(
        DeskState::new(vec![amina(), bilal()], &settings),
        DeskReducer::new(),
        env,
    )
}

async fn loaded_desk(documents: &Arc<InMemoryDocumentStore>) -> DeskStore {
    let store = desk(documents);
    store
        .send(DeskAction::LoadCheckIns)
        .await
        .unwrap()
        .wait()
        .await;
    assert!(store.state(|s| s.check_ins.is_ready()).await);
    store
}

async fn check_in(store: &DeskStore, ticket: TicketRecord) {
    store
        .send(DeskAction::CheckInRequested { ticket })
        .await
        .unwrap()
        .wait()
        .await;
}

async fn status(store: &DeskStore, ticket: &TicketRecord) -> CheckInStatus {
    store.state(|s| s.status(ticket)).await
}

// ============================================================================
// Table tickets
// ============================================================================

/// Ten check-ins exhaust a table; the eleventh is refused without a write
#[tokio::test]
async fn test_table_allows_ten_guests_then_rejects() {
    let documents = Arc::new(InMemoryDocumentStore::new());
    let store = loaded_desk(&documents).await;

    check_in(&store, amina()).await;
    assert_eq!(
        status(&store, &amina()).await,
        CheckInStatus::PartiallyCheckedIn { remaining: 9 }
    );
    let records = documents.records(COLLECTION).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].remaining_guests, Some(9));
    assert_eq!(records[0].ticket_type, TicketType::Table);

    for _ in 1..10 {
        check_in(&store, amina()).await;
    }

    assert_eq!(status(&store, &amina()).await, CheckInStatus::CheckedIn);
    assert_eq!(store.state(|s| s.check_ins.remaining_guests("T001")).await, Some(0));
    assert!(store.state(|s| s.check_ins.is_checked_in("T001")).await);
    let records = documents.records(COLLECTION).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].remaining_guests, Some(0));
    assert_eq!(documents.writes(), 10);

    store.send(DeskAction::NoticesDismissed).await.unwrap();
    check_in(&store, amina()).await;

    assert_eq!(documents.writes(), 10);
    let notices = store.state(|s| s.notices.clone()).await;
    assert_eq!(
        notices,
        vec![Notice::Rejected(CheckInError::CapacityExceeded {
            ticket_number: TicketNumber::new("T001"),
        })]
    );
}

/// A table record with a count from another desk is picked up on load
#[tokio::test]
async fn test_table_count_is_read_back_on_load() {
    let documents = Arc::new(InMemoryDocumentStore::new());
    let first = loaded_desk(&documents).await;
    for _ in 0..3 {
        check_in(&first, amina()).await;
    }

    let second = loaded_desk(&documents).await;
    assert_eq!(
        status(&second, &amina()).await,
        CheckInStatus::PartiallyCheckedIn { remaining: 7 }
    );

    check_in(&second, amina()).await;
    let records = documents.records(COLLECTION).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].remaining_guests, Some(6));
}

/// A stored table record without a type still counts seats for a listed table
#[tokio::test]
async fn test_untyped_table_record_keeps_its_seats() {
    let documents = Arc::new(InMemoryDocumentStore::new());
    let mut record = CheckInRecord::for_ticket(&amina(), test_clock().now(), Some(10));
    record.ticket_type = TicketType::from_label("");
    documents.seed(COLLECTION, record).unwrap();

    let store = loaded_desk(&documents).await;

    assert_eq!(status(&store, &amina()).await, CheckInStatus::NotCheckedIn);
    assert!(!store.state(|s| s.check_ins.is_checked_in("T001")).await);

    check_in(&store, amina()).await;
    assert_eq!(
        status(&store, &amina()).await,
        CheckInStatus::PartiallyCheckedIn { remaining: 9 }
    );
    assert_eq!(documents.records(COLLECTION).unwrap().len(), 1);
}

// ============================================================================
// Single-admission tickets
// ============================================================================

/// One check-in writes one record; repeating it is a silent no-op
#[tokio::test]
async fn test_single_ticket_is_idempotent() {
    let documents = Arc::new(InMemoryDocumentStore::new());
    let store = loaded_desk(&documents).await;

    check_in(&store, bilal()).await;
    assert_eq!(status(&store, &bilal()).await, CheckInStatus::CheckedIn);

    let records = documents.records(COLLECTION).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].ticket_number.as_str(), "T002");
    assert_eq!(records[0].remaining_guests, None);
    assert_eq!(records[0].check_in_time, test_clock().now());

    store.send(DeskAction::NoticesDismissed).await.unwrap();
    check_in(&store, bilal()).await;

    assert_eq!(documents.records(COLLECTION).unwrap().len(), 1);
    assert!(store.state(|s| s.notices.is_empty()).await);
}

/// A desk with a stale reflection finds the other desk's record and skips
#[tokio::test]
async fn test_stale_desk_does_not_duplicate_record() {
    let documents = Arc::new(InMemoryDocumentStore::new());
    let first = loaded_desk(&documents).await;
    let second = loaded_desk(&documents).await;

    check_in(&first, bilal()).await;
    check_in(&second, bilal()).await;

    assert_eq!(documents.records(COLLECTION).unwrap().len(), 1);
    assert!(!second.state(|s| s.check_ins.is_loading("T002")).await);

    second
        .send(DeskAction::LoadCheckIns)
        .await
        .unwrap()
        .wait()
        .await;
    assert_eq!(status(&second, &bilal()).await, CheckInStatus::CheckedIn);
}

// ============================================================================
// Guards and failures
// ============================================================================

/// A second click while the first round trip is outstanding is ignored
#[tokio::test(start_paused = true)]
async fn test_in_flight_ticket_ignores_second_click() {
    let documents = Arc::new(InMemoryDocumentStore::new());
    let store = loaded_desk(&documents).await;
    documents.set_latency(Duration::from_millis(50));

    let mut first = store
        .send(DeskAction::CheckInRequested { ticket: bilal() })
        .await
        .unwrap();
    assert_eq!(status(&store, &bilal()).await, CheckInStatus::CheckInInFlight);

    let mut second = store
        .send(DeskAction::CheckInRequested { ticket: bilal() })
        .await
        .unwrap();
    assert_eq!(second.pending(), 0);

    first.wait().await;
    second.wait().await;

    assert_eq!(documents.writes(), 1);
    assert_eq!(status(&store, &bilal()).await, CheckInStatus::CheckedIn);
}

/// Search keeps working while a check-in round trip is outstanding
#[tokio::test(start_paused = true)]
async fn test_search_updates_during_in_flight_check_in() {
    let documents = Arc::new(InMemoryDocumentStore::new());
    let store = loaded_desk(&documents).await;
    documents.set_latency(Duration::from_millis(50));

    let mut pending = store
        .send(DeskAction::CheckInRequested { ticket: bilal() })
        .await
        .unwrap();

    store
        .send(DeskAction::QueryChanged {
            query: "amina".to_string(),
        })
        .await
        .unwrap();
    store.send(DeskAction::SearchSubmitted).await.unwrap();

    let results = store
        .state(|s| {
            s.search
                .results
                .iter()
                .map(|ticket| ticket.ticket_number.to_string())
                .collect::<Vec<_>>()
        })
        .await;
    assert_eq!(results, vec!["T001"]);
    assert_eq!(status(&store, &bilal()).await, CheckInStatus::CheckInInFlight);

    pending.wait().await;
    assert_eq!(status(&store, &bilal()).await, CheckInStatus::CheckedIn);
}

/// Check-ins are refused until the reflection has been loaded
#[tokio::test]
async fn test_check_in_before_load_is_refused() {
    let documents = Arc::new(InMemoryDocumentStore::new());
    let store = desk(&documents);

    check_in(&store, bilal()).await;

    assert_eq!(documents.writes(), 0);
    assert_eq!(
        store.state(|s| s.notices.clone()).await,
        vec![Notice::Rejected(CheckInError::NotReady)]
    );
}

/// A failed write leaves the ticket actionable and tells the user
#[tokio::test]
async fn test_write_failure_releases_ticket() {
    let documents = Arc::new(InMemoryDocumentStore::new());
    let store = loaded_desk(&documents).await;
    documents.fail_writes(true);

    check_in(&store, amina()).await;

    assert_eq!(status(&store, &amina()).await, CheckInStatus::NotCheckedIn);
    let notices = store.state(|s| s.notices.clone()).await;
    assert!(matches!(
        notices.as_slice(),
        [Notice::Rejected(CheckInError::StoreWrite(_))]
    ));

    documents.fail_writes(false);
    check_in(&store, amina()).await;
    assert_eq!(
        status(&store, &amina()).await,
        CheckInStatus::PartiallyCheckedIn { remaining: 9 }
    );
}

/// A failed scan keeps the last known reflection
#[tokio::test]
async fn test_load_failure_keeps_reflection() {
    let documents = Arc::new(InMemoryDocumentStore::new());
    let store = loaded_desk(&documents).await;
    check_in(&store, bilal()).await;
    store.send(DeskAction::NoticesDismissed).await.unwrap();

    documents.fail_reads(true);
    store
        .send(DeskAction::LoadCheckIns)
        .await
        .unwrap()
        .wait()
        .await;

    assert_eq!(status(&store, &bilal()).await, CheckInStatus::CheckedIn);
    let notices = store.state(|s| s.notices.clone()).await;
    assert!(matches!(
        notices.as_slice(),
        [Notice::Rejected(CheckInError::StoreRead(_))]
    ));
}
