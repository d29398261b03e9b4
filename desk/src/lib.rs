//! Event check-in desk.
//!
//! Staff search a static guest list and record admissions against a shared
//! document store. The desk is built as a single reducer over one explicit
//! state value:
//!
//! - Guest search with a debounced evaluation while the query is typed
//! - Check-in rules per ticket type (single admission or a table with a
//!   fixed number of seats)
//! - A local reflection of what the shared store says has been checked in
//! - Pluggable document stores (in-memory and Firestore REST)
//!
//! # Quick Start
//!
//! ```no_run
//! use checkin_desk::{
//!     DeskAction, DeskEnvironment, DeskReducer, DeskSettings, DeskState,
//!     InMemoryDocumentStore,
//! };
//! use checkin_desk_core::environment::SystemClock;
//! use checkin_desk_runtime::Store;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tickets = checkin_desk::guest_list::load("data/eventData.json")?;
//! let settings = DeskSettings::default();
//! let env = DeskEnvironment::new(
//!     Arc::new(InMemoryDocumentStore::new()),
//!     Arc::new(SystemClock),
//!     settings.clone(),
//! );
//! let store = Store::new(DeskState::new(tickets, &settings), DeskReducer::new(), env);
//!
//! // Pull the current check-ins, then search
//! store.send(DeskAction::LoadCheckIns).await?.wait().await;
//! store.send(DeskAction::QueryChanged { query: "amina".into() }).await?;
//! store.send(DeskAction::SearchSubmitted).await?;
//!
//! let hits = store.state(|s| s.search.results.len()).await;
//! println!("{hits} matching tickets");
//! # Ok(())
//! # }
//! ```

mod checkin;
pub mod cli;
pub mod config;
pub mod documents;
pub mod error;
pub mod guest_list;
pub mod reducer;
pub mod search;
pub mod types;
pub mod view;

// Re-export commonly used types
pub use config::{Config, DeskSettings};
pub use documents::{
    CheckInPatch, DocumentStore, FirestoreDocumentStore, InMemoryDocumentStore, RecordHandle,
    StoreError, StoredCheckIn,
};
pub use error::{CheckInError, ConfigError, GuestListError};
pub use reducer::{DeskEnvironment, DeskReducer, SEARCH_DEBOUNCE};
pub use search::{MatchField, MatchFields};
pub use types::{
    CheckInRecord, CheckInState, CheckInStatus, DeskAction, DeskState, Notice, SearchState,
    TicketNumber, TicketRecord, TicketType,
};
