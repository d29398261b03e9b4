//! Error types for the check-in desk.

use crate::documents::StoreError;
use crate::types::TicketNumber;
use std::path::PathBuf;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════
// Check-in
// ═══════════════════════════════════════════════════════════════════════

/// Why a check-in (or the check-in scan) did not go through
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckInError {
    /// Listing or querying the store failed
    ///
    /// The reflection keeps its last known values.
    #[error("Could not read check-ins: {0}")]
    StoreRead(StoreError),

    /// Inserting or updating a record failed
    ///
    /// The ticket keeps its previous status.
    #[error("Could not record check-in: {0}")]
    StoreWrite(StoreError),

    /// The table has no remaining guests; nothing was written
    #[error("Table {ticket_number} has no remaining guests")]
    CapacityExceeded {
        /// Exhausted table
        ticket_number: TicketNumber,
    },

    /// The ticket is already checked in
    #[error("Ticket {ticket_number} is already checked in")]
    AlreadyCheckedIn {
        /// Ticket in question
        ticket_number: TicketNumber,
    },

    /// A check-in for the ticket is still in flight
    #[error("A check-in for {ticket_number} is already in progress")]
    InFlight {
        /// Ticket in question
        ticket_number: TicketNumber,
    },

    /// The initial scan of the store has not completed
    #[error("Check-ins are still loading, try again shortly")]
    NotReady,
}

impl CheckInError {
    /// Whether the error is a no-op the user should not be told about
    #[must_use]
    pub const fn is_silent(&self) -> bool {
        matches!(self, Self::AlreadyCheckedIn { .. } | Self::InFlight { .. })
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Guest list
// ═══════════════════════════════════════════════════════════════════════

/// Failure to load the static guest list
#[derive(Error, Debug)]
pub enum GuestListError {
    /// The file could not be read
    #[error("Failed to read guest list {path}: {source}")]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The file is not a JSON array of guest rows
    #[error("Invalid guest list: {0}")]
    Parse(#[from] serde_json::Error),

    /// A row has no ticket number
    #[error("Guest list row {row} has no ticket number")]
    MissingTicketNumber {
        /// Zero-based row index
        row: usize,
    },

    /// Two rows share a ticket number
    #[error("Duplicate ticket number in guest list: {ticket_number}")]
    DuplicateTicket {
        /// Repeated number
        ticket_number: TicketNumber,
    },
}

// ═══════════════════════════════════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════════════════════════════════

/// Invalid or incomplete configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable holds a value that cannot be used
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        /// Variable name
        key: &'static str,
        /// Value found
        value: String,
        /// What was expected
        reason: String,
    },

    /// A variable required by the selected backend is not set
    #[error("{key} must be set when {context}")]
    Missing {
        /// Variable name
        key: &'static str,
        /// Why it is required
        context: &'static str,
    },
}
