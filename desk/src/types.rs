//! Domain types for the check-in desk.
//!
//! Tickets come from the static guest list and never change. Check-in records
//! live in the shared document store; [`CheckInState`] is the desk's local
//! reflection of them.

use crate::config::DeskSettings;
use crate::error::CheckInError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};

// ========== Tickets ==========

/// Ticket number, the identity key of a ticket
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketNumber(String);

impl TicketNumber {
    /// Creates a ticket number from its printed form
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the printed form
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TicketNumber {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of admission a ticket grants
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TicketType {
    /// Shared allocation admitting up to the table capacity
    Table,
    /// Single admission, carrying the label from the guest list
    Other(String),
}

impl TicketType {
    /// Classifies a guest-list label; only `Table` (surrounding whitespace
    /// ignored) is a table
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if label == "Table" {
            Self::Table
        } else {
            Self::Other(label.to_string())
        }
    }

    /// Label as shown to staff and persisted in check-in records
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Table => "Table",
            Self::Other(label) => label,
        }
    }

    /// Whether this ticket admits a whole table
    #[must_use]
    pub const fn is_table(&self) -> bool {
        matches!(self, Self::Table)
    }
}

impl Default for TicketType {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for TicketType {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<TicketType> for String {
    fn from(ticket_type: TicketType) -> Self {
        match ticket_type {
            TicketType::Table => "Table".to_string(),
            TicketType::Other(label) => label,
        }
    }
}

/// A row of the guest list
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicketRecord {
    /// Name of the ticket holder
    pub donor: String,
    /// Unique ticket number
    pub ticket_number: TicketNumber,
    /// Booking reference
    pub reference: String,
    /// Admission kind
    pub ticket_type: TicketType,
}

impl TicketRecord {
    /// Creates a ticket record
    #[must_use]
    pub fn new(
        donor: impl Into<String>,
        ticket_number: impl Into<String>,
        reference: impl Into<String>,
        ticket_type: TicketType,
    ) -> Self {
        Self {
            donor: donor.into(),
            ticket_number: TicketNumber::new(ticket_number),
            reference: reference.into(),
            ticket_type,
        }
    }
}

// ========== Check-in records ==========

/// A check-in as persisted in the shared document store
///
/// Field names follow the store's camelCase document layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRecord {
    /// Name of the ticket holder
    pub donor: String,
    /// Ticket the check-in belongs to
    pub ticket_number: TicketNumber,
    /// Booking reference
    pub reference: String,
    /// Admission kind
    pub ticket_type: TicketType,
    /// When the first check-in was recorded
    pub check_in_time: DateTime<Utc>,
    /// Seats left on a table ticket
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_guests: Option<u32>,
}

impl CheckInRecord {
    /// Builds the record for a first check-in of `ticket`
    #[must_use]
    pub fn for_ticket(
        ticket: &TicketRecord,
        check_in_time: DateTime<Utc>,
        remaining_guests: Option<u32>,
    ) -> Self {
        Self {
            donor: ticket.donor.clone(),
            ticket_number: ticket.ticket_number.clone(),
            reference: ticket.reference.clone(),
            ticket_type: ticket.ticket_type.clone(),
            check_in_time,
            remaining_guests,
        }
    }
}

// ========== State ==========

/// Search box and result panel
#[derive(Clone, Debug, Default)]
pub struct SearchState {
    /// Current query text
    pub query: String,
    /// Whether the result panel is shown
    pub triggered: bool,
    /// Tickets matched by the last evaluation
    pub results: Vec<TicketRecord>,
    /// Number of filter passes performed
    pub evaluations: u64,
}

impl SearchState {
    /// Whether the result table should be rendered
    #[must_use]
    pub fn shows_results(&self) -> bool {
        self.triggered && !self.results.is_empty()
    }

    /// Whether "no results" should be rendered
    #[must_use]
    pub fn shows_no_results(&self) -> bool {
        self.triggered && self.results.is_empty()
    }
}

/// Check-in progress of a single ticket
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckInStatus {
    /// Nothing recorded yet
    NotCheckedIn,
    /// A store round trip is outstanding
    CheckInInFlight,
    /// Table with some seats used
    PartiallyCheckedIn {
        /// Seats left
        remaining: u32,
    },
    /// Admitted (single ticket) or no seats left (table)
    CheckedIn,
}

impl CheckInStatus {
    /// Whether the check-in control should accept a click
    #[must_use]
    pub const fn is_actionable(self) -> bool {
        matches!(self, Self::NotCheckedIn | Self::PartiallyCheckedIn { .. })
    }
}

/// Local reflection of the shared check-in records
#[derive(Clone, Debug)]
pub struct CheckInState {
    checked_in: HashSet<TicketNumber>,
    remaining_guests: HashMap<TicketNumber, u32>,
    loading: HashSet<TicketNumber>,
    /// Scan in which each ticket was last written by this desk
    written: HashMap<TicketNumber, u64>,
    scans: u64,
    ready: bool,
    table_capacity: u32,
}

impl CheckInState {
    /// Creates an empty reflection for tables of `table_capacity` seats
    #[must_use]
    pub fn new(table_capacity: u32) -> Self {
        Self {
            checked_in: HashSet::new(),
            remaining_guests: HashMap::new(),
            loading: HashSet::new(),
            written: HashMap::new(),
            scans: 0,
            ready: false,
            table_capacity,
        }
    }

    /// Seats on a fresh table
    #[must_use]
    pub const fn table_capacity(&self) -> u32 {
        self.table_capacity
    }

    /// Whether the initial scan of the store has completed
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether the ticket is fully checked in
    #[must_use]
    pub fn is_checked_in(&self, ticket_number: &str) -> bool {
        self.checked_in.contains(ticket_number)
    }

    /// Whether a store round trip is outstanding for the ticket
    #[must_use]
    pub fn is_loading(&self, ticket_number: &str) -> bool {
        self.loading.contains(ticket_number)
    }

    /// Remaining seats as last seen in the store, if any record exists
    #[must_use]
    pub fn remaining_guests(&self, ticket_number: &str) -> Option<u32> {
        self.remaining_guests.get(ticket_number).copied()
    }

    /// Remaining seats of a table, a full table when nothing is recorded
    #[must_use]
    pub fn remaining_for_table(&self, ticket_number: &str) -> u32 {
        self.remaining_guests(ticket_number)
            .unwrap_or(self.table_capacity)
    }

    /// Number of tickets with a round trip outstanding
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.loading.len()
    }

    /// Number of fully checked-in tickets
    #[must_use]
    pub fn checked_in_count(&self) -> usize {
        self.checked_in.len()
    }

    /// Status shown for `ticket`
    #[must_use]
    pub fn status(&self, ticket: &TicketRecord) -> CheckInStatus {
        let number = ticket.ticket_number.as_str();
        if self.is_loading(number) {
            return CheckInStatus::CheckInInFlight;
        }

        if ticket.ticket_type.is_table() {
            match self.remaining_for_table(number) {
                0 => CheckInStatus::CheckedIn,
                remaining if remaining < self.table_capacity => {
                    CheckInStatus::PartiallyCheckedIn { remaining }
                },
                _ if self.is_checked_in(number) => CheckInStatus::CheckedIn,
                _ => CheckInStatus::NotCheckedIn,
            }
        } else if self.is_checked_in(number) {
            CheckInStatus::CheckedIn
        } else {
            CheckInStatus::NotCheckedIn
        }
    }

    pub(crate) fn mark_loading(&mut self, ticket_number: TicketNumber) {
        self.loading.insert(ticket_number);
    }

    pub(crate) fn clear_loading(&mut self, ticket_number: &str) {
        self.loading.remove(ticket_number);
    }

    /// Starts a full scan and returns its number
    pub(crate) fn begin_scan(&mut self) -> u64 {
        self.scans += 1;
        self.scans
    }

    /// Rebuilds the reflection from full scan number `scan`
    ///
    /// Whether a ticket is a table comes from the guest list; the stored
    /// type is only used for tickets missing from it. Tickets with a round
    /// trip outstanding, or written by this desk after the scan started,
    /// keep their local values. When several records exist for one table,
    /// the lowest remaining count wins.
    pub(crate) fn rebuild(&mut self, records: &[CheckInRecord], tickets: &[TicketRecord], scan: u64) {
        let tables: HashMap<&str, bool> = tickets
            .iter()
            .map(|ticket| (ticket.ticket_number.as_str(), ticket.ticket_type.is_table()))
            .collect();

        let kept: Vec<(TicketNumber, bool, Option<u32>)> = self
            .loading
            .iter()
            .chain(
                self.written
                    .iter()
                    .filter(|(_, written)| **written >= scan)
                    .map(|(number, _)| number),
            )
            .map(|number| {
                (
                    number.clone(),
                    self.checked_in.contains(number),
                    self.remaining_guests.get(number).copied(),
                )
            })
            .collect();

        self.checked_in.clear();
        self.remaining_guests.clear();

        for record in records {
            let number = &record.ticket_number;
            if kept.iter().any(|(kept, ..)| kept == number) {
                continue;
            }

            let is_table = tables
                .get(number.as_str())
                .copied()
                .unwrap_or_else(|| record.ticket_type.is_table());
            if is_table {
                let remaining = record
                    .remaining_guests
                    .unwrap_or(self.table_capacity)
                    .min(self.table_capacity);
                let remaining = *self
                    .remaining_guests
                    .entry(number.clone())
                    .and_modify(|seen| *seen = (*seen).min(remaining))
                    .or_insert(remaining);
                if remaining == 0 {
                    self.checked_in.insert(number.clone());
                }
            } else {
                self.checked_in.insert(number.clone());
            }
        }

        for (number, checked_in, remaining) in kept {
            if checked_in {
                self.checked_in.insert(number.clone());
            }
            if let Some(remaining) = remaining {
                self.remaining_guests.insert(number, remaining);
            }
        }

        self.ready = true;
    }

    /// Applies a successful write
    ///
    /// `Some(n)` is the new remaining count of a table, `None` a single
    /// admission.
    pub(crate) fn record(&mut self, ticket_number: &TicketNumber, remaining_guests: Option<u32>) {
        self.written.insert(ticket_number.clone(), self.scans);
        match remaining_guests {
            Some(remaining) => {
                let remaining = remaining.min(self.table_capacity);
                self.remaining_guests
                    .insert(ticket_number.clone(), remaining);
                if remaining == 0 {
                    self.checked_in.insert(ticket_number.clone());
                }
            },
            None => {
                self.checked_in.insert(ticket_number.clone());
            },
        }
    }
}

/// Message shown to staff once
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// A check-in was written to the store
    CheckedIn {
        /// Ticket checked in
        ticket_number: TicketNumber,
        /// Seats left, for tables
        remaining_guests: Option<u32>,
    },
    /// A check-in or load did not go through
    Rejected(CheckInError),
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CheckedIn {
                ticket_number,
                remaining_guests: Some(remaining),
            } => write!(f, "Checked in {ticket_number}: {remaining} guests remaining"),
            Self::CheckedIn { ticket_number, .. } => write!(f, "Checked in {ticket_number}"),
            Self::Rejected(error) => write!(f, "{error}"),
        }
    }
}

/// Application state of the desk
#[derive(Clone, Debug)]
pub struct DeskState {
    /// The guest list, loaded once
    pub tickets: Vec<TicketRecord>,
    /// Search box and result panel
    pub search: SearchState,
    /// Reflection of the shared check-in records
    pub check_ins: CheckInState,
    /// Notices not yet shown
    pub notices: Vec<Notice>,
}

impl DeskState {
    /// Creates the state for a guest list
    #[must_use]
    pub fn new(tickets: Vec<TicketRecord>, settings: &DeskSettings) -> Self {
        Self {
            tickets,
            search: SearchState::default(),
            check_ins: CheckInState::new(settings.table_capacity),
            notices: Vec::new(),
        }
    }

    /// Looks up a ticket by number
    #[must_use]
    pub fn ticket(&self, ticket_number: &str) -> Option<&TicketRecord> {
        self.tickets
            .iter()
            .find(|ticket| ticket.ticket_number.as_str() == ticket_number)
    }

    /// Status shown for `ticket`
    #[must_use]
    pub fn status(&self, ticket: &TicketRecord) -> CheckInStatus {
        self.check_ins.status(ticket)
    }
}

// ========== Actions ==========

/// Every input to the desk reducer
#[derive(Clone, Debug)]
pub enum DeskAction {
    // Search
    /// The search box text changed
    QueryChanged {
        /// New text
        query: String,
    },
    /// Search button pressed
    SearchSubmitted,
    /// Clear button pressed
    SearchCleared,
    /// Quiet period after the last query change elapsed
    SearchDebounced,

    // Check-in
    /// Pull all check-in records from the store
    LoadCheckIns,
    /// Full scan of the store completed
    CheckInsLoaded {
        /// Scan number handed out when the scan started
        scan: u64,
        /// Every record in the collection
        records: Vec<CheckInRecord>,
    },
    /// Full scan of the store failed
    CheckInsLoadFailed {
        /// Why
        error: CheckInError,
    },
    /// Check-in control clicked for a ticket
    CheckInRequested {
        /// Ticket to check in
        ticket: TicketRecord,
    },
    /// A check-in was written
    CheckInRecorded {
        /// Ticket checked in
        ticket_number: TicketNumber,
        /// New remaining count for tables
        remaining_guests: Option<u32>,
    },
    /// A record already existed for a single-admission ticket
    CheckInSkipped {
        /// Ticket already checked in
        ticket_number: TicketNumber,
    },
    /// A check-in round trip failed
    CheckInFailed {
        /// Ticket whose check-in failed
        ticket_number: TicketNumber,
        /// Why
        error: CheckInError,
    },

    // Front end
    /// Pending notices were shown
    NoticesDismissed,
}
