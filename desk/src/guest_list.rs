//! Loading the static guest list.
//!
//! The list is a JSON array exported from the ticketing spreadsheet:
//!
//! ```json
//! [
//!   { "Donor": "Amina Yusuf", "Ticket Number": "T001", "Reference": "R-100", "Ticket Type": "Table" }
//! ]
//! ```
//!
//! Cells may be strings, numbers, or missing; missing cells become empty
//! strings.

use crate::error::GuestListError;
use crate::types::{TicketNumber, TicketRecord, TicketType};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::path::Path;

#[derive(Deserialize)]
struct GuestRow {
    #[serde(rename = "Donor", default, deserialize_with = "cell")]
    donor: String,
    #[serde(rename = "Ticket Number", default, deserialize_with = "cell")]
    ticket_number: String,
    #[serde(rename = "Reference", default, deserialize_with = "cell")]
    reference: String,
    #[serde(rename = "Ticket Type", default, deserialize_with = "cell")]
    ticket_type: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Cell {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
    Empty(()),
}

fn cell<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Cell::deserialize(deserializer)? {
        Cell::Text(text) => text,
        Cell::Integer(number) => number.to_string(),
        Cell::Float(number) => number.to_string(),
        Cell::Flag(flag) => flag.to_string(),
        Cell::Empty(()) => String::new(),
    })
}

/// Reads and validates the guest list at `path`
///
/// # Errors
///
/// Returns [`GuestListError`] if the file cannot be read, is not a JSON array
/// of rows, or breaks ticket-number uniqueness.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<TicketRecord>, GuestListError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|source| GuestListError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let tickets = parse(&json)?;
    tracing::info!(path = %path.display(), tickets = tickets.len(), "Loaded guest list");
    Ok(tickets)
}

/// Parses a guest list from JSON text
///
/// # Errors
///
/// Returns [`GuestListError`] on malformed JSON, a row without a ticket
/// number, or a repeated ticket number.
pub fn parse(json: &str) -> Result<Vec<TicketRecord>, GuestListError> {
    let rows: Vec<GuestRow> = serde_json::from_str(json)?;
    let mut seen = HashSet::with_capacity(rows.len());

    rows.into_iter()
        .enumerate()
        .map(|(row, guest)| {
            let ticket_number = guest.ticket_number.trim();
            if ticket_number.is_empty() {
                return Err(GuestListError::MissingTicketNumber { row });
            }

            let ticket_number = TicketNumber::new(ticket_number);
            if !seen.insert(ticket_number.clone()) {
                return Err(GuestListError::DuplicateTicket { ticket_number });
            }

            Ok(TicketRecord {
                donor: guest.donor,
                ticket_number,
                reference: guest.reference,
                ticket_type: TicketType::from_label(&guest.ticket_type),
            })
        })
        .collect()
}
