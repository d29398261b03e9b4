//! Plain-text rendering of the result panel.

use crate::types::{CheckInStatus, DeskState, TicketRecord};
use std::fmt::Write as _;

const HEADERS: [&str; 6] = ["#", "Donor", "Ticket Number", "Reference", "Ticket Type", "Status"];

/// Glyph of the check-in control for a status
#[must_use]
pub const fn glyph(status: CheckInStatus) -> &'static str {
    match status {
        CheckInStatus::NotCheckedIn | CheckInStatus::PartiallyCheckedIn { .. } => "[+]",
        CheckInStatus::CheckInInFlight => "[…]",
        CheckInStatus::CheckedIn => "[✓]",
    }
}

/// Status column text
#[must_use]
pub fn status_text(status: CheckInStatus, ticket: &TicketRecord, capacity: u32) -> String {
    let label = match status {
        CheckInStatus::NotCheckedIn if ticket.ticket_type.is_table() => {
            format!("{capacity} of {capacity} guests remaining")
        },
        CheckInStatus::NotCheckedIn => "Not checked in".to_string(),
        CheckInStatus::CheckInInFlight => "Checking in".to_string(),
        CheckInStatus::PartiallyCheckedIn { remaining } => {
            format!("{remaining} of {capacity} guests remaining")
        },
        CheckInStatus::CheckedIn => "Checked in".to_string(),
    };
    format!("{} {label}", glyph(status))
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() { "N/A" } else { value }
}

/// Renders the result panel, or an empty string when it is hidden
#[must_use]
pub fn render_results(state: &DeskState) -> String {
    if state.search.shows_no_results() {
        return "No results found.\n".to_string();
    }
    if !state.search.shows_results() {
        return String::new();
    }

    let capacity = state.check_ins.table_capacity();
    let rows: Vec<[String; 6]> = state
        .search
        .results
        .iter()
        .enumerate()
        .map(|(index, ticket)| {
            [
                (index + 1).to_string(),
                or_na(&ticket.donor).to_string(),
                or_na(ticket.ticket_number.as_str()).to_string(),
                or_na(&ticket.reference).to_string(),
                or_na(ticket.ticket_type.label()).to_string(),
                status_text(state.status(ticket), ticket, capacity),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|header| header.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    write_row(&mut out, &HEADERS.map(str::to_string), &widths);
    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    let _ = writeln!(out, "{}", rule.join("-+-"));
    for row in &rows {
        write_row(&mut out, row, &widths);
    }
    let _ = writeln!(out, "{} result(s)", rows.len());
    out
}

fn write_row(out: &mut String, cells: &[String; 6], widths: &[usize; 6]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    let _ = writeln!(out, "{}", padded.join(" | ").trim_end());
}
