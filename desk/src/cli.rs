//! Line-oriented commands of the terminal front end.
//!
//! Each input line is one UI event. Plain text is typed into the search box;
//! lines starting with `/` press a button.

use crate::types::{DeskState, TicketRecord};

/// Help shown by `/help`
pub const HELP: &str = "\
Type to search by donor, ticket number, reference, or ticket type.
  /search               evaluate the current query now
  /clear                clear the query and results
  /checkin <ticket|#>   check in a ticket by number or result row
  /refresh              reload check-ins from the shared store
  /help                 show this help
  /quit                 exit";

/// A parsed input line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// New search box text
    Query(String),
    /// Search button
    Search,
    /// Clear button
    Clear,
    /// Check-in control of a ticket, by number or row
    CheckIn(String),
    /// Reload check-ins
    Refresh,
    /// Show help
    Help,
    /// Exit
    Quit,
    /// Unrecognized or incomplete command
    Invalid(String),
}

impl Command {
    /// Parses one input line
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some(command) = line.trim_start().strip_prefix('/') else {
            return Self::Query(line.to_string());
        };

        let (name, argument) = command
            .split_once(char::is_whitespace)
            .map_or((command, ""), |(name, rest)| (name, rest.trim()));

        match name.to_ascii_lowercase().as_str() {
            "search" | "s" => Self::Search,
            "clear" | "c" => Self::Clear,
            "checkin" | "check-in" | "ci" if !argument.is_empty() => {
                Self::CheckIn(argument.to_string())
            },
            "checkin" | "check-in" | "ci" => {
                Self::Invalid("usage: /checkin <ticket number | row #>".to_string())
            },
            "refresh" | "r" => Self::Refresh,
            "help" | "h" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            other => Self::Invalid(format!("unknown command /{other}, try /help")),
        }
    }
}

/// Finds the ticket a `/checkin` argument refers to
///
/// An exact ticket number wins; otherwise a number selects a row of the
/// visible results (1-based).
#[must_use]
pub fn resolve_target(state: &DeskState, target: &str) -> Option<TicketRecord> {
    if let Some(ticket) = state.ticket(target) {
        return Some(ticket.clone());
    }

    let row = target.trim_start_matches('#').parse::<usize>().ok()?;
    if !state.search.shows_results() {
        return None;
    }
    row.checked_sub(1)
        .and_then(|index| state.search.results.get(index))
        .cloned()
}
