//! Guest search.
//!
//! A ticket matches when any enabled field contains the query. Donor names and
//! ticket types match case-insensitively; ticket numbers and references are
//! matched literally.

use crate::types::TicketRecord;
use std::fmt;
use std::str::FromStr;

/// A ticket field the search looks at
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MatchField {
    /// Holder name, case-insensitive
    Donor,
    /// Ticket number, literal
    TicketNumber,
    /// Booking reference, literal
    Reference,
    /// Ticket type label, case-insensitive
    TicketType,
}

impl MatchField {
    /// Name used in configuration
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Donor => "donor",
            Self::TicketNumber => "ticket_number",
            Self::Reference => "reference",
            Self::TicketType => "ticket_type",
        }
    }
}

impl FromStr for MatchField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "donor" => Ok(Self::Donor),
            "ticket_number" | "ticketnumber" => Ok(Self::TicketNumber),
            "reference" => Ok(Self::Reference),
            "ticket_type" | "tickettype" => Ok(Self::TicketType),
            other => Err(format!("unknown search field `{other}`")),
        }
    }
}

/// Set of fields the search looks at
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)] // One flag per searchable field
pub struct MatchFields {
    donor: bool,
    ticket_number: bool,
    reference: bool,
    ticket_type: bool,
}

impl MatchFields {
    /// Every field
    pub const ALL: Self = Self {
        donor: true,
        ticket_number: true,
        reference: true,
        ticket_type: true,
    };

    /// No field; matches nothing
    pub const NONE: Self = Self {
        donor: false,
        ticket_number: false,
        reference: false,
        ticket_type: false,
    };

    /// Adds `field` to the set
    #[must_use]
    pub const fn with(mut self, field: MatchField) -> Self {
        match field {
            MatchField::Donor => self.donor = true,
            MatchField::TicketNumber => self.ticket_number = true,
            MatchField::Reference => self.reference = true,
            MatchField::TicketType => self.ticket_type = true,
        }
        self
    }

    /// Whether `field` is in the set
    #[must_use]
    pub const fn contains(self, field: MatchField) -> bool {
        match field {
            MatchField::Donor => self.donor,
            MatchField::TicketNumber => self.ticket_number,
            MatchField::Reference => self.reference,
            MatchField::TicketType => self.ticket_type,
        }
    }

    /// Whether the set is empty
    #[must_use]
    pub const fn is_empty(self) -> bool {
        !(self.donor || self.ticket_number || self.reference || self.ticket_type)
    }

    fn iter(self) -> impl Iterator<Item = MatchField> {
        [
            MatchField::Donor,
            MatchField::TicketNumber,
            MatchField::Reference,
            MatchField::TicketType,
        ]
        .into_iter()
        .filter(move |field| self.contains(*field))
    }
}

impl Default for MatchFields {
    fn default() -> Self {
        Self::ALL
    }
}

impl FromIterator<MatchField> for MatchFields {
    fn from_iter<I: IntoIterator<Item = MatchField>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, Self::with)
    }
}

/// Parses a comma-separated list such as `donor,ticket_number`
impl FromStr for MatchFields {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse::<MatchField>)
            .collect::<Result<Self, _>>()?;

        if fields.is_empty() {
            return Err("at least one search field is required".to_string());
        }
        Ok(fields)
    }
}

impl fmt::Display for MatchFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.iter().map(MatchField::name).collect();
        f.write_str(&names.join(","))
    }
}

/// Whether `ticket` matches `query` on any of `fields`
///
/// `lowered` is `query` lowercased, passed in so a full scan lowercases the
/// query once.
fn matches(ticket: &TicketRecord, query: &str, lowered: &str, fields: MatchFields) -> bool {
    fields.iter().any(|field| match field {
        MatchField::Donor => ticket.donor.to_lowercase().contains(lowered),
        MatchField::TicketNumber => ticket.ticket_number.as_str().contains(query),
        MatchField::Reference => ticket.reference.contains(query),
        MatchField::TicketType => ticket
            .ticket_type
            .label()
            .to_lowercase()
            .contains(lowered),
    })
}

/// Filters `tickets` down to those matching `query`, in guest-list order
///
/// A blank query matches nothing.
#[must_use]
pub fn search(tickets: &[TicketRecord], query: &str, fields: MatchFields) -> Vec<TicketRecord> {
    if query.trim().is_empty() {
        return Vec::new();
    }

    let lowered = query.to_lowercase();
    tickets
        .iter()
        .filter(|ticket| matches(ticket, query, &lowered, fields))
        .cloned()
        .collect()
}
