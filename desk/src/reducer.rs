//! Reducer logic for the check-in desk.
//!
//! Search actions filter the in-memory guest list; check-in actions guard
//! against double submission, enforce table capacity, and hand the store
//! round trip to an effect whose result action patches the reflection.

use crate::checkin::CheckInContext;
use crate::config::DeskSettings;
use crate::documents::DocumentStore;
use crate::error::CheckInError;
use crate::search::search;
use crate::types::{DeskAction, DeskState, Notice, TicketRecord};
use checkin_desk_core::effect::{Effect, EffectId};
use checkin_desk_core::{async_effect, debounce, environment::Clock, reducer::Reducer, smallvec, SmallVec};
use std::sync::Arc;

/// Key of the pending debounced search evaluation
pub const SEARCH_DEBOUNCE: EffectId = EffectId::from_static("search-debounce");

/// Environment dependencies for the desk reducer
#[derive(Clone)]
pub struct DeskEnvironment {
    /// Shared store holding check-in records
    pub store: Arc<dyn DocumentStore>,
    /// Clock for check-in timestamps
    pub clock: Arc<dyn Clock>,
    /// Capacity, timing, and search settings
    pub settings: DeskSettings,
}

impl DeskEnvironment {
    /// Creates a new `DeskEnvironment`
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, settings: DeskSettings) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }
}

/// Reducer for the check-in desk
#[derive(Clone, Debug, Default)]
pub struct DeskReducer;

impl DeskReducer {
    /// Creates a new `DeskReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Runs the filter over the guest list with the current query
    fn evaluate(state: &mut DeskState, env: &DeskEnvironment) {
        state.search.results = search(
            &state.tickets,
            &state.search.query,
            env.settings.match_fields,
        );
        state.search.triggered = !state.search.query.trim().is_empty();
        state.search.evaluations += 1;

        tracing::debug!(
            query = %state.search.query,
            results = state.search.results.len(),
            "Evaluated search"
        );
    }

    /// Records why a check-in was refused; silent refusals are only traced
    fn reject(state: &mut DeskState, error: CheckInError) -> SmallVec<[Effect<DeskAction>; 4]> {
        if error.is_silent() {
            tracing::debug!(%error, "Ignored check-in request");
        } else {
            tracing::warn!(%error, "Rejected check-in request");
            state.notices.push(Notice::Rejected(error));
        }
        smallvec![Effect::None]
    }

    /// Applies the guards and starts the store round trip
    fn request_check_in(
        state: &mut DeskState,
        ticket: TicketRecord,
        env: &DeskEnvironment,
    ) -> SmallVec<[Effect<DeskAction>; 4]> {
        let ticket_number = ticket.ticket_number.clone();

        if !state.check_ins.is_ready() {
            return Self::reject(state, CheckInError::NotReady);
        }

        if state.check_ins.is_loading(ticket_number.as_str()) {
            return Self::reject(state, CheckInError::InFlight { ticket_number });
        }

        let context = CheckInContext::new(env);

        if ticket.ticket_type.is_table() {
            let remaining = state.check_ins.remaining_for_table(ticket_number.as_str());
            if remaining == 0 {
                return Self::reject(state, CheckInError::CapacityExceeded { ticket_number });
            }

            state.check_ins.mark_loading(ticket_number);
            return smallvec![async_effect! {
                Some(context.check_in_table(ticket, remaining).await)
            }];
        }

        if state.check_ins.is_checked_in(ticket_number.as_str()) {
            return Self::reject(state, CheckInError::AlreadyCheckedIn { ticket_number });
        }

        state.check_ins.mark_loading(ticket_number);
        smallvec![async_effect! {
            Some(context.check_in_single(ticket).await)
        }]
    }
}

impl Reducer for DeskReducer {
    type State = DeskState;
    type Action = DeskAction;
    type Environment = DeskEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Search ==========
            DeskAction::QueryChanged { query } => {
                state.search.query = query;
                state.search.triggered = false;

                if state.search.query.trim().is_empty() {
                    state.search.results.clear();
                    return smallvec![Effect::Cancel(SEARCH_DEBOUNCE)];
                }

                smallvec![debounce! {
                    id: SEARCH_DEBOUNCE,
                    duration: env.settings.search_debounce,
                    action: DeskAction::SearchDebounced
                }]
            },

            DeskAction::SearchDebounced => {
                Self::evaluate(state, env);
                smallvec![Effect::None]
            },

            DeskAction::SearchSubmitted => {
                Self::evaluate(state, env);
                smallvec![Effect::Cancel(SEARCH_DEBOUNCE)]
            },

            DeskAction::SearchCleared => {
                state.search.query.clear();
                state.search.results.clear();
                state.search.triggered = false;
                smallvec![Effect::Cancel(SEARCH_DEBOUNCE)]
            },

            // ========== Check-in ==========
            DeskAction::LoadCheckIns => {
                let scan = state.check_ins.begin_scan();
                let context = CheckInContext::new(env);
                smallvec![async_effect! {
                    Some(context.load(scan).await)
                }]
            },

            DeskAction::CheckInsLoaded { scan, records } => {
                state.check_ins.rebuild(&records, &state.tickets, scan);
                tracing::info!(
                    records = records.len(),
                    checked_in = state.check_ins.checked_in_count(),
                    "Check-in reflection rebuilt"
                );
                smallvec![Effect::None]
            },

            DeskAction::CheckInsLoadFailed { error } => {
                tracing::error!(%error, "Failed to load check-ins");
                state.notices.push(Notice::Rejected(error));
                smallvec![Effect::None]
            },

            DeskAction::CheckInRequested { ticket } => Self::request_check_in(state, ticket, env),

            DeskAction::CheckInRecorded {
                ticket_number,
                remaining_guests,
            } => {
                state.check_ins.clear_loading(ticket_number.as_str());
                state.check_ins.record(&ticket_number, remaining_guests);
                state.notices.push(Notice::CheckedIn {
                    ticket_number,
                    remaining_guests,
                });
                smallvec![Effect::None]
            },

            DeskAction::CheckInSkipped { ticket_number } => {
                state.check_ins.clear_loading(ticket_number.as_str());
                tracing::debug!(%ticket_number, "Ticket already has a check-in record");
                smallvec![Effect::None]
            },

            DeskAction::CheckInFailed {
                ticket_number,
                error,
            } => {
                state.check_ins.clear_loading(ticket_number.as_str());
                tracing::error!(%ticket_number, %error, "Check-in failed");
                state.notices.push(Notice::Rejected(error));
                smallvec![Effect::None]
            },

            // ========== Front end ==========
            DeskAction::NoticesDismissed => {
                state.notices.clear();
                smallvec![Effect::None]
            },
        }
    }
}
