//! Terminal front end of the check-in desk.
//!
//! Reads one UI event per line from stdin and prints the result panel after
//! each one. Check-in results are reported by a background task as they
//! arrive, so input keeps being read while a write is outstanding.
//! Diagnostics go to stderr so they do not interleave with the table; set
//! `RUST_LOG` to tune them.

use checkin_desk::cli::{self, Command};
use checkin_desk::{view, Config, DeskAction, DeskEnvironment, DeskReducer, DeskState, TicketNumber};
use checkin_desk_core::environment::SystemClock;
use checkin_desk_runtime::{Store, StoreError};
use std::io::Write as _;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type DeskStore = Store<DeskState, DeskAction, DeskEnvironment, DeskReducer>;

type AppResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> AppResult {
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "checkin_desk=info,checkin_desk_runtime=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;
    tracing::info!(?config, "Starting check-in desk");

    let tickets = checkin_desk::guest_list::load(&config.guest_list_path)?;
    let settings = config.settings();
    let env = DeskEnvironment::new(
        config.document_store(),
        Arc::new(SystemClock),
        settings.clone(),
    );
    let store = Store::new(DeskState::new(tickets, &settings), DeskReducer::new(), env);

    println!("=== Check-in Desk ===\n");
    println!("{}\n", cli::HELP);

    let reporter = tokio::spawn(report_check_ins(store.clone(), store.subscribe_actions()));

    refresh(&store).await?;
    prompt();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Quit => break,
            Command::Help => println!("{}", cli::HELP),
            Command::Invalid(message) => println!("{message}"),
            Command::Query(query) => {
                // Waits out the debounce, so the panel reflects this query
                store.send(DeskAction::QueryChanged { query }).await?.wait().await;
                render(&store).await?;
            },
            Command::Search => {
                store.send(DeskAction::SearchSubmitted).await?;
                render(&store).await?;
            },
            Command::Clear => {
                store.send(DeskAction::SearchCleared).await?;
                println!("Search cleared.");
            },
            Command::CheckIn(target) => check_in(&store, &target).await?,
            Command::Refresh => refresh(&store).await?,
        }
        prompt();
    }

    store.shutdown(store.default_shutdown_timeout()).await?;
    reporter.abort();
    tracing::info!("Check-in desk stopped");
    Ok(())
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// Prints the result panel and any pending notices, then dismisses them
async fn render(store: &DeskStore) -> AppResult {
    let (panel, notices) = store
        .state(|state| (view::render_results(state), state.notices.clone()))
        .await;

    print!("{panel}");
    for notice in &notices {
        println!("! {notice}");
    }
    if !notices.is_empty() {
        store.send(DeskAction::NoticesDismissed).await?;
    }
    Ok(())
}

async fn refresh(store: &DeskStore) -> AppResult {
    store.send(DeskAction::LoadCheckIns).await?.wait().await;
    let (ready, checked_in) = store
        .state(|state| (state.check_ins.is_ready(), state.check_ins.checked_in_count()))
        .await;
    if ready {
        println!("Check-ins loaded ({checked_in} tickets fully checked in).");
    }
    render(store).await
}

async fn check_in(store: &DeskStore, target: &str) -> AppResult {
    let Some(ticket) = store
        .state(|state| cli::resolve_target(state, target))
        .await
    else {
        println!("No ticket or result row matches {target}");
        return Ok(());
    };

    println!("Checking in {} ({})...", ticket.ticket_number, ticket.donor);
    store.send(DeskAction::CheckInRequested { ticket }).await?;
    render(store).await
}

/// Prints the outcome of each check-in round trip as it lands
async fn report_check_ins(store: DeskStore, mut actions: broadcast::Receiver<DeskAction>) {
    loop {
        let ticket_number = match actions.recv().await {
            Ok(
                DeskAction::CheckInRecorded { ticket_number, .. }
                | DeskAction::CheckInSkipped { ticket_number }
                | DeskAction::CheckInFailed { ticket_number, .. },
            ) => ticket_number,
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Check-in reporter fell behind");
                continue;
            },
            Err(broadcast::error::RecvError::Closed) => break,
        };

        if let Err(error) = report(&store, &ticket_number).await {
            tracing::debug!(%error, "Stopped reporting check-ins");
            break;
        }
    }
}

async fn report(store: &DeskStore, ticket_number: &TicketNumber) -> Result<(), StoreError> {
    let (line, notices) = store
        .state(|state| {
            let line = state.ticket(ticket_number.as_str()).map(|ticket| {
                let capacity = state.check_ins.table_capacity();
                format!(
                    "{} ({}): {}",
                    ticket.ticket_number,
                    ticket.donor,
                    view::status_text(state.status(ticket), ticket, capacity)
                )
            });
            (line, state.notices.clone())
        })
        .await;

    println!();
    if let Some(line) = line {
        println!("{line}");
    }
    for notice in &notices {
        println!("! {notice}");
    }
    if !notices.is_empty() {
        store.send(DeskAction::NoticesDismissed).await?;
    }
    prompt();
    Ok(())
}
