//! Configuration management for the check-in desk.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Call `dotenvy::dotenv()` first to pick up a local `.env` file.

use crate::documents::{DocumentStore, FirestoreDocumentStore, InMemoryDocumentStore};
use crate::error::ConfigError;
use crate::search::MatchFields;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Seats on a table ticket unless configured otherwise
pub const DEFAULT_TABLE_CAPACITY: u32 = 10;

const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

/// Quiet period before a typed query is evaluated
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS);

/// Upper bound on a single document store call
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS);

/// Collection holding check-in records
pub const DEFAULT_COLLECTION: &str = "checkIns";

const DEFAULT_GUEST_LIST_PATH: &str = "data/eventData.json";
const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const DEFAULT_FIRESTORE_DATABASE: &str = "(default)";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the guest list JSON file
    pub guest_list_path: PathBuf,
    /// Where check-in records are kept
    pub backend: StoreBackend,
    /// Behaviour of the desk itself
    pub desk: DeskSettings,
}

/// Document store backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process memory; check-ins are lost on exit
    Memory,
    /// Firestore over its REST API
    Firestore(FirestoreConfig),
}

/// Firestore connection settings
#[derive(Clone, PartialEq, Eq)]
pub struct FirestoreConfig {
    /// Google Cloud project id
    pub project_id: String,
    /// Database id, `(default)` unless a named database is used
    pub database: String,
    /// REST endpoint, overridable for the emulator
    pub base_url: String,
    /// Web API key sent as `?key=`
    pub api_key: Option<String>,
    /// OAuth bearer token
    pub auth_token: Option<String>,
}

impl std::fmt::Debug for FirestoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreConfig")
            .field("project_id", &self.project_id)
            .field("database", &self.database)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Settings consumed by the desk reducer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeskSettings {
    /// Collection holding check-in records
    pub collection: String,
    /// Seats on a fresh table
    pub table_capacity: u32,
    /// Quiet period before a typed query is evaluated
    pub search_debounce: Duration,
    /// Fields the search looks at
    pub match_fields: MatchFields,
    /// Upper bound on a single document store call
    pub store_timeout: Duration,
}

impl Default for DeskSettings {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            table_capacity: DEFAULT_TABLE_CAPACITY,
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
            match_fields: MatchFields::ALL,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable holds an unusable value or the
    /// Firestore backend is selected without a project id.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("CHECKIN_STORE")
            .unwrap_or_else(|| "memory".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "memory" => StoreBackend::Memory,
            "firestore" => StoreBackend::Firestore(FirestoreConfig {
                project_id: lookup("FIRESTORE_PROJECT_ID")
                    .filter(|id| !id.trim().is_empty())
                    .ok_or(ConfigError::Missing {
                        key: "FIRESTORE_PROJECT_ID",
                        context: "CHECKIN_STORE=firestore",
                    })?,
                database: lookup("FIRESTORE_DATABASE")
                    .unwrap_or_else(|| DEFAULT_FIRESTORE_DATABASE.to_string()),
                base_url: lookup("FIRESTORE_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_FIRESTORE_BASE_URL.to_string()),
                api_key: lookup("FIRESTORE_API_KEY").filter(|key| !key.is_empty()),
                auth_token: lookup("FIRESTORE_AUTH_TOKEN").filter(|token| !token.is_empty()),
            }),
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "CHECKIN_STORE",
                    value: other.to_string(),
                    reason: "expected `memory` or `firestore`".to_string(),
                });
            },
        };

        let table_capacity = parse_or(&lookup, "TABLE_CAPACITY", DEFAULT_TABLE_CAPACITY)?;
        if table_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "TABLE_CAPACITY",
                value: "0".to_string(),
                reason: "a table needs at least one seat".to_string(),
            });
        }

        let desk = DeskSettings {
            collection: lookup("CHECKIN_COLLECTION")
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            table_capacity,
            search_debounce: Duration::from_millis(parse_or(
                &lookup,
                "SEARCH_DEBOUNCE_MS",
                DEFAULT_SEARCH_DEBOUNCE_MS,
            )?),
            match_fields: parse_or(&lookup, "SEARCH_FIELDS", MatchFields::ALL)?,
            store_timeout: Duration::from_secs(parse_or(
                &lookup,
                "STORE_TIMEOUT_SECS",
                DEFAULT_STORE_TIMEOUT_SECS,
            )?),
        };

        Ok(Self {
            guest_list_path: lookup("GUEST_LIST_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_GUEST_LIST_PATH), PathBuf::from),
            backend,
            desk,
        })
    }

    /// Settings for the desk reducer
    #[must_use]
    pub fn settings(&self) -> DeskSettings {
        self.desk.clone()
    }

    /// Builds the configured document store
    #[must_use]
    pub fn document_store(&self) -> Arc<dyn DocumentStore> {
        match &self.backend {
            StoreBackend::Memory => Arc::new(InMemoryDocumentStore::new()),
            StoreBackend::Firestore(firestore) => {
                Arc::new(FirestoreDocumentStore::new(firestore.clone()))
            },
        }
    }
}

/// Parses `key` when set, `default` otherwise
fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    key,
                    value: value.clone(),
                    reason: e.to_string(),
                })
        },
        _ => Ok(default),
    }
}
