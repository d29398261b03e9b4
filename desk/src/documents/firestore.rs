//! Firestore REST adapter.
//!
//! Talks to the Firestore v1 REST API:
//!
//! - `GET    {root}/{collection}` (paged) for a full scan
//! - `POST   {root}:runQuery` with an `EQUAL` field filter
//! - `POST   {root}/{collection}` to create a document
//! - `PATCH  {document}?updateMask.fieldPaths=...` for partial updates
//!
//! where `{root}` is `projects/{project}/databases/{database}/documents`.
//! Records are encoded as typed Firestore values (`stringValue`,
//! `integerValue`, `timestampValue`).

use super::{CheckInPatch, DocumentStore, RecordHandle, StoreError, StoreFuture, StoredCheckIn};
use crate::config::FirestoreConfig;
use crate::types::{CheckInRecord, TicketNumber, TicketType};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

const PAGE_SIZE: &str = "300";

/// Firestore document as returned by the REST API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
    #[serde(default)]
    create_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// One element of the `runQuery` response stream
#[derive(Debug, Deserialize)]
struct RunQueryResponse {
    #[serde(default)]
    document: Option<Document>,
}

/// Check-in records stored in a Firestore collection
#[derive(Clone, Debug)]
pub struct FirestoreDocumentStore {
    client: Client,
    config: FirestoreConfig,
}

impl FirestoreDocumentStore {
    /// Creates an adapter with a default HTTP client
    #[must_use]
    pub fn new(config: FirestoreConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Creates an adapter sharing an existing HTTP client
    #[must_use]
    pub const fn with_client(client: Client, config: FirestoreConfig) -> Self {
        Self { client, config }
    }

    fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents",
            self.config.base_url.trim_end_matches('/'),
            self.config.project_id,
            self.config.database
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut builder = self.client.request(method, url);
        if let Some(key) = &self.config.api_key {
            builder = builder.query(&[("key", key)]);
        }
        if let Some(token) = &self.config.auth_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn execute(builder: RequestBuilder) -> Result<Response, StoreError> {
        let response = builder
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::NotFound(body))
            },
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::Api {
                    status: status.as_u16(),
                    message: body,
                })
            },
        }
    }

    async fn fetch<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, StoreError> {
        Self::execute(builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn list_pages(&self, collection: &str) -> Result<Vec<StoredCheckIn>, StoreError> {
        let url = format!("{}/{collection}", self.documents_root());
        let mut stored = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut builder = self
                .request(Method::GET, &url)
                .query(&[("pageSize", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                builder = builder.query(&[("pageToken", token)]);
            }

            let page: ListDocumentsResponse = Self::fetch(builder).await?;
            stored.extend(page.documents.into_iter().filter_map(decode_or_skip));

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!(collection, documents = stored.len(), "Listed Firestore documents");
        Ok(stored)
    }

    async fn run_query(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<StoredCheckIn>, StoreError> {
        let url = format!("{}:runQuery", self.documents_root());
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field },
                        "op": "EQUAL",
                        "value": { "stringValue": value }
                    }
                }
            }
        });

        let responses: Vec<RunQueryResponse> =
            Self::fetch(self.request(Method::POST, &url).json(&body)).await?;

        Ok(responses
            .into_iter()
            .filter_map(|response| response.document)
            .filter_map(decode_or_skip)
            .collect())
    }

    async fn create(
        &self,
        collection: &str,
        record: &CheckInRecord,
    ) -> Result<RecordHandle, StoreError> {
        let url = format!("{}/{collection}", self.documents_root());
        let body = json!({ "fields": encode_record(record) });

        let document: Document = Self::fetch(self.request(Method::POST, &url).json(&body)).await?;
        tracing::debug!(document = %document.name, "Created Firestore document");
        Ok(RecordHandle::new(document.name))
    }

    async fn patch(&self, handle: &RecordHandle, patch: &CheckInPatch) -> Result<(), StoreError> {
        let url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            handle.as_str()
        );
        let mut builder = self
            .request(Method::PATCH, &url)
            .query(&[("currentDocument.exists", "true")]);
        for path in patch.field_paths() {
            builder = builder.query(&[("updateMask.fieldPaths", path)]);
        }

        Self::execute(builder.json(&json!({ "fields": encode_patch(patch) }))).await?;
        Ok(())
    }
}

impl DocumentStore for FirestoreDocumentStore {
    fn list_all<'a>(&'a self, collection: &'a str) -> StoreFuture<'a, Vec<StoredCheckIn>> {
        Box::pin(self.list_pages(collection))
    }

    fn find_where<'a>(
        &'a self,
        collection: &'a str,
        field: &'a str,
        value: &'a str,
    ) -> StoreFuture<'a, Vec<StoredCheckIn>> {
        Box::pin(self.run_query(collection, field, value))
    }

    fn insert<'a>(
        &'a self,
        collection: &'a str,
        record: CheckInRecord,
    ) -> StoreFuture<'a, RecordHandle> {
        Box::pin(async move { self.create(collection, &record).await })
    }

    fn update<'a>(&'a self, handle: &'a RecordHandle, patch: CheckInPatch) -> StoreFuture<'a, ()> {
        Box::pin(async move { self.patch(handle, &patch).await })
    }
}

// ========== Value encoding ==========

fn string_value(value: &str) -> Value {
    json!({ "stringValue": value })
}

fn integer_value(value: u32) -> Value {
    // Firestore carries 64-bit integers as JSON strings
    json!({ "integerValue": value.to_string() })
}

fn encode_record(record: &CheckInRecord) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("donor".into(), string_value(&record.donor));
    fields.insert(
        "ticketNumber".into(),
        string_value(record.ticket_number.as_str()),
    );
    fields.insert("reference".into(), string_value(&record.reference));
    fields.insert("ticketType".into(), string_value(record.ticket_type.label()));
    fields.insert(
        "checkInTime".into(),
        json!({
            "timestampValue": record.check_in_time.to_rfc3339_opts(SecondsFormat::Millis, true)
        }),
    );
    if let Some(remaining) = record.remaining_guests {
        fields.insert("remainingGuests".into(), integer_value(remaining));
    }
    fields
}

fn encode_patch(patch: &CheckInPatch) -> Map<String, Value> {
    let mut fields = Map::new();
    if let Some(remaining) = patch.remaining_guests {
        fields.insert("remainingGuests".into(), integer_value(remaining));
    }
    fields
}

// ========== Value decoding ==========

/// Text of a string or integer field
fn text_field<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    let value = fields.get(name)?;
    value
        .get("stringValue")
        .or_else(|| value.get("integerValue"))
        .and_then(Value::as_str)
}

/// Non-negative count from an integer or double field, clamped to `u32`
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Clamped first
fn count_field(fields: &Map<String, Value>, name: &str) -> Result<Option<u32>, StoreError> {
    let Some(value) = fields.get(name) else {
        return Ok(None);
    };

    if let Some(integer) = value.get("integerValue") {
        let parsed = match integer {
            Value::String(text) => text.parse::<i64>().ok(),
            other => other.as_i64(),
        }
        .ok_or_else(|| StoreError::Decode(format!("{name} is not an integer")))?;
        return Ok(Some(u32::try_from(parsed.max(0)).unwrap_or(u32::MAX)));
    }

    if let Some(double) = value.get("doubleValue").and_then(Value::as_f64) {
        return Ok(Some(double.clamp(0.0, f64::from(u32::MAX)) as u32));
    }

    if value.get("nullValue").is_some() {
        return Ok(None);
    }

    Err(StoreError::Decode(format!("{name} has an unsupported type")))
}

fn timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

fn decode(document: Document) -> Result<StoredCheckIn, StoreError> {
    let fields = &document.fields;

    let ticket_number = text_field(fields, "ticketNumber")
        .ok_or_else(|| StoreError::Decode(format!("{} has no ticketNumber", document.name)))?;

    let check_in_time = fields
        .get("checkInTime")
        .and_then(|value| value.get("timestampValue"))
        .and_then(Value::as_str)
        .and_then(timestamp)
        .or_else(|| document.create_time.as_deref().and_then(timestamp))
        .ok_or_else(|| StoreError::Decode(format!("{} has no checkInTime", document.name)))?;

    let record = CheckInRecord {
        donor: text_field(fields, "donor").unwrap_or_default().to_string(),
        ticket_number: TicketNumber::new(ticket_number),
        reference: text_field(fields, "reference")
            .unwrap_or_default()
            .to_string(),
        ticket_type: TicketType::from_label(text_field(fields, "ticketType").unwrap_or_default()),
        check_in_time,
        remaining_guests: count_field(fields, "remainingGuests")?,
    };

    Ok(StoredCheckIn {
        handle: RecordHandle::new(document.name),
        record,
    })
}

/// Decodes a document, logging and dropping one that is not a check-in
fn decode_or_skip(document: Document) -> Option<StoredCheckIn> {
    let name = document.name.clone();
    match decode(document) {
        Ok(stored) => Some(stored),
        Err(error) => {
            tracing::warn!(document = %name, %error, "Skipping undecodable check-in document");
            None
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use crate::types::TicketRecord;

    fn document(fields: Value) -> Document {
        serde_json::from_value(json!({
            "name": "projects/demo/databases/(default)/documents/checkIns/abc",
            "fields": fields,
            "createTime": "2025-01-01T09:00:00.000000Z"
        }))
        .unwrap()
    }

    #[test]
    fn encodes_typed_values() {
        let ticket = TicketRecord::new("Amina Yusuf", "T001", "R-100", TicketType::Table);
        let time = timestamp("2025-01-01T18:30:00Z").unwrap();
        let fields = encode_record(&CheckInRecord::for_ticket(&ticket, time, Some(9)));

        assert_eq!(fields["donor"], json!({ "stringValue": "Amina Yusuf" }));
        assert_eq!(fields["ticketType"], json!({ "stringValue": "Table" }));
        assert_eq!(fields["remainingGuests"], json!({ "integerValue": "9" }));
        assert_eq!(
            fields["checkInTime"],
            json!({ "timestampValue": "2025-01-01T18:30:00.000Z" })
        );
    }

    #[test]
    fn decodes_documents() {
        let stored = decode(document(json!({
            "donor": { "stringValue": "Amina Yusuf" },
            "ticketNumber": { "stringValue": "T001" },
            "reference": { "stringValue": "R-100" },
            "ticketType": { "stringValue": "Table" },
            "checkInTime": { "timestampValue": "2025-01-01T18:30:00Z" },
            "remainingGuests": { "integerValue": "4" }
        })))
        .unwrap();

        assert!(stored.handle.as_str().ends_with("/checkIns/abc"));
        assert_eq!(stored.record.ticket_type, TicketType::Table);
        assert_eq!(stored.record.remaining_guests, Some(4));
    }

    #[test]
    fn decoding_tolerates_loose_documents() {
        let stored = decode(document(json!({
            "ticketNumber": { "integerValue": "1234" },
            "remainingGuests": { "doubleValue": -2.0 }
        })))
        .unwrap();

        assert_eq!(stored.record.ticket_number.as_str(), "1234");
        assert_eq!(stored.record.donor, "");
        assert_eq!(stored.record.remaining_guests, Some(0));
        assert_eq!(
            stored.record.check_in_time,
            timestamp("2025-01-01T09:00:00Z").unwrap()
        );
    }

    #[test]
    fn decoding_requires_ticket_number() {
        let result = decode(document(json!({ "donor": { "stringValue": "A" } })));
        assert!(matches!(result, Err(StoreError::Decode(_))));
    }

    #[test]
    fn documents_root_includes_database() {
        let store = FirestoreDocumentStore::new(FirestoreConfig {
            project_id: "demo".into(),
            database: "(default)".into(),
            base_url: "http://localhost:8080/v1/".into(),
            api_key: None,
            auth_token: None,
        });

        assert_eq!(
            store.documents_root(),
            "http://localhost:8080/v1/projects/demo/databases/(default)/documents"
        );
    }
}
