//! Zendesk REST API gateway.
//!
//! # Security Note
//!
//! The API token is held in a `SecretBox` and only exposed while building the
//! basic-auth header of an outgoing request. Do not enable `reqwest` debug
//! logging in production; request headers may still be printed there.

use std::time::Duration;

use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretBox};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::Config;
use crate::error::{Result, TetherError};
use crate::link::RecordId;

use super::{Record, RecordGateway, SearchPage, UpdateAck};

/// Zendesk gateway authenticated with an agent email and API token
pub struct ZendeskGateway {
    client: Client,
    base_url: Url,
    email: String,
    api_token: SecretBox<String>,
    linked_field_id: u64,
}

impl ZendeskGateway {
    /// Create a gateway from configuration
    ///
    /// Configures the HTTP client with a 30s connect timeout and 60s total timeout.
    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = config.base_url().ok_or_else(|| {
            TetherError::Config(
                "Zendesk base URL not configured. Set ZENDESK_BASE_URL or run: tether config set zendesk.base_url <url>".to_string(),
            )
        })?;
        let email = config.email().ok_or_else(|| {
            TetherError::Auth(
                "Zendesk email not configured. Set ZENDESK_EMAIL or run: tether config set zendesk.email <email>".to_string(),
            )
        })?;
        let api_token = config.api_token().ok_or_else(|| {
            TetherError::Auth(
                "Zendesk API token not configured. Set ZENDESK_API_TOKEN or run: tether config set zendesk.api_token <token>".to_string(),
            )
        })?;
        let linked_field_id = config.linked_field_id()?;

        Self::new(&base_url, &email, &api_token, linked_field_id)
    }

    pub fn new(
        base_url: &str,
        email: &str,
        api_token: &str,
        linked_field_id: u64,
    ) -> Result<Self> {
        let mut base_url = Url::parse(base_url).map_err(|e| {
            TetherError::Config(format!("invalid Zendesk base URL '{base_url}': {e}"))
        })?;
        // Endpoint paths are relative, so the base must end in '/' to keep any
        // path prefix it carries.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url,
            email: email.to_string(),
            api_token: SecretBox::new(Box::new(api_token.to_string())),
            linked_field_id,
        })
    }

    pub fn linked_field_id(&self) -> u64 {
        self.linked_field_id
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| TetherError::Config(format!("invalid endpoint '{path}': {e}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!(%method, path = url.path(), "zendesk request");
        self.client
            .request(method, url)
            .basic_auth(
                format!("{}/token", self.email),
                Some(self.api_token.expose_secret()),
            )
            .header(ACCEPT, "application/json")
    }

    /// Send a request and decode a successful JSON body. `subject` is the
    /// record a 404 refers to, when there is exactly one.
    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        subject: Option<RecordId>,
    ) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();

        Err(status_error(status, retry_after, &body, subject))
    }
}

#[derive(Deserialize)]
struct TicketEnvelope {
    ticket: Record,
}

#[derive(Deserialize)]
struct TicketsEnvelope {
    #[serde(default)]
    tickets: Vec<Record>,
}

/// Request bodies, kept separate so their exact shape is testable.
pub(crate) mod payload {
    use serde::Serialize;

    use crate::link::RecordId;

    #[derive(Serialize)]
    pub struct FieldValue<'a> {
        pub id: u64,
        pub value: &'a str,
    }

    #[derive(Serialize)]
    pub struct TicketFields<'a> {
        pub id: RecordId,
        pub custom_fields: [FieldValue<'a>; 1],
    }

    #[derive(Serialize)]
    pub struct UpdateMany<'a> {
        pub tickets: [TicketFields<'a>; 2],
    }

    #[derive(Serialize)]
    pub struct FieldsOnly<'a> {
        pub custom_fields: [FieldValue<'a>; 1],
    }

    #[derive(Serialize)]
    pub struct Comment<'a> {
        pub body: &'a str,
        pub public: bool,
    }

    #[derive(Serialize)]
    pub struct CommentOnly<'a> {
        pub comment: Comment<'a>,
    }

    #[derive(Serialize)]
    pub struct TicketUpdate<T: Serialize> {
        pub ticket: T,
    }

    pub fn pair_update<'a>(
        field_id: u64,
        source_id: RecordId,
        source_value: &'a str,
        target_id: RecordId,
        target_value: &'a str,
    ) -> UpdateMany<'a> {
        UpdateMany {
            tickets: [
                TicketFields {
                    id: source_id,
                    custom_fields: [FieldValue {
                        id: field_id,
                        value: source_value,
                    }],
                },
                TicketFields {
                    id: target_id,
                    custom_fields: [FieldValue {
                        id: field_id,
                        value: target_value,
                    }],
                },
            ],
        }
    }

    pub fn single_update(field_id: u64, value: &str) -> TicketUpdate<FieldsOnly<'_>> {
        TicketUpdate {
            ticket: FieldsOnly {
                custom_fields: [FieldValue {
                    id: field_id,
                    value,
                }],
            },
        }
    }

    /// Audit comments are always internal.
    pub fn internal_comment(body: &str) -> TicketUpdate<CommentOnly<'_>> {
        TicketUpdate {
            ticket: CommentOnly {
                comment: Comment {
                    body,
                    public: false,
                },
            },
        }
    }
}

/// Map a non-success response to an error.
fn status_error(
    status: StatusCode,
    retry_after: Option<u64>,
    body: &str,
    subject: Option<RecordId>,
) -> TetherError {
    if status == StatusCode::NOT_FOUND
        && let Some(id) = subject
    {
        return TetherError::RecordNotFound(id);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return TetherError::RateLimited(retry_after.unwrap_or(60));
    }

    let message = error_message(body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return TetherError::Auth(format!("Zendesk rejected credentials: {message}"));
    }

    TetherError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Pull a readable message out of a Zendesk error body. Zendesk uses both
/// `{"error": "...", "description": "..."}` and
/// `{"error": {"title": "...", "message": "..."}}`.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    if let Some(description) = value.get("description").and_then(|v| v.as_str()) {
        return Some(description.to_string());
    }
    match value.get("error") {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(obj @ serde_json::Value::Object(_)) => obj
            .get("message")
            .or_else(|| obj.get("title"))
            .and_then(|v| v.as_str())
            .map(str::to_string),
        _ => None,
    }
}

/// Most ids `show_many.json` accepts in one request
const SHOW_MANY_LIMIT: usize = 100;

fn join_ids(ids: &[RecordId]) -> String {
    ids.iter()
        .map(RecordId::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// `ids` query values for `show_many.json`, one per request
fn id_batches(ids: &[RecordId]) -> Vec<String> {
    ids.chunks(SHOW_MANY_LIMIT).map(join_ids).collect()
}

impl RecordGateway for ZendeskGateway {
    async fn fetch_record(&self, id: RecordId) -> Result<Record> {
        let url = self.endpoint(&format!("api/v2/tickets/{id}.json"), &[])?;
        let envelope: TicketEnvelope = self.send(self.request(Method::GET, url), Some(id)).await?;
        Ok(envelope.ticket)
    }

    async fn fetch_records_by_ids(&self, ids: &[RecordId]) -> Result<Vec<Record>> {
        let mut records = Vec::with_capacity(ids.len());
        for batch in id_batches(ids) {
            let url = self.endpoint("api/v2/tickets/show_many.json", &[("ids", batch.as_str())])?;
            let envelope: TicketsEnvelope =
                self.send(self.request(Method::GET, url), None).await?;
            records.extend(envelope.tickets);
        }
        Ok(records)
    }

    async fn search_by_text(&self, query: &str) -> Result<SearchPage> {
        let query = format!("type:ticket {query}");
        let url = self.endpoint("api/v2/search.json", &[("query", query.as_str())])?;
        self.send(self.request(Method::GET, url), None).await
    }

    async fn search_by_text_paged(&self, query: &str, page_size: u32) -> Result<SearchPage> {
        let size = page_size.to_string();
        let url = self.endpoint(
            "api/v2/search/export.json",
            &[
                ("query", query),
                ("page[size]", size.as_str()),
                ("filter[type]", "ticket"),
            ],
        )?;
        self.send(self.request(Method::GET, url), None).await
    }

    async fn update_link_fields_for_pair(
        &self,
        source_id: RecordId,
        source_value: &str,
        target_id: RecordId,
        target_value: &str,
    ) -> Result<UpdateAck> {
        let url = self.endpoint("api/v2/tickets/update_many.json", &[])?;
        let body = payload::pair_update(
            self.linked_field_id,
            source_id,
            source_value,
            target_id,
            target_value,
        );
        self.send(self.request(Method::PUT, url).json(&body), None)
            .await
    }

    async fn update_link_field(&self, id: RecordId, value: &str) -> Result<UpdateAck> {
        let url = self.endpoint(&format!("api/v2/tickets/{id}.json"), &[])?;
        let body = payload::single_update(self.linked_field_id, value);
        self.send(self.request(Method::PUT, url).json(&body), Some(id))
            .await
    }

    async fn append_audit_comment(&self, id: RecordId, text: &str) -> Result<UpdateAck> {
        let url = self.endpoint(&format!("api/v2/tickets/{id}.json"), &[])?;
        let body = payload::internal_comment(text);
        self.send(self.request(Method::PUT, url).json(&body), Some(id))
            .await
    }
}
