//! Thin PostgREST client: filtered select, insert, update and delete over HTTP.
//!
//! Every request carries the project's anon key as `apikey`. The bearer is
//! the signed-in session's access token when an identity provider is
//! attached, otherwise the anon key.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::IdentityProvider;
use crate::config::BackendSettings;
use crate::error::{AppError, AppResult};

/// Media type asking PostgREST for exactly one row (406 otherwise).
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
/// HTTP connect timeout for store calls.
const HTTP_CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Filtered read against one relation.
#[derive(Debug, Clone)]
pub struct Query {
    relation: &'static str,
    select: String,
    filters: Vec<(String, String)>,
    order: Option<String>,
    limit: Option<usize>,
}

impl Query {
    pub fn from(relation: &'static str) -> Self {
        Self {
            relation,
            select: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    /// Column list, embeds included. Whitespace is stripped so multi-line
    /// embed strings can be written readably.
    pub fn select(mut self, columns: &str) -> Self {
        self.select = columns.split_whitespace().collect();
        self
    }

    pub fn eq(mut self, column: &str, value: impl std::fmt::Display) -> Self {
        self.filters
            .push((column.to_string(), format!("eq.{}", value)));
        self
    }

    pub fn is_null(mut self, column: &str) -> Self {
        self.filters.push((column.to_string(), "is.null".to_string()));
        self
    }

    /// Ascending order on a column.
    pub fn order(mut self, column: &str) -> Self {
        self.order = Some(format!("{}.asc", column));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn relation(&self) -> &'static str {
        self.relation
    }

    /// Full URL for a read.
    pub fn read_url(&self, base_url: &str) -> String {
        let mut params = vec![format!("select={}", urlencoding::encode(&self.select))];
        params.extend(self.filter_params());
        if let Some(ref order) = self.order {
            params.push(format!("order={}", urlencoding::encode(order)));
        }
        if let Some(limit) = self.limit {
            params.push(format!("limit={}", limit));
        }
        format!("{}/{}?{}", base_url, self.relation, params.join("&"))
    }

    /// Full URL for an update or delete: filters only.
    pub fn write_url(&self, base_url: &str) -> String {
        let params = self.filter_params();
        if params.is_empty() {
            format!("{}/{}", base_url, self.relation)
        } else {
            format!("{}/{}?{}", base_url, self.relation, params.join("&"))
        }
    }

    fn filter_params(&self) -> Vec<String> {
        self.filters
            .iter()
            .map(|(column, op)| {
                format!(
                    "{}={}",
                    urlencoding::encode(column),
                    urlencoding::encode(op)
                )
            })
            .collect()
    }
}

/// HTTP client for the tabular store.
#[derive(Clone)]
pub struct PostgrestClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
    auth: Option<Arc<dyn IdentityProvider>>,
}

impl PostgrestClient {
    /// Build a client for the project's `/rest/v1` endpoint.
    pub fn new(settings: &BackendSettings) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(settings.http_timeout)
            .build()
            .map_err(|e| AppError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_http(
            http,
            settings.rest_url(),
            settings.anon_key.clone(),
        ))
    }

    pub fn with_http(http: reqwest::Client, base_url: String, anon_key: SecretString) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            auth: None,
        }
    }

    /// Send the signed-in session's bearer instead of the anon key.
    pub fn with_auth(mut self, auth: Arc<dyn IdentityProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        let bearer = self
            .auth
            .as_ref()
            .and_then(|auth| auth.access_token())
            .unwrap_or_else(|| self.anon_key.clone());

        self.http
            .request(method, url)
            .header("apikey", self.anon_key.expose_secret())
            .header(
                "Authorization",
                format!("Bearer {}", bearer.expose_secret()),
            )
    }

    /// Read all rows matching the query.
    pub async fn select<T: DeserializeOwned>(&self, query: &Query) -> AppResult<Vec<T>> {
        let url = query.read_url(&self.base_url);
        debug!(relation = query.relation(), "GET {}", url);

        let resp = self.request(Method::GET, url).send().await?;
        let resp = check(resp, query.relation()).await?;
        resp.json().await.map_err(|e| {
            AppError::Transport(format!(
                "Failed to parse {} rows: {}",
                query.relation(),
                e
            ))
        })
    }

    /// Read exactly one row; zero rows is `NotFound`.
    pub async fn select_single<T: DeserializeOwned>(&self, query: &Query) -> AppResult<T> {
        let url = query.read_url(&self.base_url);
        debug!(relation = query.relation(), "GET (single) {}", url);

        let resp = self
            .request(Method::GET, url)
            .header("Accept", SINGLE_OBJECT)
            .send()
            .await?;
        let resp = check(resp, query.relation()).await?;
        resp.json().await.map_err(|e| {
            AppError::Transport(format!(
                "Failed to parse {} row: {}",
                query.relation(),
                e
            ))
        })
    }

    /// Insert one row.
    pub async fn insert<B: Serialize + ?Sized>(&self, relation: &'static str, body: &B) -> AppResult<()> {
        let url = format!("{}/{}", self.base_url, relation);
        debug!(relation, "POST {}", url);

        let resp = self
            .request(Method::POST, url)
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        check(resp, relation).await.map(|_| ())
    }

    /// Update the rows matching the query's filters.
    pub async fn update<B: Serialize + ?Sized>(&self, query: &Query, body: &B) -> AppResult<()> {
        let url = query.write_url(&self.base_url);
        debug!(relation = query.relation(), "PATCH {}", url);

        let resp = self
            .request(Method::PATCH, url)
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        check(resp, query.relation()).await.map(|_| ())
    }

    /// Delete the rows matching the query's filters.
    pub async fn delete(&self, query: &Query) -> AppResult<()> {
        let url = query.write_url(&self.base_url);
        debug!(relation = query.relation(), "DELETE {}", url);

        let resp = self.request(Method::DELETE, url).send().await?;
        check(resp, query.relation()).await.map(|_| ())
    }
}

/// PostgREST error body.
#[derive(Debug, Default, Deserialize)]
struct PostgrestErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

async fn check(resp: Response, relation: &str) -> AppResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(classify(status.as_u16(), &body, relation))
}

/// Map a failed store response onto the error taxonomy.
pub(crate) fn classify(status: u16, body: &str, relation: &str) -> AppError {
    let parsed: PostgrestErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = match (parsed.message, parsed.details) {
        (Some(m), Some(d)) if !d.is_empty() => format!("{} ({})", m, d),
        (Some(m), _) => m,
        (None, _) if !body.is_empty() => body.to_string(),
        (None, _) => format!("HTTP {}", status),
    };

    match parsed.code.as_deref() {
        Some("23505") => return AppError::Conflict(message),
        Some("PGRST116") => return AppError::NotFound(relation.to_string()),
        Some("42501") => return AppError::Unauthorized(message),
        _ => {}
    }

    match status {
        406 => AppError::NotFound(relation.to_string()),
        401 | 403 => AppError::Unauthorized(message),
        _ => AppError::Remote { status, message },
    }
}
