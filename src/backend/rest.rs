//! PostgREST Backend
//!
//! Talks to a Supabase-style REST endpoint (`<project>/rest/v1/<table>`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT};
use serde::Deserialize;
use tracing::debug;

use super::{DataBackend, Filter, Query, Row};
use crate::config::BackendConfig;
use crate::error::{BackendError, BackendResult, KanbanError, Result, NO_ROWS_CODE};

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const RETURN_REPRESENTATION: &str = "return=representation";

/// Error body returned by PostgREST
#[derive(Debug, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    message: String,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RestBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl RestBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        if config.anon_key.trim().is_empty() {
            return Err(KanbanError::config("anon_key must not be empty"));
        }
        reqwest::Url::parse(&config.rest_url())
            .map_err(|e| KanbanError::config(format!("invalid url '{}': {}", config.url, e)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| KanbanError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.rest_url(),
            api_key: config.anon_key.clone(),
            access_token: config.access_token.clone(),
        })
    }

    /// Authenticate subsequent requests as a signed-in user
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn request(&self, method: reqwest::Method, table: &str) -> reqwest::RequestBuilder {
        let token = self.access_token.as_deref().unwrap_or(&self.api_key);
        self.http
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(token)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> BackendResult<reqwest::Response> {
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match serde_json::from_str::<PostgrestError>(&body) {
            Ok(error) => fault_from(error),
            Err(_) => BackendError::fault(format!("request failed ({}): {}", status, body)),
        })
    }
}

fn fault_from(error: PostgrestError) -> BackendError {
    debug!(code = ?error.code, details = ?error.details, hint = ?error.hint, "postgrest fault");
    BackendError::Fault {
        code: error.code,
        message: error.message,
    }
}

fn id_filter(id: &str) -> [(String, String); 1] {
    [("id".to_string(), format!("eq.{}", id))]
}

/// Encode a query as PostgREST query-string pairs
fn query_pairs(query: &Query) -> Vec<(String, String)> {
    let mut pairs = vec![("select".to_string(), "*".to_string())];

    for filter in &query.filters {
        match filter {
            Filter::Eq { column, value } => pairs.push((column.clone(), format!("eq.{}", value))),
            Filter::In { column, values } => {
                let quoted: Vec<String> = values
                    .iter()
                    .map(|v| format!("\"{}\"", v.replace('"', "\\\"")))
                    .collect();
                pairs.push((column.clone(), format!("in.({})", quoted.join(","))));
            }
        }
    }

    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        pairs.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }

    pairs
}

#[async_trait]
impl DataBackend for RestBackend {
    async fn select(&self, table: &str, query: &Query) -> BackendResult<Vec<Row>> {
        debug!(table, ?query, "select");
        let request = self
            .request(reqwest::Method::GET, table)
            .query(&query_pairs(query));
        let response = self.send(request).await?;
        Ok(response.json::<Vec<Row>>().await?)
    }

    async fn select_single(&self, table: &str, id: &str) -> BackendResult<Row> {
        debug!(table, id, "select single");
        let request = self
            .request(reqwest::Method::GET, table)
            .query(&[("select", "*")])
            .query(&id_filter(id))
            .header(ACCEPT, HeaderValue::from_static(SINGLE_OBJECT));

        match self.send(request).await {
            Ok(response) => Ok(response.json::<Row>().await?),
            Err(BackendError::Fault { code, .. }) if code.as_deref() == Some(NO_ROWS_CODE) => {
                Err(BackendError::not_found(table))
            }
            Err(e) => Err(e),
        }
    }

    async fn insert(&self, table: &str, row: Row) -> BackendResult<Row> {
        debug!(table, "insert");
        let request = self
            .request(reqwest::Method::POST, table)
            .query(&[("select", "*")])
            .header("Prefer", RETURN_REPRESENTATION)
            .header(ACCEPT, HeaderValue::from_static(SINGLE_OBJECT))
            .json(&row);
        let response = self.send(request).await?;
        Ok(response.json::<Row>().await?)
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> BackendResult<Row> {
        debug!(table, id, "update");
        let request = self
            .request(reqwest::Method::PATCH, table)
            .query(&[("select", "*")])
            .query(&id_filter(id))
            .header("Prefer", RETURN_REPRESENTATION)
            .header(ACCEPT, HeaderValue::from_static(SINGLE_OBJECT))
            .json(&patch);
        let response = self.send(request).await?;
        Ok(response.json::<Row>().await?)
    }

    async fn delete(&self, table: &str, id: &str) -> BackendResult<()> {
        debug!(table, id, "delete");
        let request = self
            .request(reqwest::Method::DELETE, table)
            .query(&id_filter(id));
        self.send(request).await?;
        Ok(())
    }
}
