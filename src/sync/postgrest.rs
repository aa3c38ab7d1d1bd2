use super::remote::{Filter, RecordStore, RemoteError};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use std::sync::RwLock;
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Record store backed by a PostgREST endpoint (`{base}/rest/v1/{table}`).
///
/// Row-level security scopes rows to the signed-in user; the anon key is used
/// as the bearer token until an access token is set.
pub struct PostgrestStore {
    client: Client,
    base_url: String,
    api_key: String,
    access_token: RwLock<Option<String>>,
}

impl PostgrestStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            access_token: RwLock::new(None),
        })
    }

    /// Use a signed-in user's JWT for subsequent requests (`None` reverts to the anon key).
    pub fn set_access_token(&self, token: Option<String>) {
        if let Ok(mut current) = self.access_token.write() {
            *current = token;
        }
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let bearer = self
            .access_token
            .read()
            .ok()
            .and_then(|token| token.clone())
            .unwrap_or_else(|| self.api_key.clone());

        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    async fn check(response: Response) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(RemoteError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn single_row(response: Response, action: &str) -> Result<Value, RemoteError> {
        let rows: Vec<Value> = Self::check(response).await?.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RemoteError::rejected(format!("{} returned no rows", action)))
    }
}

#[async_trait]
impl RecordStore for PostgrestStore {
    async fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Value>, RemoteError> {
        let response = self
            .request(Method::GET, table)
            .query(&[
                ("select", "*".to_string()),
                (filter.column.as_str(), format!("eq.{}", filter.value)),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await?;

        let rows = Self::check(response).await?.json().await?;
        Ok(rows)
    }

    async fn insert(&self, table: &str, record: Value) -> Result<Value, RemoteError> {
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(&record)
            .send()
            .await?;

        Self::single_row(response, "insert").await
    }

    async fn update(&self, table: &str, id: &str, partial: Value) -> Result<Value, RemoteError> {
        let response = self
            .request(Method::PATCH, table)
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(&partial)
            .send()
            .await?;

        Self::single_row(response, "update").await
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), RemoteError> {
        let response = self
            .request(Method::DELETE, table)
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .send()
            .await?;

        Self::single_row(response, "delete").await?;
        Ok(())
    }
}
