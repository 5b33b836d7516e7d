use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{GLedger, GLedgerError, LedgerResponse};
use crate::domain::{LedgerEntry, LedgerKey};

/// Ledger service endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GLedgerConfig {
    /// Base URL, e.g. `http://localhost:8080/api/sugarian`.
    pub base_url: String,
    /// Path appended to `base_url` for posting entries.
    pub create_path: String,
    /// Path appended to `base_url` for removing entries.
    pub delete_path: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GLedgerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/sugarian".to_string(),
            create_path: "/create-Record-gLedger".to_string(),
            delete_path: "/delete-Record-gLedger".to_string(),
            timeout_secs: 30,
        }
    }
}

impl GLedgerConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// [`GLedger`] over HTTP.
pub struct HttpGLedger {
    client: Client,
    config: GLedgerConfig,
}

impl HttpGLedger {
    pub fn new(config: GLedgerConfig) -> Result<Self, GLedgerError> {
        if config.base_url.trim().is_empty() {
            return Err(GLedgerError::Config(
                "gLedger base URL not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Read the body as JSON, falling back to the raw text as a JSON string.
    async fn into_ledger_response(response: Response) -> Result<LedgerResponse, GLedgerError> {
        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text))
        };
        Ok(LedgerResponse { status, body })
    }
}

#[async_trait]
impl GLedger for HttpGLedger {
    async fn create_record(
        &self,
        key: &LedgerKey,
        entries: &[LedgerEntry],
    ) -> Result<LedgerResponse, GLedgerError> {
        let url = self.config.url(&self.config.create_path);
        let response = self
            .client
            .post(&url)
            .query(key)
            .json(entries)
            .send()
            .await?;

        let response = Self::into_ledger_response(response).await?;
        if response.is_success() {
            debug!(
                url = %url,
                doc_no = key.doc_no,
                entry_count = entries.len(),
                "gLedger entries posted"
            );
        } else {
            warn!(
                url = %url,
                doc_no = key.doc_no,
                status = response.status,
                "gLedger rejected entries"
            );
        }
        Ok(response)
    }

    async fn delete_record(&self, key: &LedgerKey) -> Result<LedgerResponse, GLedgerError> {
        let url = self.config.url(&self.config.delete_path);
        let response = self.client.delete(&url).query(key).send().await?;

        let response = Self::into_ledger_response(response).await?;
        debug!(url = %url, doc_no = key.doc_no, status = response.status, "gLedger delete answered");
        Ok(response)
    }
}
