//! General-ledger service client.
//!
//! Every UTR write is mirrored into the remote gLedger service as a set of
//! postings keyed by (company, document number, year, transaction type).
//! The [`GLedger`] trait is the seam the write path depends on; [`HttpGLedger`]
//! is the production implementation.

mod http;

pub use http::{GLedgerConfig, HttpGLedger};

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{LedgerEntry, LedgerKey};

#[derive(Debug, Error)]
pub enum GLedgerError {
    #[error("gLedger request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gLedger configuration error: {0}")]
    Config(String),
}

/// Status and body returned by the ledger service.
///
/// Non-success statuses are not errors at this layer: the caller decides
/// whether a status commits or aborts its transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl LedgerResponse {
    pub fn new(status: u16, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    /// Postings are accepted on any 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// A delete only counts when the ledger answers exactly 200.
    pub fn is_deleted(&self) -> bool {
        self.status == 200
    }
}

#[async_trait]
pub trait GLedger: Send + Sync {
    /// Replace the postings of one document with `entries`.
    async fn create_record(
        &self,
        key: &LedgerKey,
        entries: &[LedgerEntry],
    ) -> Result<LedgerResponse, GLedgerError>;

    /// Remove all postings of one document.
    async fn delete_record(&self, key: &LedgerKey) -> Result<LedgerResponse, GLedgerError>;
}
