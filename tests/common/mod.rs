// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;
use utr_entry::application::{CreatedUtr, UtrService};
use utr_entry::domain::{LedgerEntry, LedgerKey, NewAccount, NewUtrPayload, UtrScope};
use utr_entry::gledger::{GLedger, GLedgerError, LedgerResponse};

pub const COMPANY: &str = "1";
pub const YEAR: &str = "2024";

pub fn scope() -> UtrScope {
    UtrScope::new(COMPANY, YEAR)
}

/// A call received by [`RecordingLedger`].
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCall {
    Create {
        key: LedgerKey,
        entries: Vec<LedgerEntry>,
    },
    Delete {
        key: LedgerKey,
    },
}

/// In-memory gLedger that records every call and answers with a
/// configurable status.
#[derive(Default)]
pub struct RecordingLedger {
    calls: Mutex<Vec<LedgerCall>>,
    create_status: Mutex<Option<u16>>,
    delete_status: Mutex<Option<u16>>,
    unreachable: Mutex<bool>,
}

impl RecordingLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn creates(&self) -> Vec<(LedgerKey, Vec<LedgerEntry>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                LedgerCall::Create { key, entries } => Some((key, entries)),
                LedgerCall::Delete { .. } => None,
            })
            .collect()
    }

    pub fn deletes(&self) -> Vec<LedgerKey> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                LedgerCall::Delete { key } => Some(key),
                LedgerCall::Create { .. } => None,
            })
            .collect()
    }

    pub fn fail_creates_with(&self, status: u16) {
        *self.create_status.lock().unwrap() = Some(status);
    }

    pub fn fail_deletes_with(&self, status: u16) {
        *self.delete_status.lock().unwrap() = Some(status);
    }

    pub fn go_offline(&self) {
        *self.unreachable.lock().unwrap() = true;
    }

    pub fn recover(&self) {
        *self.create_status.lock().unwrap() = None;
        *self.delete_status.lock().unwrap() = None;
        *self.unreachable.lock().unwrap() = false;
    }

    fn offline_error() -> GLedgerError {
        GLedgerError::Config("ledger offline".to_string())
    }
}

#[async_trait]
impl GLedger for RecordingLedger {
    async fn create_record(
        &self,
        key: &LedgerKey,
        entries: &[LedgerEntry],
    ) -> Result<LedgerResponse, GLedgerError> {
        if *self.unreachable.lock().unwrap() {
            return Err(Self::offline_error());
        }
        self.calls.lock().unwrap().push(LedgerCall::Create {
            key: key.clone(),
            entries: entries.to_vec(),
        });
        let status = self.create_status.lock().unwrap().unwrap_or(201);
        Ok(LedgerResponse::new(status, json!({ "message": "ok" })))
    }

    async fn delete_record(&self, key: &LedgerKey) -> Result<LedgerResponse, GLedgerError> {
        if *self.unreachable.lock().unwrap() {
            return Err(Self::offline_error());
        }
        self.calls
            .lock()
            .unwrap()
            .push(LedgerCall::Delete { key: key.clone() });
        let status = self.delete_status.lock().unwrap().unwrap_or(200);
        Ok(LedgerResponse::new(status, json!({ "message": "deleted" })))
    }
}

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(UtrService, Arc<RecordingLedger>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let ledger = RecordingLedger::new();
    let service = UtrService::init(
        &format!("sqlite:{}?mode=rwc", db_path.display()),
        ledger.clone(),
    )
    .await?;
    Ok((service, ledger, temp_dir))
}

/// Test fixture: bank and mill accounts of the default company
pub struct StandardAccounts;

impl StandardAccounts {
    pub async fn create(service: &UtrService) -> Result<()> {
        service
            .register_account(NewAccount::new("B001", COMPANY, "State Bank"))
            .await?;
        service
            .register_account(NewAccount::new("M001", COMPANY, "Sunrise Sugar Mill"))
            .await?;
        service
            .register_account(NewAccount::new("M002", COMPANY, "Riverside Mill"))
            .await?;
        Ok(())
    }
}

/// Insert body with one header and the given `add` lines.
pub fn insert_body(amount: f64, details: Vec<Value>) -> Value {
    json!({
        "head_data": {
            "Company_Code": COMPANY,
            "Year_Code": YEAR,
            "doc_date": "2024-04-15",
            "bank_ac": "B001",
            "mill_code": "M001",
            "amount": amount,
            "utr_no": "UTR123",
            "narration_header": "Advance ",
            "narration_footer": "April",
            "Created_By": "tester"
        },
        "detail_data": details
    })
}

pub fn add_line(lot_no: &str, amount: f64) -> Value {
    json!({
        "rowaction": "add",
        "Detail_Id": 1,
        "lot_no": lot_no,
        "grade_no": "S30",
        "amount": amount,
        "adjusted_amount": 0
    })
}

pub fn insert_payload(amount: f64, details: Vec<Value>) -> NewUtrPayload {
    serde_json::from_value(insert_body(amount, details)).unwrap()
}

/// Create an entry with a single line of the full amount.
pub async fn create_sample(service: &UtrService, amount: f64) -> Result<CreatedUtr> {
    Ok(service
        .create_utr(insert_payload(amount, vec![add_line("L1", amount)]))
        .await?)
}
