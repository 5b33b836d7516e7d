use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{amount, AccountId, Cents, DocNo, UtrHead};

/// Transaction type the ledger files UTR postings under.
pub const UTR_TRAN_TYPE: &str = "UT";

/// Debit/credit flag of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Drcr {
    #[serde(rename = "C")]
    Credit,
    #[serde(rename = "D")]
    Debit,
}

impl Drcr {
    pub fn as_str(&self) -> &'static str {
        match self {
            Drcr::Credit => "C",
            Drcr::Debit => "D",
        }
    }
}

impl std::fmt::Display for Drcr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifies one document's postings in the ledger service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerKey {
    #[serde(rename = "Company_Code")]
    pub company_code: String,
    #[serde(rename = "DOC_NO")]
    pub doc_no: DocNo,
    #[serde(rename = "Year_Code")]
    pub year_code: String,
    #[serde(rename = "TRAN_TYPE")]
    pub tran_type: String,
}

impl LedgerKey {
    pub fn utr(
        company_code: impl Into<String>,
        doc_no: DocNo,
        year_code: impl Into<String>,
    ) -> Self {
        Self {
            company_code: company_code.into(),
            doc_no,
            year_code: year_code.into(),
            tran_type: UTR_TRAN_TYPE.to_string(),
        }
    }

    pub fn for_head(head: &UtrHead) -> Self {
        Self::utr(&head.company_code, head.doc_no, &head.year_code)
    }
}

/// One posting sent to the general-ledger service. Never stored locally.
///
/// Field names follow the ledger service's schema. The zero-valued fields
/// are placeholders that schema reserves for other transaction types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct LedgerEntry {
    pub tran_type: String,
    pub doc_no: DocNo,
    pub doc_date: NaiveDate,
    pub ac_code: String,
    #[serde(with = "amount")]
    pub amount: Cents,
    pub company_code: String,
    pub year_code: String,
    pub order_code: i32,
    pub drcr: Drcr,
    #[serde(rename = "UNIT_Code")]
    pub unit_code: i32,
    pub narration: String,
    pub tender_id: i64,
    pub tender_id_detail: i64,
    pub voucher_id: i64,
    /// Counter-account code
    pub drcr_head: String,
    #[serde(with = "amount")]
    pub adjusted_amount: Cents,
    #[serde(rename = "Branch_Code")]
    pub branch_code: i32,
    pub sort_type: String,
    pub sort_no: DocNo,
    #[serde(rename = "vc")]
    pub vc: i64,
    #[serde(rename = "progid")]
    pub progid: i64,
    #[serde(rename = "tranid")]
    pub tranid: i64,
    #[serde(rename = "saleid")]
    pub saleid: i64,
    /// Internal id of `ac_code`, if the account master knows it
    #[serde(rename = "ac")]
    pub accoid: Option<AccountId>,
}

impl LedgerEntry {
    fn for_head(
        head: &UtrHead,
        drcr: Drcr,
        ac_code: &str,
        accoid: Option<AccountId>,
        counter_head: &str,
    ) -> Self {
        Self {
            tran_type: UTR_TRAN_TYPE.to_string(),
            doc_no: head.doc_no,
            doc_date: head.doc_date,
            ac_code: ac_code.to_string(),
            amount: head.amount,
            company_code: head.company_code.clone(),
            year_code: head.year_code.clone(),
            order_code: 1,
            drcr,
            unit_code: 0,
            narration: head.narration(),
            tender_id: 0,
            tender_id_detail: 0,
            voucher_id: 0,
            drcr_head: counter_head.to_string(),
            adjusted_amount: 0,
            branch_code: 1,
            sort_type: UTR_TRAN_TYPE.to_string(),
            sort_no: head.doc_no,
            vc: 0,
            progid: 0,
            tranid: 0,
            saleid: 0,
            accoid,
        }
    }
}

/// Derive the ledger postings for a UTR header.
///
/// A positive amount yields a credit on the bank account and a debit on the
/// mill account, each naming the other as its counter-head. Anything else
/// yields no postings.
pub fn derive_ledger_entries(head: &UtrHead) -> Vec<LedgerEntry> {
    if head.amount <= 0 {
        return Vec::new();
    }

    vec![
        LedgerEntry::for_head(
            head,
            Drcr::Credit,
            &head.bank_ac,
            head.bank_accoid,
            &head.mill_code,
        ),
        LedgerEntry::for_head(
            head,
            Drcr::Debit,
            &head.mill_code,
            head.mill_accoid,
            &head.bank_ac,
        ),
    ]
}
