use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{amount, AccountId, Cents};

pub type UtrId = i64;
pub type DetailId = i64;
pub type DocNo = i64;

/// Company/year pair every UTR document is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UtrScope {
    #[serde(rename = "Company_Code")]
    pub company_code: String,
    #[serde(rename = "Year_Code")]
    pub year_code: String,
}

impl UtrScope {
    pub fn new(company_code: impl Into<String>, year_code: impl Into<String>) -> Self {
        Self {
            company_code: company_code.into(),
            year_code: year_code.into(),
        }
    }
}

/// A UTR header: one bank-to-mill fund transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtrHead {
    pub utrid: UtrId,
    /// Sequential within (company, year), assigned at creation
    pub doc_no: DocNo,
    #[serde(rename = "Company_Code")]
    pub company_code: String,
    #[serde(rename = "Year_Code")]
    pub year_code: String,
    pub doc_date: NaiveDate,
    /// Bank account code (credited)
    pub bank_ac: String,
    /// Mill account code (debited)
    pub mill_code: String,
    /// Internal account id resolved from `bank_ac`
    #[serde(rename = "ba")]
    pub bank_accoid: Option<AccountId>,
    /// Internal account id resolved from `mill_code`
    #[serde(rename = "mc")]
    pub mill_accoid: Option<AccountId>,
    #[serde(with = "amount")]
    pub amount: Cents,
    /// Bank's UTR reference number
    pub utr_no: Option<String>,
    pub narration_header: String,
    pub narration_footer: String,
    #[serde(rename = "Created_By")]
    pub created_by: Option<String>,
    #[serde(rename = "Modified_By")]
    pub modified_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl UtrHead {
    pub fn scope(&self) -> UtrScope {
        UtrScope::new(&self.company_code, &self.year_code)
    }

    /// Narration as the ledger sees it: header text followed by footer text.
    pub fn narration(&self) -> String {
        format!("{}{}", self.narration_header, self.narration_footer)
    }

    /// Apply a partial update. Scope and document number never change.
    pub fn apply(&mut self, patch: &UtrHeadPatch) {
        if let Some(doc_date) = patch.doc_date {
            self.doc_date = doc_date;
        }
        if let Some(bank_ac) = &patch.bank_ac {
            self.bank_ac = bank_ac.clone();
        }
        if let Some(mill_code) = &patch.mill_code {
            self.mill_code = mill_code.clone();
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(utr_no) = &patch.utr_no {
            self.utr_no = Some(utr_no.clone());
        }
        if let Some(header) = &patch.narration_header {
            self.narration_header = header.clone();
        }
        if let Some(footer) = &patch.narration_footer {
            self.narration_footer = footer.clone();
        }
        if let Some(modified_by) = &patch.modified_by {
            self.modified_by = Some(modified_by.clone());
        }
    }
}

/// Header fields accepted on create. Anything else in the payload is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUtrHead {
    #[serde(rename = "Company_Code")]
    pub company_code: String,
    #[serde(rename = "Year_Code")]
    pub year_code: String,
    pub doc_date: NaiveDate,
    pub bank_ac: String,
    pub mill_code: String,
    #[serde(default, with = "amount")]
    pub amount: Cents,
    #[serde(default)]
    pub utr_no: Option<String>,
    #[serde(default)]
    pub narration_header: String,
    #[serde(default)]
    pub narration_footer: String,
    #[serde(default, rename = "Created_By")]
    pub created_by: Option<String>,
}

impl NewUtrHead {
    pub fn scope(&self) -> UtrScope {
        UtrScope::new(&self.company_code, &self.year_code)
    }
}

/// Header fields accepted on update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UtrHeadPatch {
    #[serde(default)]
    pub doc_date: Option<NaiveDate>,
    #[serde(default)]
    pub bank_ac: Option<String>,
    #[serde(default)]
    pub mill_code: Option<String>,
    #[serde(default, with = "amount::option")]
    pub amount: Option<Cents>,
    #[serde(default)]
    pub utr_no: Option<String>,
    #[serde(default)]
    pub narration_header: Option<String>,
    #[serde(default)]
    pub narration_footer: Option<String>,
    #[serde(default, rename = "Modified_By")]
    pub modified_by: Option<String>,
}

/// A UTR line. Scope and document number are copied from the header so the
/// table can be queried on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtrDetail {
    pub utrdetailid: DetailId,
    pub utrid: UtrId,
    pub doc_no: DocNo,
    #[serde(rename = "Company_Code")]
    pub company_code: String,
    #[serde(rename = "Year_Code")]
    pub year_code: String,
    #[serde(flatten)]
    pub fields: DetailFields,
}

/// Line-level fields a client may set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailFields {
    #[serde(default, rename = "Detail_Id")]
    pub line_no: Option<i64>,
    #[serde(default)]
    pub lot_no: Option<String>,
    #[serde(default)]
    pub grade_no: Option<String>,
    #[serde(default, with = "amount")]
    pub amount: Cents,
    #[serde(default, with = "amount")]
    pub adjusted_amount: Cents,
    #[serde(default)]
    pub narration: Option<String>,
}

/// Partial update of one line, addressed by its id.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DetailPatch {
    pub utrdetailid: DetailId,
    #[serde(default, rename = "Detail_Id")]
    pub line_no: Option<i64>,
    #[serde(default)]
    pub lot_no: Option<String>,
    #[serde(default)]
    pub grade_no: Option<String>,
    #[serde(default, with = "amount::option")]
    pub amount: Option<Cents>,
    #[serde(default, with = "amount::option")]
    pub adjusted_amount: Option<Cents>,
    #[serde(default)]
    pub narration: Option<String>,
}

impl DetailPatch {
    pub fn is_empty(&self) -> bool {
        self.line_no.is_none()
            && self.lot_no.is_none()
            && self.grade_no.is_none()
            && self.amount.is_none()
            && self.adjusted_amount.is_none()
            && self.narration.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetailRef {
    pub utrdetailid: DetailId,
}

/// One entry of `detail_data`, dispatched on its `rowaction` tag.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "rowaction", rename_all = "lowercase")]
pub enum DetailAction {
    Add(DetailFields),
    Update(DetailPatch),
    Delete(DetailRef),
}

impl DetailAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailAction::Add(_) => "add",
            DetailAction::Update(_) => "update",
            DetailAction::Delete(_) => "delete",
        }
    }
}

/// Body of insert requests.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUtrPayload {
    pub head_data: NewUtrHead,
    #[serde(default)]
    pub detail_data: Vec<DetailAction>,
}

/// Body of update requests.
#[derive(Debug, Clone, Deserialize)]
pub struct UtrUpdatePayload {
    #[serde(default)]
    pub head_data: UtrHeadPatch,
    #[serde(default)]
    pub detail_data: Vec<DetailAction>,
}

/// Display names joined from the account master.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UtrLabels {
    #[serde(rename = "bankAcName")]
    pub bank_ac_name: Option<String>,
    #[serde(rename = "millName")]
    pub mill_name: Option<String>,
}

/// A header with its labels and lines, as returned by every read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtrRecord {
    pub head: UtrHead,
    pub labels: UtrLabels,
    pub details: Vec<UtrDetail>,
}
