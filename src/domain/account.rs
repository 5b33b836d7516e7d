use serde::{Deserialize, Serialize};

pub type AccountId = i64;

/// An entry of the account master: the chart of accounts the ledger posts
/// against. Codes are unique per company; `accoid` is the internal id the
/// ledger service keys entries by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub accoid: AccountId,
    #[serde(rename = "Ac_Code")]
    pub ac_code: String,
    #[serde(rename = "Company_Code")]
    pub company_code: String,
    #[serde(rename = "Ac_Name_E")]
    pub name: String,
}

/// Account to be registered; `accoid` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub ac_code: String,
    pub company_code: String,
    pub name: String,
}

impl NewAccount {
    pub fn new(
        ac_code: impl Into<String>,
        company_code: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            ac_code: ac_code.into(),
            company_code: company_code.into(),
            name: name.into(),
        }
    }
}
