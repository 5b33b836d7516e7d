use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::domain::{
    Account, AccountId, DetailFields, DetailId, DetailPatch, DocNo, NewAccount, NewUtrHead,
    UtrDetail, UtrHead, UtrId, UtrLabels, UtrScope,
};

use super::MIGRATION_001_INITIAL;

const DATE_FORMAT: &str = "%Y-%m-%d";

const HEAD_COLUMNS: &str = "utrid, doc_no, company_code, year_code, doc_date, bank_ac, mill_code, ba, mc, amount_cents, utr_no, narration_header, narration_footer, created_by, modified_by, created_at, modified_at";

const DETAIL_COLUMNS: &str = "utrdetailid, utrid, doc_no, company_code, year_code, line_no, lot_no, grade_no, amount_cents, adjusted_amount_cents, narration";

/// How to pick a single header within a company/year scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadLookup {
    /// Exact document number
    DocNo(DocNo),
    /// Lowest document number
    First,
    /// Highest document number
    Last,
    /// Closest document number below the given one
    Previous(DocNo),
    /// Closest document number above the given one
    Next(DocNo),
}

impl HeadLookup {
    fn clause(&self) -> &'static str {
        match self {
            HeadLookup::DocNo(_) => "AND doc_no = ?",
            HeadLookup::First => "ORDER BY doc_no ASC",
            HeadLookup::Last => "ORDER BY doc_no DESC",
            HeadLookup::Previous(_) => "AND doc_no < ? ORDER BY doc_no DESC",
            HeadLookup::Next(_) => "AND doc_no > ? ORDER BY doc_no ASC",
        }
    }

    fn doc_no(&self) -> Option<DocNo> {
        match self {
            HeadLookup::DocNo(n) | HeadLookup::Previous(n) | HeadLookup::Next(n) => Some(*n),
            HeadLookup::First | HeadLookup::Last => None,
        }
    }
}

/// Repository for persisting and querying UTR headers, details and the
/// account master.
///
/// Reads go straight to the pool. Writes take a connection so the caller
/// can group them into one transaction (see [`Repository::begin`]).
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Start a transaction. Dropping it without commit rolls back.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .context("Failed to begin transaction")
    }

    // ========================
    // Account master
    // ========================

    /// Register an account, or rename it if the code is already known.
    pub async fn save_account(&self, account: &NewAccount) -> Result<Account> {
        let row = sqlx::query(
            r#"
            INSERT INTO account_master (ac_code, company_code, ac_name)
            VALUES (?, ?, ?)
            ON CONFLICT (ac_code, company_code) DO UPDATE SET ac_name = excluded.ac_name
            RETURNING accoid
            "#,
        )
        .bind(&account.ac_code)
        .bind(&account.company_code)
        .bind(&account.name)
        .fetch_one(&self.pool)
        .await
        .context("Failed to save account")?;

        Ok(Account {
            accoid: row.get("accoid"),
            ac_code: account.ac_code.clone(),
            company_code: account.company_code.clone(),
            name: account.name.clone(),
        })
    }

    /// List accounts, optionally restricted to one company.
    pub async fn list_accounts(&self, company_code: Option<&str>) -> Result<Vec<Account>> {
        let rows = match company_code {
            Some(company) => {
                sqlx::query(
                    "SELECT accoid, ac_code, company_code, ac_name FROM account_master WHERE company_code = ? ORDER BY ac_code",
                )
                .bind(company)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT accoid, ac_code, company_code, ac_name FROM account_master ORDER BY company_code, ac_code",
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .context("Failed to list accounts")?;

        Ok(rows
            .iter()
            .map(|row| Account {
                accoid: row.get("accoid"),
                ac_code: row.get("ac_code"),
                company_code: row.get("company_code"),
                name: row.get("ac_name"),
            })
            .collect())
    }

    /// Resolve the internal id of an account code within a company.
    pub async fn find_accoid(
        &self,
        conn: &mut SqliteConnection,
        ac_code: &str,
        company_code: &str,
    ) -> Result<Option<AccountId>> {
        let row = sqlx::query(
            "SELECT accoid FROM account_master WHERE ac_code = ? AND company_code = ?",
        )
        .bind(ac_code)
        .bind(company_code)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to look up account")?;

        Ok(row.map(|r| r.get("accoid")))
    }

    // ========================
    // Header reads
    // ========================

    /// Get a header by its id.
    pub async fn get_head(&self, utrid: UtrId) -> Result<Option<UtrHead>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire connection")?;
        self.get_head_in(&mut *conn, utrid).await
    }

    /// Get a header by its id on an existing connection or transaction.
    pub async fn get_head_in(
        &self,
        conn: &mut SqliteConnection,
        utrid: UtrId,
    ) -> Result<Option<UtrHead>> {
        let row = sqlx::query(&format!("SELECT {HEAD_COLUMNS} FROM utr WHERE utrid = ?"))
            .bind(utrid)
            .fetch_optional(&mut *conn)
            .await
            .context("Failed to fetch UTR header")?;

        row.as_ref().map(Self::row_to_head).transpose()
    }

    /// Find one header within a scope.
    pub async fn find_head(&self, scope: &UtrScope, lookup: HeadLookup) -> Result<Option<UtrHead>> {
        let query = format!(
            "SELECT {HEAD_COLUMNS} FROM utr WHERE company_code = ? AND year_code = ? {} LIMIT 1",
            lookup.clause()
        );

        let mut sql_query = sqlx::query(&query)
            .bind(&scope.company_code)
            .bind(&scope.year_code);
        if let Some(doc_no) = lookup.doc_no() {
            sql_query = sql_query.bind(doc_no);
        }

        let row = sql_query
            .fetch_optional(&self.pool)
            .await
            .context("Failed to find UTR header")?;

        row.as_ref().map(Self::row_to_head).transpose()
    }

    /// List all headers within a scope, ordered by document number.
    pub async fn list_heads(&self, scope: &UtrScope) -> Result<Vec<UtrHead>> {
        let rows = sqlx::query(&format!(
            "SELECT {HEAD_COLUMNS} FROM utr WHERE company_code = ? AND year_code = ? ORDER BY doc_no"
        ))
        .bind(&scope.company_code)
        .bind(&scope.year_code)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list UTR headers")?;

        rows.iter().map(Self::row_to_head).collect()
    }

    /// Bank and mill display names for a header. Names only resolve through
    /// the account ids stored on the header.
    pub async fn get_labels(&self, utrid: UtrId) -> Result<UtrLabels> {
        let row = sqlx::query(
            r#"
            SELECT bank.ac_name AS bank_ac_name, mill.ac_name AS mill_name
            FROM utr
            LEFT JOIN account_master AS bank
                ON bank.ac_code = utr.bank_ac AND bank.accoid = utr.ba AND bank.company_code = utr.company_code
            LEFT JOIN account_master AS mill
                ON mill.ac_code = utr.mill_code AND mill.accoid = utr.mc AND mill.company_code = utr.company_code
            WHERE utr.utrid = ?
            "#,
        )
        .bind(utrid)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch UTR labels")?;

        Ok(row
            .map(|row| UtrLabels {
                bank_ac_name: row.get("bank_ac_name"),
                mill_name: row.get("mill_name"),
            })
            .unwrap_or_default())
    }

    /// List the detail lines of a header, ordered by id.
    pub async fn list_details(&self, utrid: UtrId) -> Result<Vec<UtrDetail>> {
        let rows = sqlx::query(&format!(
            "SELECT {DETAIL_COLUMNS} FROM utr_detail WHERE utrid = ? ORDER BY utrdetailid"
        ))
        .bind(utrid)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list UTR details")?;

        Ok(rows.iter().map(Self::row_to_detail).collect())
    }

    // ========================
    // Header writes
    // ========================

    /// Allocate the next document number for a scope.
    ///
    /// The counter row is seeded from the highest stored number, so rows
    /// written before the counter existed are respected. Runs inside the
    /// caller's transaction: a rollback also releases the number.
    pub async fn next_doc_no(&self, conn: &mut SqliteConnection, scope: &UtrScope) -> Result<DocNo> {
        let row = sqlx::query(
            r#"
            INSERT INTO utr_doc_counter (company_code, year_code, value)
            VALUES (
                ?, ?,
                (SELECT COALESCE(MAX(doc_no), 0) + 1 FROM utr WHERE company_code = ? AND year_code = ?)
            )
            ON CONFLICT (company_code, year_code)
            DO UPDATE SET value = MAX(utr_doc_counter.value + 1, excluded.value)
            RETURNING value
            "#,
        )
        .bind(&scope.company_code)
        .bind(&scope.year_code)
        .bind(&scope.company_code)
        .bind(&scope.year_code)
        .fetch_one(&mut *conn)
        .await
        .context("Failed to allocate document number")?;

        Ok(row.get("value"))
    }

    /// Insert a new header under an already allocated document number.
    pub async fn insert_head(
        &self,
        conn: &mut SqliteConnection,
        new_head: &NewUtrHead,
        doc_no: DocNo,
        bank_accoid: Option<AccountId>,
        mill_accoid: Option<AccountId>,
    ) -> Result<UtrHead> {
        let created_at = Utc::now();

        let row = sqlx::query(
            r#"
            INSERT INTO utr (doc_no, company_code, year_code, doc_date, bank_ac, mill_code, ba, mc, amount_cents, utr_no, narration_header, narration_footer, created_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING utrid
            "#,
        )
        .bind(doc_no)
        .bind(&new_head.company_code)
        .bind(&new_head.year_code)
        .bind(new_head.doc_date.format(DATE_FORMAT).to_string())
        .bind(&new_head.bank_ac)
        .bind(&new_head.mill_code)
        .bind(bank_accoid)
        .bind(mill_accoid)
        .bind(new_head.amount)
        .bind(&new_head.utr_no)
        .bind(&new_head.narration_header)
        .bind(&new_head.narration_footer)
        .bind(&new_head.created_by)
        .bind(created_at.to_rfc3339())
        .fetch_one(&mut *conn)
        .await
        .context("Failed to save UTR header")?;

        Ok(UtrHead {
            utrid: row.get("utrid"),
            doc_no,
            company_code: new_head.company_code.clone(),
            year_code: new_head.year_code.clone(),
            doc_date: new_head.doc_date,
            bank_ac: new_head.bank_ac.clone(),
            mill_code: new_head.mill_code.clone(),
            bank_accoid,
            mill_accoid,
            amount: new_head.amount,
            utr_no: new_head.utr_no.clone(),
            narration_header: new_head.narration_header.clone(),
            narration_footer: new_head.narration_footer.clone(),
            created_by: new_head.created_by.clone(),
            modified_by: None,
            created_at,
            modified_at: None,
        })
    }

    /// Write back the mutable columns of a header. Returns rows affected.
    pub async fn update_head(&self, conn: &mut SqliteConnection, head: &UtrHead) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE utr
            SET doc_date = ?, bank_ac = ?, mill_code = ?, ba = ?, mc = ?, amount_cents = ?,
                utr_no = ?, narration_header = ?, narration_footer = ?, modified_by = ?, modified_at = ?
            WHERE utrid = ?
            "#,
        )
        .bind(head.doc_date.format(DATE_FORMAT).to_string())
        .bind(&head.bank_ac)
        .bind(&head.mill_code)
        .bind(head.bank_accoid)
        .bind(head.mill_accoid)
        .bind(head.amount)
        .bind(&head.utr_no)
        .bind(&head.narration_header)
        .bind(&head.narration_footer)
        .bind(&head.modified_by)
        .bind(head.modified_at.map(|dt| dt.to_rfc3339()))
        .bind(head.utrid)
        .execute(&mut *conn)
        .await
        .context("Failed to update UTR header")?;

        Ok(result.rows_affected())
    }

    /// Delete a header only if all four identifying values match.
    pub async fn delete_head_scoped(
        &self,
        conn: &mut SqliteConnection,
        utrid: UtrId,
        scope: &UtrScope,
        doc_no: DocNo,
    ) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM utr WHERE utrid = ? AND company_code = ? AND doc_no = ? AND year_code = ?",
        )
        .bind(utrid)
        .bind(&scope.company_code)
        .bind(doc_no)
        .bind(&scope.year_code)
        .execute(&mut *conn)
        .await
        .context("Failed to delete UTR header")?;

        Ok(result.rows_affected())
    }

    // ========================
    // Detail writes
    // ========================

    /// Insert a detail line under a header, copying its scope and doc_no.
    pub async fn insert_detail(
        &self,
        conn: &mut SqliteConnection,
        head: &UtrHead,
        fields: &DetailFields,
    ) -> Result<UtrDetail> {
        let row = sqlx::query(
            r#"
            INSERT INTO utr_detail (utrid, doc_no, company_code, year_code, line_no, lot_no, grade_no, amount_cents, adjusted_amount_cents, narration)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING utrdetailid
            "#,
        )
        .bind(head.utrid)
        .bind(head.doc_no)
        .bind(&head.company_code)
        .bind(&head.year_code)
        .bind(fields.line_no)
        .bind(&fields.lot_no)
        .bind(&fields.grade_no)
        .bind(fields.amount)
        .bind(fields.adjusted_amount)
        .bind(&fields.narration)
        .fetch_one(&mut *conn)
        .await
        .context("Failed to save UTR detail")?;

        Ok(UtrDetail {
            utrdetailid: row.get("utrdetailid"),
            utrid: head.utrid,
            doc_no: head.doc_no,
            company_code: head.company_code.clone(),
            year_code: head.year_code.clone(),
            fields: fields.clone(),
        })
    }

    /// Apply a partial update to one detail line of a header.
    /// Returns rows affected; an empty patch touches nothing.
    pub async fn update_detail(
        &self,
        conn: &mut SqliteConnection,
        utrid: UtrId,
        patch: &DetailPatch,
    ) -> Result<u64> {
        if patch.is_empty() {
            return Ok(0);
        }

        // Only allow-listed columns are ever named here
        let mut assignments = Vec::new();
        if patch.line_no.is_some() {
            assignments.push("line_no = ?");
        }
        if patch.lot_no.is_some() {
            assignments.push("lot_no = ?");
        }
        if patch.grade_no.is_some() {
            assignments.push("grade_no = ?");
        }
        if patch.amount.is_some() {
            assignments.push("amount_cents = ?");
        }
        if patch.adjusted_amount.is_some() {
            assignments.push("adjusted_amount_cents = ?");
        }
        if patch.narration.is_some() {
            assignments.push("narration = ?");
        }

        let query = format!(
            "UPDATE utr_detail SET {} WHERE utrdetailid = ? AND utrid = ?",
            assignments.join(", ")
        );

        let mut sql_query = sqlx::query(&query);
        if let Some(line_no) = patch.line_no {
            sql_query = sql_query.bind(line_no);
        }
        if let Some(lot_no) = &patch.lot_no {
            sql_query = sql_query.bind(lot_no);
        }
        if let Some(grade_no) = &patch.grade_no {
            sql_query = sql_query.bind(grade_no);
        }
        if let Some(amount) = patch.amount {
            sql_query = sql_query.bind(amount);
        }
        if let Some(adjusted) = patch.adjusted_amount {
            sql_query = sql_query.bind(adjusted);
        }
        if let Some(narration) = &patch.narration {
            sql_query = sql_query.bind(narration);
        }

        let result = sql_query
            .bind(patch.utrdetailid)
            .bind(utrid)
            .execute(&mut *conn)
            .await
            .context("Failed to update UTR detail")?;

        Ok(result.rows_affected())
    }

    /// Delete one detail line of a header. Returns rows affected.
    pub async fn delete_detail(
        &self,
        conn: &mut SqliteConnection,
        utrid: UtrId,
        utrdetailid: DetailId,
    ) -> Result<u64> {
        let result = sqlx::query("DELETE FROM utr_detail WHERE utrdetailid = ? AND utrid = ?")
            .bind(utrdetailid)
            .bind(utrid)
            .execute(&mut *conn)
            .await
            .context("Failed to delete UTR detail")?;

        Ok(result.rows_affected())
    }

    /// Delete all detail lines matching the four identifying values.
    pub async fn delete_details_scoped(
        &self,
        conn: &mut SqliteConnection,
        utrid: UtrId,
        scope: &UtrScope,
        doc_no: DocNo,
    ) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM utr_detail WHERE utrid = ? AND company_code = ? AND doc_no = ? AND year_code = ?",
        )
        .bind(utrid)
        .bind(&scope.company_code)
        .bind(doc_no)
        .bind(&scope.year_code)
        .execute(&mut *conn)
        .await
        .context("Failed to delete UTR details")?;

        Ok(result.rows_affected())
    }

    fn row_to_head(row: &SqliteRow) -> Result<UtrHead> {
        let doc_date_str: String = row.get("doc_date");
        let created_at_str: String = row.get("created_at");
        let modified_at_str: Option<String> = row.get("modified_at");

        Ok(UtrHead {
            utrid: row.get("utrid"),
            doc_no: row.get("doc_no"),
            company_code: row.get("company_code"),
            year_code: row.get("year_code"),
            doc_date: NaiveDate::parse_from_str(&doc_date_str, DATE_FORMAT)
                .context("Invalid doc_date")?,
            bank_ac: row.get("bank_ac"),
            mill_code: row.get("mill_code"),
            bank_accoid: row.get("ba"),
            mill_accoid: row.get("mc"),
            amount: row.get("amount_cents"),
            utr_no: row.get("utr_no"),
            narration_header: row.get("narration_header"),
            narration_footer: row.get("narration_footer"),
            created_by: row.get("created_by"),
            modified_by: row.get("modified_by"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
            modified_at: modified_at_str
                .map(|s| DateTime::parse_from_rfc3339(&s))
                .transpose()
                .context("Invalid modified_at timestamp")?
                .map(|dt| dt.with_timezone(&Utc)),
        })
    }

    fn row_to_detail(row: &SqliteRow) -> UtrDetail {
        UtrDetail {
            utrdetailid: row.get("utrdetailid"),
            utrid: row.get("utrid"),
            doc_no: row.get("doc_no"),
            company_code: row.get("company_code"),
            year_code: row.get("year_code"),
            fields: DetailFields {
                line_no: row.get("line_no"),
                lot_no: row.get("lot_no"),
                grade_no: row.get("grade_no"),
                amount: row.get("amount_cents"),
                adjusted_amount: row.get("adjusted_amount_cents"),
                narration: row.get("narration"),
            },
        }
    }
}
