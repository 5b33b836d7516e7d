use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use sqlx::{Sqlite, Transaction};
use tracing::{debug, info, warn};

use crate::domain::{
    derive_ledger_entries, Account, DetailAction, DetailFields, DetailId, DocNo, LedgerEntry,
    LedgerKey, NewAccount, NewUtrPayload, UtrDetail, UtrHead, UtrId, UtrRecord, UtrScope,
    UtrUpdatePayload,
};
use crate::gledger::GLedger;
use crate::storage::{HeadLookup, Repository};

use super::AppError;

/// Application service for UTR entries.
/// This is the primary interface for any client (HTTP API, CLI, tests).
///
/// Every write runs in a single local transaction that is committed only
/// after the ledger service accepts the matching postings.
#[derive(Clone)]
pub struct UtrService {
    repo: Repository,
    gledger: Arc<dyn GLedger>,
}

/// Result of creating a UTR entry
#[derive(Debug, Clone, Serialize)]
pub struct CreatedUtr {
    pub head: UtrHead,
    pub added_details: Vec<UtrDetail>,
    pub ledger_entries: Vec<LedgerEntry>,
}

/// Result of updating a UTR entry
#[derive(Debug, Clone, Serialize)]
pub struct UpdatedUtr {
    /// Header rows written (1 on success)
    pub head_rows: u64,
    pub head: UtrHead,
    pub created_details: Vec<UtrDetail>,
    pub updated_details: Vec<DetailId>,
    pub deleted_detail_ids: Vec<DetailId>,
    pub ledger_entries: Vec<LedgerEntry>,
}

/// Result of deleting a UTR entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeletedUtr {
    pub head_rows: u64,
    pub detail_rows: u64,
    /// Whether the ledger postings were removed as well. Only attempted when
    /// both the header and at least one detail row matched.
    pub ledger_synced: bool,
}

/// Outcome of applying a `detail_data` list to a header.
#[derive(Debug, Default)]
struct DetailChanges {
    created: Vec<UtrDetail>,
    updated: Vec<DetailId>,
    deleted: Vec<DetailId>,
}

impl UtrService {
    /// Create a new service with the given repository and ledger client.
    pub fn new(repo: Repository, gledger: Arc<dyn GLedger>) -> Self {
        Self { repo, gledger }
    }

    /// Connect to a database and run migrations.
    pub async fn init(database_url: &str, gledger: Arc<dyn GLedger>) -> Result<Self, AppError> {
        let repo = Repository::init(database_url).await?;
        Ok(Self::new(repo, gledger))
    }

    // ========================
    // Account master
    // ========================

    /// Register (or rename) an account in the account master.
    pub async fn register_account(&self, account: NewAccount) -> Result<Account, AppError> {
        if account.ac_code.trim().is_empty() || account.company_code.trim().is_empty() {
            return Err(AppError::InvalidPayload(
                "account code and company code are required".to_string(),
            ));
        }
        Ok(self.repo.save_account(&account).await?)
    }

    pub async fn list_accounts(&self, company_code: Option<&str>) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_accounts(company_code).await?)
    }

    // ========================
    // Reads and navigation
    // ========================

    /// All entries of a company/year, ordered by document number.
    pub async fn list_utrs(&self, scope: &UtrScope) -> Result<Vec<UtrRecord>, AppError> {
        let heads = self.repo.list_heads(scope).await?;
        if heads.is_empty() {
            return Err(AppError::not_found("No records found"));
        }

        let mut records = Vec::with_capacity(heads.len());
        for head in heads {
            records.push(self.load_record(head).await?);
        }
        Ok(records)
    }

    /// Fetch an entry by document number.
    pub async fn get_by_doc_no(&self, scope: &UtrScope, doc_no: DocNo) -> Result<UtrRecord, AppError> {
        self.navigate(scope, HeadLookup::DocNo(doc_no)).await
    }

    /// Fetch an entry by its header id.
    pub async fn get_by_id(&self, utrid: UtrId) -> Result<UtrRecord, AppError> {
        let head = self
            .repo
            .get_head(utrid)
            .await?
            .ok_or_else(|| AppError::not_found(format!("No UTR record with utrid {utrid}")))?;
        self.load_record(head).await
    }

    /// Fetch the first, last, previous or next entry within a scope.
    pub async fn navigate(&self, scope: &UtrScope, lookup: HeadLookup) -> Result<UtrRecord, AppError> {
        let head = self.repo.find_head(scope, lookup).await?.ok_or_else(|| {
            AppError::not_found(match lookup {
                HeadLookup::DocNo(_) => "No records found",
                HeadLookup::First | HeadLookup::Last => "No records found in UTR table",
                HeadLookup::Previous(_) => "No previous records found",
                HeadLookup::Next(_) => "No next records found",
            })
        })?;
        self.load_record(head).await
    }

    async fn load_record(&self, head: UtrHead) -> Result<UtrRecord, AppError> {
        let labels = self.repo.get_labels(head.utrid).await?;
        let details = self.repo.list_details(head.utrid).await?;
        Ok(UtrRecord {
            head,
            labels,
            details,
        })
    }

    // ========================
    // Writes
    // ========================

    /// Create a header with its detail lines and post it to the ledger.
    pub async fn create_utr(&self, payload: NewUtrPayload) -> Result<CreatedUtr, AppError> {
        let NewUtrPayload {
            head_data,
            detail_data,
        } = payload;

        let additions: Vec<DetailFields> = detail_data
            .into_iter()
            .map(|action| match action {
                DetailAction::Add(fields) => Ok(fields),
                other => Err(AppError::InvalidPayload(format!(
                    "rowaction '{}' is not allowed when inserting",
                    other.as_str()
                ))),
            })
            .collect::<Result<_, _>>()?;

        let scope = head_data.scope();
        let mut tx = self.repo.begin().await?;

        let doc_no = self.repo.next_doc_no(&mut *tx, &scope).await?;
        debug!(doc_no, company = %scope.company_code, year = %scope.year_code, "Document number allocated");
        let bank_accoid = self
            .repo
            .find_accoid(&mut *tx, &head_data.bank_ac, &scope.company_code)
            .await?;
        let mill_accoid = self
            .repo
            .find_accoid(&mut *tx, &head_data.mill_code, &scope.company_code)
            .await?;

        let head = self
            .repo
            .insert_head(&mut *tx, &head_data, doc_no, bank_accoid, mill_accoid)
            .await?;

        let mut added_details = Vec::with_capacity(additions.len());
        for fields in &additions {
            added_details.push(self.repo.insert_detail(&mut *tx, &head, fields).await?);
        }

        let ledger_entries = derive_ledger_entries(&head);
        self.post_and_commit(tx, &LedgerKey::for_head(&head), &ledger_entries)
            .await?;

        info!(
            utrid = head.utrid,
            doc_no = head.doc_no,
            company = %head.company_code,
            year = %head.year_code,
            details = added_details.len(),
            "UTR entry created"
        );

        Ok(CreatedUtr {
            head,
            added_details,
            ledger_entries,
        })
    }

    /// Patch a header, apply detail add/update/delete actions and re-post
    /// the entry to the ledger.
    pub async fn update_utr(
        &self,
        utrid: UtrId,
        payload: UtrUpdatePayload,
    ) -> Result<UpdatedUtr, AppError> {
        let mut tx = self.repo.begin().await?;

        let mut head = self
            .repo
            .get_head_in(&mut *tx, utrid)
            .await?
            .ok_or_else(|| AppError::not_found(format!("No UTR record with utrid {utrid}")))?;

        head.apply(&payload.head_data);
        head.bank_accoid = self
            .repo
            .find_accoid(&mut *tx, &head.bank_ac, &head.company_code)
            .await?;
        head.mill_accoid = self
            .repo
            .find_accoid(&mut *tx, &head.mill_code, &head.company_code)
            .await?;
        head.modified_at = Some(Utc::now());

        let head_rows = self.repo.update_head(&mut *tx, &head).await?;
        let changes = self
            .apply_detail_actions(&mut tx, &head, payload.detail_data)
            .await?;

        let ledger_entries = derive_ledger_entries(&head);
        self.post_and_commit(tx, &LedgerKey::for_head(&head), &ledger_entries)
            .await?;

        info!(
            utrid,
            doc_no = head.doc_no,
            added = changes.created.len(),
            updated = changes.updated.len(),
            deleted = changes.deleted.len(),
            "UTR entry updated"
        );

        Ok(UpdatedUtr {
            head_rows,
            head,
            created_details: changes.created,
            updated_details: changes.updated,
            deleted_detail_ids: changes.deleted,
            ledger_entries,
        })
    }

    /// Delete a header and its details, then remove its ledger postings.
    ///
    /// All four identifying values must match. The ledger is only asked to
    /// delete when both the header and at least one detail were removed;
    /// otherwise the local deletion is committed on its own.
    pub async fn delete_utr(
        &self,
        utrid: UtrId,
        scope: &UtrScope,
        doc_no: DocNo,
    ) -> Result<DeletedUtr, AppError> {
        let mut tx = self.repo.begin().await?;

        let detail_rows = self
            .repo
            .delete_details_scoped(&mut *tx, utrid, scope, doc_no)
            .await?;
        let head_rows = self
            .repo
            .delete_head_scoped(&mut *tx, utrid, scope, doc_no)
            .await?;

        let ledger_synced = detail_rows > 0 && head_rows > 0;
        if ledger_synced {
            let key = LedgerKey::utr(&scope.company_code, doc_no, &scope.year_code);
            let response = match self.gledger.delete_record(&key).await {
                Ok(response) => response,
                Err(err) => {
                    warn!(utrid, doc_no, error = %err, "gLedger delete failed, rolling back");
                    tx.rollback().await?;
                    return Err(err.into());
                }
            };
            if !response.is_deleted() {
                warn!(utrid, doc_no, status = response.status, "gLedger delete rejected, rolling back");
                tx.rollback().await?;
                return Err(AppError::LedgerDeleteRejected {
                    status: response.status,
                    details: response.body,
                });
            }
        } else {
            info!(
                utrid,
                doc_no, head_rows, detail_rows, "Partial or empty delete, gLedger left untouched"
            );
        }

        tx.commit().await?;

        Ok(DeletedUtr {
            head_rows,
            detail_rows,
            ledger_synced,
        })
    }

    async fn apply_detail_actions(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        head: &UtrHead,
        actions: Vec<DetailAction>,
    ) -> Result<DetailChanges, AppError> {
        let mut changes = DetailChanges::default();

        for action in actions {
            match action {
                DetailAction::Add(fields) => {
                    changes
                        .created
                        .push(self.repo.insert_detail(&mut **tx, head, &fields).await?);
                }
                DetailAction::Update(patch) => {
                    if self.repo.update_detail(&mut **tx, head.utrid, &patch).await? > 0 {
                        changes.updated.push(patch.utrdetailid);
                    }
                }
                DetailAction::Delete(target) => {
                    // Unknown ids are a no-op
                    if self
                        .repo
                        .delete_detail(&mut **tx, head.utrid, target.utrdetailid)
                        .await?
                        > 0
                    {
                        changes.deleted.push(target.utrdetailid);
                    }
                }
            }
        }

        Ok(changes)
    }

    /// Send postings to the ledger; commit on success, roll back otherwise.
    async fn post_and_commit(
        &self,
        tx: Transaction<'static, Sqlite>,
        key: &LedgerKey,
        entries: &[LedgerEntry],
    ) -> Result<(), AppError> {
        let response = match self.gledger.create_record(key, entries).await {
            Ok(response) => response,
            Err(err) => {
                warn!(doc_no = key.doc_no, error = %err, "gLedger unreachable, rolling back");
                tx.rollback().await?;
                return Err(err.into());
            }
        };

        if !response.is_success() {
            warn!(
                doc_no = key.doc_no,
                status = response.status,
                "gLedger rejected postings, rolling back"
            );
            tx.rollback().await?;
            return Err(AppError::LedgerRejected {
                status: response.status,
                details: response.body,
            });
        }

        tx.commit().await?;
        Ok(())
    }
}
