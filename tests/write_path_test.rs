mod common;

use anyhow::Result;
use common::*;
use serde_json::json;
use utr_entry::application::AppError;
use utr_entry::domain::{Drcr, LedgerKey, NewUtrPayload, UtrScope, UtrUpdatePayload};

fn update_payload(body: serde_json::Value) -> UtrUpdatePayload {
    serde_json::from_value(body).unwrap()
}

// ========================
// Create
// ========================

#[tokio::test]
async fn test_create_posts_balanced_entries() -> Result<()> {
    let (service, ledger, _temp) = test_service().await?;
    StandardAccounts::create(&service).await?;
    let accounts = service.list_accounts(Some(COMPANY)).await?;
    let bank = accounts.iter().find(|a| a.ac_code == "B001").unwrap();
    let mill = accounts.iter().find(|a| a.ac_code == "M001").unwrap();

    let created = create_sample(&service, 10000.0).await?;

    assert_eq!(created.head.doc_no, 1);
    assert_eq!(created.head.amount, 1_000_000);
    assert_eq!(created.head.bank_accoid, Some(bank.accoid));
    assert_eq!(created.head.mill_accoid, Some(mill.accoid));
    assert_eq!(created.added_details.len(), 1);
    assert_eq!(created.added_details[0].utrid, created.head.utrid);
    assert_eq!(created.added_details[0].doc_no, 1);

    let creates = ledger.creates();
    assert_eq!(creates.len(), 1);
    let (key, entries) = &creates[0];
    assert_eq!(key, &LedgerKey::utr(COMPANY, 1, YEAR));
    assert_eq!(entries.len(), 2);

    let credit = &entries[0];
    assert_eq!(credit.drcr, Drcr::Credit);
    assert_eq!(credit.ac_code, "B001");
    assert_eq!(credit.drcr_head, "M001");
    assert_eq!(credit.accoid, Some(bank.accoid));
    assert_eq!(credit.amount, 1_000_000);
    assert_eq!(credit.narration, "Advance April");

    let debit = &entries[1];
    assert_eq!(debit.drcr, Drcr::Debit);
    assert_eq!(debit.ac_code, "M001");
    assert_eq!(debit.drcr_head, "B001");
    assert_eq!(debit.accoid, Some(mill.accoid));
    assert_eq!(debit.amount, credit.amount);

    Ok(())
}

#[tokio::test]
async fn test_doc_numbers_are_sequential_per_scope() -> Result<()> {
    let (service, _ledger, _temp) = test_service().await?;

    let first = create_sample(&service, 100.0).await?;
    let second = create_sample(&service, 200.0).await?;
    assert_eq!(first.head.doc_no, 1);
    assert_eq!(second.head.doc_no, 2);

    // Another year starts its own sequence
    let mut body = insert_body(300.0, vec![]);
    body["head_data"]["Year_Code"] = json!("2025");
    let other: NewUtrPayload = serde_json::from_value(body)?;
    let other_year = service.create_utr(other).await?;
    assert_eq!(other_year.head.doc_no, 1);

    Ok(())
}

#[tokio::test]
async fn test_zero_amount_still_syncs_empty_posting() -> Result<()> {
    let (service, ledger, _temp) = test_service().await?;

    let created = create_sample(&service, 0.0).await?;
    assert!(created.ledger_entries.is_empty());

    let creates = ledger.creates();
    assert_eq!(creates.len(), 1);
    assert!(creates[0].1.is_empty());

    let record = service.get_by_doc_no(&scope(), created.head.doc_no).await?;
    assert_eq!(record.head.amount, 0);
    Ok(())
}

#[tokio::test]
async fn test_unknown_accounts_leave_accoid_empty() -> Result<()> {
    let (service, ledger, _temp) = test_service().await?;

    let created = create_sample(&service, 50.0).await?;
    assert_eq!(created.head.bank_accoid, None);
    assert_eq!(created.head.mill_accoid, None);
    assert!(ledger.creates()[0].1.iter().all(|e| e.accoid.is_none()));

    let record = service.get_by_id(created.head.utrid).await?;
    assert_eq!(record.labels.bank_ac_name, None);
    assert_eq!(record.labels.mill_name, None);
    Ok(())
}

#[tokio::test]
async fn test_ledger_rejection_rolls_back_create() -> Result<()> {
    let (service, ledger, _temp) = test_service().await?;
    ledger.fail_creates_with(500);

    let result = create_sample(&service, 10000.0).await;
    let err = result.unwrap_err().downcast::<AppError>()?;
    assert!(matches!(err, AppError::LedgerRejected { status: 500, .. }));

    assert!(matches!(
        service.get_by_doc_no(&scope(), 1).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        service.list_utrs(&scope()).await,
        Err(AppError::NotFound(_))
    ));

    // The document number was not consumed
    ledger.recover();
    let created = create_sample(&service, 10000.0).await?;
    assert_eq!(created.head.doc_no, 1);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_ledger_rolls_back_create() -> Result<()> {
    let (service, ledger, _temp) = test_service().await?;
    ledger.go_offline();

    let result = service
        .create_utr(insert_payload(10.0, vec![add_line("L1", 10.0)]))
        .await;
    assert!(matches!(result, Err(AppError::LedgerUnavailable(_))));
    assert!(service.list_utrs(&scope()).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_create_rejects_non_add_actions() -> Result<()> {
    let (service, ledger, _temp) = test_service().await?;

    let payload: NewUtrPayload = serde_json::from_value(insert_body(
        10.0,
        vec![json!({ "rowaction": "delete", "utrdetailid": 1 })],
    ))?;
    let result = service.create_utr(payload).await;

    assert!(matches!(result, Err(AppError::InvalidPayload(_))));
    assert!(ledger.calls().is_empty());
    Ok(())
}

// ========================
// Update
// ========================

#[tokio::test]
async fn test_update_applies_header_and_detail_actions() -> Result<()> {
    let (service, ledger, _temp) = test_service().await?;
    StandardAccounts::create(&service).await?;

    let created = service
        .create_utr(insert_payload(
            10000.0,
            vec![add_line("L1", 6000.0), add_line("L2", 4000.0)],
        ))
        .await?;
    let utrid = created.head.utrid;
    let keep = created.added_details[0].utrdetailid;
    let drop = created.added_details[1].utrdetailid;

    let updated = service
        .update_utr(
            utrid,
            update_payload(json!({
                "head_data": {
                    "amount": 5000,
                    "mill_code": "M002",
                    "Modified_By": "auditor",
                    "doc_no": 99
                },
                "detail_data": [
                    { "rowaction": "add", "lot_no": "L3", "amount": 1000 },
                    { "rowaction": "update", "utrdetailid": keep, "amount": 4000 },
                    { "rowaction": "delete", "utrdetailid": drop },
                    { "rowaction": "delete", "utrdetailid": 9999 }
                ]
            })),
        )
        .await?;

    assert_eq!(updated.head_rows, 1);
    assert_eq!(updated.head.amount, 500_000);
    assert_eq!(updated.head.doc_no, 1);
    assert_eq!(updated.head.mill_code, "M002");
    assert!(updated.head.mill_accoid.is_some());
    assert!(updated.head.modified_at.is_some());
    assert_eq!(updated.created_details.len(), 1);
    assert_eq!(updated.updated_details, vec![keep]);
    assert_eq!(updated.deleted_detail_ids, vec![drop]);

    let creates = ledger.creates();
    assert_eq!(creates.len(), 2);
    let (key, entries) = &creates[1];
    assert_eq!(key, &LedgerKey::utr(COMPANY, 1, YEAR));
    assert_eq!(entries[1].ac_code, "M002");
    assert_eq!(entries[1].amount, 500_000);

    let record = service.get_by_id(utrid).await?;
    assert_eq!(record.head.modified_by.as_deref(), Some("auditor"));
    assert_eq!(record.labels.mill_name.as_deref(), Some("Riverside Mill"));
    assert_eq!(record.details.len(), 2);
    let kept = record
        .details
        .iter()
        .find(|d| d.utrdetailid == keep)
        .unwrap();
    assert_eq!(kept.fields.amount, 400_000);
    assert_eq!(kept.fields.lot_no.as_deref(), Some("L1"));
    Ok(())
}

#[tokio::test]
async fn test_repeated_detail_delete_is_a_no_op() -> Result<()> {
    let (service, _ledger, _temp) = test_service().await?;
    let created = create_sample(&service, 100.0).await?;
    let utrid = created.head.utrid;
    let detail = created.added_details[0].utrdetailid;

    let delete = json!({ "detail_data": [{ "rowaction": "delete", "utrdetailid": detail }] });

    let first = service.update_utr(utrid, update_payload(delete.clone())).await?;
    assert_eq!(first.deleted_detail_ids, vec![detail]);

    let second = service.update_utr(utrid, update_payload(delete)).await?;
    assert!(second.deleted_detail_ids.is_empty());
    assert!(service.get_by_id(utrid).await?.details.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_update_cannot_touch_another_entrys_details() -> Result<()> {
    let (service, _ledger, _temp) = test_service().await?;
    let a = create_sample(&service, 100.0).await?;
    let b = create_sample(&service, 200.0).await?;
    let foreign = b.added_details[0].utrdetailid;

    let updated = service
        .update_utr(
            a.head.utrid,
            update_payload(json!({
                "detail_data": [
                    { "rowaction": "update", "utrdetailid": foreign, "lot_no": "HIJACK" },
                    { "rowaction": "delete", "utrdetailid": foreign }
                ]
            })),
        )
        .await?;
    assert!(updated.updated_details.is_empty());
    assert!(updated.deleted_detail_ids.is_empty());

    let other = service.get_by_id(b.head.utrid).await?;
    assert_eq!(other.details.len(), 1);
    assert_eq!(other.details[0].fields.lot_no.as_deref(), Some("L1"));
    Ok(())
}

#[tokio::test]
async fn test_update_unknown_entry_is_not_found() -> Result<()> {
    let (service, ledger, _temp) = test_service().await?;

    let result = service
        .update_utr(42, update_payload(json!({ "head_data": { "amount": 1 } })))
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(ledger.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_ledger_rejection_rolls_back_update() -> Result<()> {
    let (service, ledger, _temp) = test_service().await?;
    let created = create_sample(&service, 100.0).await?;
    ledger.fail_creates_with(422);

    let result = service
        .update_utr(
            created.head.utrid,
            update_payload(json!({
                "head_data": { "amount": 999 },
                "detail_data": [{ "rowaction": "add", "lot_no": "L9", "amount": 899 }]
            })),
        )
        .await;
    assert!(matches!(
        result,
        Err(AppError::LedgerRejected { status: 422, .. })
    ));

    let record = service.get_by_id(created.head.utrid).await?;
    assert_eq!(record.head.amount, 10_000);
    assert_eq!(record.head.modified_at, None);
    assert_eq!(record.details.len(), 1);
    Ok(())
}

// ========================
// Delete
// ========================

#[tokio::test]
async fn test_delete_removes_entry_and_postings() -> Result<()> {
    let (service, ledger, _temp) = test_service().await?;
    let created = create_sample(&service, 100.0).await?;

    let deleted = service
        .delete_utr(created.head.utrid, &scope(), created.head.doc_no)
        .await?;
    assert_eq!(deleted.head_rows, 1);
    assert_eq!(deleted.detail_rows, 1);
    assert!(deleted.ledger_synced);
    assert_eq!(ledger.deletes(), vec![LedgerKey::utr(COMPANY, 1, YEAR)]);

    assert!(matches!(
        service.get_by_doc_no(&scope(), 1).await,
        Err(AppError::NotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_mismatched_delete_leaves_everything_alone() -> Result<()> {
    let (service, ledger, _temp) = test_service().await?;
    let created = create_sample(&service, 100.0).await?;

    let utrid = created.head.utrid;
    let doc_no = created.head.doc_no;

    // Each case gets exactly one of the four values wrong
    let cases = [
        (utrid + 100, scope(), doc_no),
        (utrid, UtrScope::new("99", YEAR), doc_no),
        (utrid, UtrScope::new(COMPANY, "1999"), doc_no),
        (utrid, scope(), doc_no + 1),
    ];
    for (utrid, scope, doc_no) in cases {
        let deleted = service.delete_utr(utrid, &scope, doc_no).await?;
        assert_eq!(deleted.head_rows, 0, "{scope:?} doc {doc_no}");
        assert_eq!(deleted.detail_rows, 0);
        assert!(!deleted.ledger_synced);
    }
    assert!(ledger.deletes().is_empty());

    let record = service.get_by_id(created.head.utrid).await?;
    assert_eq!(record.details.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_delete_without_details_skips_ledger() -> Result<()> {
    let (service, ledger, _temp) = test_service().await?;
    let created = service.create_utr(insert_payload(100.0, vec![])).await?;

    let deleted = service
        .delete_utr(created.head.utrid, &scope(), created.head.doc_no)
        .await?;
    assert_eq!(deleted.head_rows, 1);
    assert_eq!(deleted.detail_rows, 0);
    assert!(!deleted.ledger_synced);
    assert!(ledger.deletes().is_empty());
    assert!(service.get_by_id(created.head.utrid).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_ledger_delete_failure_rolls_back() -> Result<()> {
    let (service, ledger, _temp) = test_service().await?;
    let created = create_sample(&service, 100.0).await?;

    // Only an exact 200 counts as a successful delete
    ledger.fail_deletes_with(201);
    let result = service
        .delete_utr(created.head.utrid, &scope(), created.head.doc_no)
        .await;
    assert!(matches!(
        result,
        Err(AppError::LedgerDeleteRejected { status: 201, .. })
    ));

    let record = service.get_by_id(created.head.utrid).await?;
    assert_eq!(record.details.len(), 1);

    ledger.recover();
    ledger.go_offline();
    let result = service
        .delete_utr(created.head.utrid, &scope(), created.head.doc_no)
        .await;
    assert!(matches!(result, Err(AppError::LedgerUnavailable(_))));
    assert!(service.get_by_id(created.head.utrid).await.is_ok());
    Ok(())
}
