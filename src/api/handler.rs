use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::application::{AppError, UtrService};
use crate::domain::{NewUtrPayload, UtrRecord, UtrScope, UtrUpdatePayload};
use crate::storage::HeadLookup;

type ApiResult<T> = Result<T, AppError>;

/// Query parameters shared by the UTR endpoints. Each handler decides which
/// of them it requires.
#[derive(Debug, Default, Deserialize)]
pub struct UtrParams {
    #[serde(rename = "Company_Code")]
    pub company_code: Option<String>,
    #[serde(rename = "Year_Code")]
    pub year_code: Option<String>,
    pub doc_no: Option<String>,
    #[serde(rename = "currentDocNo")]
    pub current_doc_no: Option<String>,
    pub utrid: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number(name: &str, value: &str) -> ApiResult<i64> {
    value.parse().map_err(|_| AppError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
    })
}

impl UtrParams {
    fn scope(&self) -> Option<UtrScope> {
        Some(UtrScope::new(
            present(&self.company_code)?,
            present(&self.year_code)?,
        ))
    }

    fn require_scope(&self, message: &str) -> ApiResult<UtrScope> {
        self.scope().ok_or_else(|| AppError::missing(message))
    }

    fn require_number(&self, name: &str, value: &Option<String>, message: &str) -> ApiResult<i64> {
        let raw = present(value).ok_or_else(|| AppError::missing(message))?;
        parse_number(name, raw)
    }
}

/// `{<head_key>: head, labels, <details_key>: details}`
fn record_body(record: UtrRecord, head_key: &str, details_key: &str) -> Value {
    let mut body = serde_json::Map::new();
    body.insert(head_key.to_string(), json!(record.head));
    body.insert("labels".to_string(), json!(record.labels));
    body.insert(details_key.to_string(), json!(record.details));
    Value::Object(body)
}

fn payload<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(inner)| inner)
        .map_err(|rejection| AppError::InvalidPayload(rejection.body_text()))
}

/// Health check handler.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `GET /getdata-utr`
pub async fn list_handler(
    State(service): State<UtrService>,
    Query(params): Query<UtrParams>,
) -> ApiResult<Json<Value>> {
    let scope = params.require_scope("Missing required parameters")?;
    let records = service.list_utrs(&scope).await?;

    let all: Vec<Value> = records
        .into_iter()
        .map(|record| record_body(record, "utr_head_data", "utr_details"))
        .collect();
    Ok(Json(json!({ "all_data_utr": all })))
}

/// `GET /getutrByid`
pub async fn get_by_doc_no_handler(
    State(service): State<UtrService>,
    Query(params): Query<UtrParams>,
) -> ApiResult<Json<Value>> {
    const MISSING: &str = "Document number, Company Code, or Year Code not provided";
    let scope = params.require_scope(MISSING)?;
    let doc_no = params.require_number("doc_no", &params.doc_no, MISSING)?;

    let record = service.get_by_doc_no(&scope, doc_no).await?;
    Ok(Json(record_body(record, "utr_head", "utr_details")))
}

/// `POST /insert-utr`
pub async fn insert_handler(
    State(service): State<UtrService>,
    body: Result<Json<NewUtrPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let created = service.create_utr(payload(body)?).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Data Inserted successfully",
            "head": created.head,
            "addedDetails": created.added_details,
            "updatedDetails": [],
            "deletedDetailIds": [],
        })),
    ))
}

/// `PUT /update-utr`
pub async fn update_handler(
    State(service): State<UtrService>,
    Query(params): Query<UtrParams>,
    body: Result<Json<UtrUpdatePayload>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let utrid = params.require_number("utrid", &params.utrid, "Missing 'utrid' parameter")?;
    let updated = service.update_utr(utrid, payload(body)?).await?;

    Ok(Json(json!({
        "message": "Data updated successfully",
        "head": updated.head_rows,
        "created_details": updated.created_details,
        "updated_details": updated.updated_details,
        "deleted_detail_ids": updated.deleted_detail_ids,
    })))
}

/// `DELETE /delete_data_by_utrid`
pub async fn delete_handler(
    State(service): State<UtrService>,
    Query(params): Query<UtrParams>,
) -> ApiResult<Json<Value>> {
    const MISSING: &str = "Missing required parameters";
    let utrid = params.require_number("utrid", &params.utrid, MISSING)?;
    let scope = params.require_scope(MISSING)?;
    let doc_no = params.require_number("doc_no", &params.doc_no, MISSING)?;

    let deleted = service.delete_utr(utrid, &scope, doc_no).await?;

    Ok(Json(json!({
        "message": format!(
            "Deleted {} head row(s) and {} detail row(s) successfully",
            deleted.head_rows, deleted.detail_rows
        ),
        "deleted_head_rows": deleted.head_rows,
        "deleted_detail_rows": deleted.detail_rows,
        "ledger_synced": deleted.ledger_synced,
    })))
}

/// `GET /get-lastutrdata`
pub async fn last_handler(
    State(service): State<UtrService>,
    Query(params): Query<UtrParams>,
) -> ApiResult<Json<Value>> {
    let scope = params.require_scope("Missing required parameters")?;
    let record = service.navigate(&scope, HeadLookup::Last).await?;
    Ok(Json(record_body(record, "last_head_data", "last_details_data")))
}

/// `GET /get-firstutr-navigation`
pub async fn first_handler(
    State(service): State<UtrService>,
    Query(params): Query<UtrParams>,
) -> ApiResult<Json<Value>> {
    let scope = params.require_scope("Missing required parameters")?;
    let record = service.navigate(&scope, HeadLookup::First).await?;
    Ok(Json(record_body(record, "first_head_data", "first_details_data")))
}

/// `GET /get-previousutr-navigation`
pub async fn previous_handler(
    State(service): State<UtrService>,
    Query(params): Query<UtrParams>,
) -> ApiResult<Json<Value>> {
    const MISSING: &str = "Missing required parameters";
    let scope = params.require_scope(MISSING)?;
    let current = params.require_number("currentDocNo", &params.current_doc_no, MISSING)?;

    let record = service
        .navigate(&scope, HeadLookup::Previous(current))
        .await?;
    Ok(Json(record_body(
        record,
        "previous_head_data",
        "previous_details_data",
    )))
}

/// `GET /get-nextutr-navigation`
pub async fn next_handler(
    State(service): State<UtrService>,
    Query(params): Query<UtrParams>,
) -> ApiResult<Json<Value>> {
    const MISSING: &str = "Missing required parameters";
    let scope = params.require_scope(MISSING)?;
    let current = params.require_number("currentDocNo", &params.current_doc_no, MISSING)?;

    let record = service.navigate(&scope, HeadLookup::Next(current)).await?;
    Ok(Json(record_body(record, "next_head_data", "next_details_data")))
}
