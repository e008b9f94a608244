//! HTML pages and form actions.

use std::path::Path as FsPath;

use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use chrono::Utc;
use rcpt_core::{export_csv, ingest, Receipt};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::forms::{ItemForm, ReceiptForm};
use crate::views;
use crate::AppState;

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "receipt";

fn receipt_url(id: i64) -> String {
    format!("/receipt/{}", id)
}

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let receipts = state.store.list_receipts().await?;
    Ok(Html(views::index_page(&receipts)))
}

/// Edit page; unknown receipts send the user back to the list.
pub async fn show_receipt(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    match state.store.get_receipt(id).await? {
        Some(receipt) => Ok(Html(views::receipt_page(&receipt)).into_response()),
        None => Ok(Redirect::to("/").into_response()),
    }
}

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Redirect, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Read error: {}", e)))?
            .to_vec();
        upload = Some((filename, data));
    }

    let Some((filename, data)) = upload.filter(|(_, data)| !data.is_empty()) else {
        return Ok(Redirect::to("/"));
    };

    if let Err(e) = save_upload(&state.config.storage.upload_dir, &filename, &data).await {
        warn!("Could not keep a copy of {}: {}", filename, e);
    }

    let worker = state.clone();
    let name = filename.clone();
    let drafts = tokio::task::spawn_blocking(move || {
        ingest::process_upload(&name, &data, worker.ocr.as_deref(), worker.parser.as_ref())
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    let mut ids = Vec::with_capacity(drafts.len());
    for draft in &drafts {
        ids.push(state.store.insert_draft(draft).await?);
    }
    info!("Upload {} produced {} receipt(s)", filename, ids.len());

    Ok(match ids.as_slice() {
        [id] => Redirect::to(&receipt_url(*id)),
        _ => Redirect::to("/"),
    })
}

/// Keep the original file as `<millis>_<name>` in the upload directory.
async fn save_upload(dir: &FsPath, filename: &str, data: &[u8]) -> std::io::Result<()> {
    let base = FsPath::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");
    let safe_name = base.split_whitespace().collect::<Vec<_>>().join("_");
    let stored = dir.join(format!("{}_{}", Utc::now().timestamp_millis(), safe_name));

    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(&stored, data).await
}

pub async fn update_receipt(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<ReceiptForm>,
) -> Result<Redirect, ApiError> {
    let update = form.into_update(state.config.extraction.day_first)?;
    state.store.update_receipt(id, &update).await?;
    Ok(Redirect::to(&receipt_url(id)))
}

pub async fn delete_receipt(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Redirect, ApiError> {
    state.store.delete_receipt(id).await?;
    Ok(Redirect::to("/"))
}

pub async fn reparse_receipt(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Redirect, ApiError> {
    state.store.reparse_receipt(id, state.parser.as_ref()).await?;
    Ok(Redirect::to(&receipt_url(id)))
}

pub async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<ItemForm>,
) -> Result<Redirect, ApiError> {
    state.store.add_item(id, &form.into_input()?).await?;
    Ok(Redirect::to(&receipt_url(id)))
}

pub async fn update_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(i64, i64)>,
    Form(form): Form<ItemForm>,
) -> Result<Redirect, ApiError> {
    state.store.update_item(id, item_id, &form.into_input()?).await?;
    Ok(Redirect::to(&receipt_url(id)))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(i64, i64)>,
) -> Result<Redirect, ApiError> {
    state.store.delete_item(id, item_id).await?;
    Ok(Redirect::to(&receipt_url(id)))
}

pub async fn export_receipt(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let receipt = state
        .store
        .get_receipt(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("receipt {} not found", id)))?;
    csv_response(&[receipt], &format!("receipt_{}.csv", id))
}

pub async fn export_all(State(state): State<AppState>) -> Result<Response, ApiError> {
    let receipts = state.store.all_receipts().await?;
    csv_response(&receipts, "receipts.csv")
}

fn csv_response(receipts: &[Receipt], filename: &str) -> Result<Response, ApiError> {
    let mut body = Vec::new();
    export_csv(receipts, &mut body)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response())
}
