// src/file.rs

use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::info;
use serde_json::json;

use crate::access::{can_view_file, ensure_file_deletable};
use crate::app_state::AppState;
use crate::auth::Identity;
use crate::error::ApiError;
use crate::models::file::FileRecord;
use crate::store::new_id;
use crate::upload::{discard_file, read_form, store_file};

/// POST /api/files/upload
///
/// Files are public unless the form says `isPublic=false`.
pub async fn upload_file(
    identity: Identity,
    data: web::Data<AppState>,
    http_req: HttpRequest,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let form = read_form(payload, data.config.max_upload_bytes).await?;
    let is_public = form.field("isPublic").unwrap_or("true") == "true";
    let description = form.field("description").unwrap_or_default().to_string();
    let file = form
        .file
        .ok_or_else(|| ApiError::validation("No file uploaded"))?;
    let original_name = file.original_name.clone();
    let stored = store_file(&data, &http_req, file).await?;

    let record = data.stores.files.insert_front(FileRecord {
        id: new_id(),
        original_name,
        file_name: stored.file_name,
        size: stored.size,
        url: stored.url,
        description,
        is_public,
        uploaded_by: identity.id.clone(),
        uploaded_by_role: identity.role,
        uploaded_at: Utc::now(),
    });
    info!("File {} uploaded by {}", record.file_name, identity.id);
    Ok(HttpResponse::Created().json(record))
}

/// GET /api/files
pub async fn list_files(
    identity: Identity,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let files = data.stores.files.filter(|f| can_view_file(&identity, f));
    Ok(HttpResponse::Ok().json(files))
}

/// DELETE /api/files/{file_id}
pub async fn delete_file(
    identity: Identity,
    data: web::Data<AppState>,
    file_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let record = data
        .stores
        .files
        .find(&file_id)
        .ok_or_else(|| ApiError::not_found("File not found"))?;
    ensure_file_deletable(&identity, &record)?;

    data.stores.files.remove(&record.id);
    discard_file(&data, &record.file_name).await;
    info!("File {} deleted by {}", record.id, identity.id);
    Ok(HttpResponse::Ok().json(json!({ "message": "File deleted" })))
}
