// src/upload.rs

use std::collections::HashMap;

use actix_multipart::Multipart;
use actix_web::HttpRequest;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use log::{error, warn};

use crate::app_state::AppState;
use crate::blob::{stored_name, BlobError};
use crate::error::ApiError;
use crate::models::task::Task;

pub struct UploadedFile {
    pub original_name: String,
    pub data: Bytes,
}

const STORE_ATTEMPTS: usize = 3;

/// A parsed `multipart/form-data` body: the part named `file` plus every
/// plain text part.
#[derive(Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Where a stored upload ended up.
pub struct StoredBlob {
    pub file_name: String,
    pub size: u64,
    pub url: String,
}

/// Plain text parts (`description`, `isPublic`, ...) are tiny; anything
/// bigger is not a form field.
pub const MAX_FIELD_BYTES: usize = 64 * 1024;

/// Reads the whole form, refusing a `file` part over `max_file_bytes` or a
/// text part over [`MAX_FIELD_BYTES`] as soon as the limit is crossed.
pub async fn read_form(mut payload: Multipart, max_file_bytes: usize) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    while let Some(field) = payload.next().await {
        let mut field = field.map_err(bad_form)?;
        let (name, file_name) = match field.content_disposition() {
            Some(cd) => (
                cd.get_name().unwrap_or_default().to_string(),
                cd.get_filename().map(str::to_string),
            ),
            None => (String::new(), None),
        };
        let limit = if file_name.is_some() {
            max_file_bytes
        } else {
            MAX_FIELD_BYTES
        };

        let mut buf = BytesMut::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(bad_form)?;
            if buf.len() + chunk.len() > limit {
                return Err(ApiError::validation(format!(
                    "Upload part '{name}' exceeds the {limit} byte limit"
                )));
            }
            buf.extend_from_slice(&chunk);
        }

        match file_name {
            Some(original) if name == "file" && !original.is_empty() => {
                form.file = Some(UploadedFile {
                    original_name: original,
                    data: buf.freeze(),
                });
            }
            None if !name.is_empty() => {
                form.fields
                    .insert(name, String::from_utf8_lossy(&buf).into_owned());
            }
            _ => {}
        }
    }
    Ok(form)
}

/// Writes the upload to the blob store under a fresh generated name and
/// returns its public location.
pub async fn store_file(
    data: &AppState,
    req: &HttpRequest,
    file: UploadedFile,
) -> Result<StoredBlob, ApiError> {
    let size = file.data.len() as u64;
    let mut attempt = 0;
    let file_name = loop {
        let candidate = stored_name(&file.original_name);
        match data.blobs.put(&candidate, file.data.clone()).await {
            Ok(()) => break candidate,
            Err(BlobError::Exists(taken)) if attempt < STORE_ATTEMPTS => {
                warn!("Blob name {} already taken, retrying", taken);
                attempt += 1;
            }
            Err(e) => {
                error!("Upload error: {}", e);
                return Err(ApiError::upstream("File upload failed"));
            }
        }
    };

    let conn = req.connection_info();
    let url = format!("{}://{}/uploads/{}", conn.scheme(), conn.host(), file_name);
    Ok(StoredBlob {
        file_name,
        size,
        url,
    })
}

/// Blob removal never fails the request; a leftover file is only logged.
pub async fn discard_file(data: &AppState, file_name: &str) {
    if let Err(e) = data.blobs.delete(file_name).await {
        warn!("Could not remove {}: {}", file_name, e);
    }
}

/// Drops the stored bytes behind every attachment of tasks that are gone.
pub async fn discard_attachments(data: &AppState, tasks: &[Task]) {
    for attachment in tasks.iter().flat_map(|t| &t.attachments) {
        if !attachment.file_name.is_empty() {
            discard_file(data, &attachment.file_name).await;
        }
    }
}

fn bad_form(e: actix_multipart::MultipartError) -> ApiError {
    ApiError::validation(format!("Malformed upload: {e}"))
}
