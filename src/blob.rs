// src/blob.rs

use std::path::PathBuf;
use std::sync::OnceLock;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use regex::Regex;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob already exists: {0}")]
    Exists(String),

    #[error("blob store error: {0}")]
    Io(String),
}

/// Where uploaded bytes go. Keys are flat generated file names.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Never replaces an existing blob; a taken name is `BlobError::Exists`.
    async fn put(&self, name: &str, data: Bytes) -> Result<(), BlobError>;

    /// No-op when the blob is already gone.
    async fn delete(&self, name: &str) -> Result<(), BlobError>;
}

pub struct LocalBlobStore {
    base_dir: PathBuf,
}

impl LocalBlobStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Keys never contain separators, so joining cannot escape `base_dir`.
    fn resolve(&self, name: &str) -> PathBuf {
        self.base_dir.join(sanitize(name))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, name: &str, data: Bytes) -> Result<(), BlobError> {
        tokio::fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| BlobError::Io(format!("mkdir {}: {e}", self.base_dir.display())))?;
        let path = self.resolve(name);
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => BlobError::Exists(name.to_string()),
                _ => BlobError::Io(format!("create {}: {e}", path.display())),
            })?;
        file.write_all(&data)
            .await
            .map_err(|e| BlobError::Io(format!("write {}: {e}", path.display())))?;
        file.flush()
            .await
            .map_err(|e| BlobError::Io(format!("flush {}: {e}", path.display())))
    }

    async fn delete(&self, name: &str) -> Result<(), BlobError> {
        let path = self.resolve(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BlobError::Io(format!("delete {}: {e}", path.display()))),
        }
    }
}

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9_.\-]").expect("static pattern"))
}

/// Replaces every character outside `[A-Za-z0-9_.-]` with `_`.
pub fn sanitize(name: &str) -> String {
    let cleaned = unsafe_chars().replace_all(name, "_");
    match cleaned.as_ref() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned.into_owned(),
    }
}

/// `{millis}_{nonce}_{sanitized original}`. The nonce keeps two uploads of
/// the same name in the same millisecond apart.
pub fn stored_name(original: &str) -> String {
    let nonce = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}",
        Utc::now().timestamp_millis(),
        &nonce[..8],
        sanitize(original)
    )
}
