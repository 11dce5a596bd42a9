use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::Role;

/// Metadata for a shared document. The bytes live in the blob store under
/// `file_name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub original_name: String,
    pub file_name: String,
    pub size: u64,
    pub url: String,
    pub description: String,
    pub is_public: bool,
    pub uploaded_by: String,
    pub uploaded_by_role: Role,
    pub uploaded_at: DateTime<Utc>,
}
