use std::sync::Arc;

use actix_web::web;
use serde_json::json;
use tempfile::TempDir;

use crate::app_state::AppState;
use crate::auth::{create_jwt, Identity};
use crate::blob::LocalBlobStore;
use crate::config::Config;
use crate::directory::memory::MemoryUserDirectory;
use crate::models::user::{Role, User};
use crate::store::Stores;

pub const ADMIN_ID: &str = "1";
pub const STAFF_ID: &str = "2";
pub const OTHER_STAFF_ID: &str = "3";
pub const INACTIVE_ID: &str = "4";

/// Builds the service under test from an `AppState`.
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($state.clone())
                .configure(crate::routes::configure),
        )
        .await
    };
}
pub(crate) use test_app;

fn seed_users() -> Vec<User> {
    let staff_hash = bcrypt::hash("staff123", 4).unwrap();
    let rows = json!([
        {"id": ADMIN_ID, "fullName": "Ada Admin", "email": "admin@example.com",
         "password": "admin123", "role": "admin", "position": "Manager", "status": "active"},
        {"id": STAFF_ID, "fullName": "Sam Staff", "email": "staff@example.com",
         "password": staff_hash, "role": "staff", "position": "Engineer", "status": "active"},
        {"id": OTHER_STAFF_ID, "fullName": "Oli Other", "email": "other@example.com",
         "password": "other123", "role": "staff", "position": "Designer", "status": "active"},
        {"id": INACTIVE_ID, "fullName": "Ina Inactive", "email": "inactive@example.com",
         "password": "inactive1", "role": "staff", "position": "Intern", "status": "inactive"},
    ]);
    serde_json::from_value(rows).unwrap()
}

/// State with seeded users, empty stores and uploads under a temp dir. Keep
/// the `TempDir` alive for the duration of the test.
pub fn test_state_with_directory() -> (web::Data<AppState>, Arc<MemoryUserDirectory>, TempDir) {
    let uploads = tempfile::tempdir().unwrap();
    let directory = Arc::new(MemoryUserDirectory::with_users(seed_users()));
    let config = Config {
        bcrypt_cost: 4,
        max_upload_bytes: 1024,
        jwt_secret: "test-secret".to_string(),
        uploads_dir: uploads.path().to_path_buf(),
        ..Config::default()
    };
    let state = AppState {
        blobs: Arc::new(LocalBlobStore::new(config.uploads_dir.clone())),
        config,
        users: directory.clone(),
        stores: Arc::new(Stores::new()),
    };
    (web::Data::new(state), directory, uploads)
}

pub fn test_state() -> (web::Data<AppState>, TempDir) {
    let (state, _directory, uploads) = test_state_with_directory();
    (state, uploads)
}

pub fn token_for(state: &AppState, id: &str, role: Role) -> String {
    let identity = Identity {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        role,
        full_name: format!("user {id}"),
        position: String::new(),
    };
    create_jwt(&identity, &state.config.jwt_secret, 1).unwrap()
}

pub fn admin_token(state: &AppState) -> String {
    token_for(state, ADMIN_ID, Role::Admin)
}

pub fn staff_token(state: &AppState) -> String {
    token_for(state, STAFF_ID, Role::Staff)
}

pub fn other_staff_token(state: &AppState) -> String {
    token_for(state, OTHER_STAFF_ID, Role::Staff)
}

pub fn mock_token(id: &str) -> String {
    format!("mock_token_{id}_1754000000000")
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

/// A `multipart/form-data` body with one file part and optional text parts.
pub fn multipart_body(
    file_name: &str,
    contents: &[u8],
    fields: &[(&str, &str)],
) -> (String, Vec<u8>) {
    let boundary = "----staffdesk-test-boundary";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}
