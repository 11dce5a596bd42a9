// src/directory.rs
//
// The remote user collection. It is a hosted mock REST API: `GET /`,
// `GET /{id}`, `POST /`, `PUT /{id}`, `DELETE /{id}` on a single base URL.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::StatusCode;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::ApiError;
use crate::models::user::{NewUser, User};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("user not found: {0}")]
    NotFound(String),

    #[error("user collection answered {0}")]
    Status(u16),

    #[error("user collection unreachable: {0}")]
    Transport(String),

    #[error("unexpected user collection payload: {0}")]
    Decode(String),
}

impl DirectoryError {
    /// Logs the failure and turns it into what the caller sees: a 404 for
    /// unknown users, otherwise a generic 500 carrying `message`.
    pub fn into_api(self, message: &str) -> ApiError {
        match self {
            DirectoryError::NotFound(_) => ApiError::not_found("User not found"),
            other => {
                error!("{}: {}", message, other);
                ApiError::upstream(message)
            }
        }
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list(&self) -> Result<Vec<User>, DirectoryError>;
    async fn get(&self, id: &str) -> Result<User, DirectoryError>;
    async fn create(&self, user: &NewUser) -> Result<User, DirectoryError>;
    async fn update(&self, id: &str, patch: &Map<String, Value>) -> Result<User, DirectoryError>;
    async fn delete(&self, id: &str) -> Result<(), DirectoryError>;

    /// Linear scan; the remote API has no lookup by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError> {
        let users = self.list().await?;
        Ok(users
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(email.trim())))
    }
}

pub struct HttpUserDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUserDirectory {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn item_url(&self, id: &str) -> String {
        format!("{}/{}", self.base_url, id)
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
        id: &str,
    ) -> Result<T, DirectoryError> {
        check(&resp, id)?;
        resp.json::<T>()
            .await
            .map_err(|e| DirectoryError::Decode(e.to_string()))
    }
}

fn check(resp: &reqwest::Response, id: &str) -> Result<(), DirectoryError> {
    match resp.status() {
        s if s.is_success() => Ok(()),
        StatusCode::NOT_FOUND => Err(DirectoryError::NotFound(id.to_string())),
        s => Err(DirectoryError::Status(s.as_u16())),
    }
}

fn transport(e: reqwest::Error) -> DirectoryError {
    DirectoryError::Transport(e.to_string())
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn list(&self) -> Result<Vec<User>, DirectoryError> {
        debug!("GET {}", self.base_url);
        let resp = self.client.get(&self.base_url).send().await.map_err(transport)?;
        Self::decode(resp, "").await
    }

    async fn get(&self, id: &str) -> Result<User, DirectoryError> {
        let url = self.item_url(id);
        debug!("GET {}", url);
        let resp = self.client.get(&url).send().await.map_err(transport)?;
        Self::decode(resp, id).await
    }

    async fn create(&self, user: &NewUser) -> Result<User, DirectoryError> {
        debug!("POST {}", self.base_url);
        let resp = self
            .client
            .post(&self.base_url)
            .json(user)
            .send()
            .await
            .map_err(transport)?;
        Self::decode(resp, "").await
    }

    async fn update(&self, id: &str, patch: &Map<String, Value>) -> Result<User, DirectoryError> {
        let url = self.item_url(id);
        debug!("PUT {}", url);
        let resp = self
            .client
            .put(&url)
            .json(patch)
            .send()
            .await
            .map_err(transport)?;
        Self::decode(resp, id).await
    }

    async fn delete(&self, id: &str) -> Result<(), DirectoryError> {
        let url = self.item_url(id);
        debug!("DELETE {}", url);
        let resp = self.client.delete(&url).send().await.map_err(transport)?;
        check(&resp, id)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{Role, UserStatus};
    use actix_web::{dev::ServerHandle, web, App, HttpResponse, HttpServer};
    use serde_json::json;

    fn ada() -> Value {
        json!({ "id": "1", "fullName": "Ada", "email": "Ada@Example.com", "role": "admin" })
    }

    async fn list_rows() -> HttpResponse {
        HttpResponse::Ok().json(json!([
            ada(),
            { "id": 2, "fullName": "Sam", "email": "sam@example.com", "role": "staff", "avatar": "a.png" },
        ]))
    }

    async fn get_row(id: web::Path<String>) -> HttpResponse {
        match id.as_str() {
            "1" => HttpResponse::Ok().json(ada()),
            "broken" => HttpResponse::InternalServerError().finish(),
            "garbled" => HttpResponse::Ok().body("not json"),
            _ => HttpResponse::NotFound().json("Not found"),
        }
    }

    async fn create_row(body: web::Json<Value>) -> HttpResponse {
        let mut row = body.into_inner();
        row["id"] = json!("42");
        HttpResponse::Created().json(row)
    }

    async fn update_row(id: web::Path<String>, body: web::Json<Value>) -> HttpResponse {
        if id.as_str() != "1" {
            return HttpResponse::NotFound().json("Not found");
        }
        let mut row = ada();
        if let (Some(row), Some(patch)) = (row.as_object_mut(), body.as_object()) {
            row.extend(patch.clone());
        }
        HttpResponse::Ok().json(row)
    }

    async fn delete_row(id: web::Path<String>) -> HttpResponse {
        match id.as_str() {
            "1" => HttpResponse::Ok().json(ada()),
            _ => HttpResponse::NotFound().json("Not found"),
        }
    }

    /// Serves a tiny copy of the hosted collection on a free local port.
    fn start_collection() -> (String, ServerHandle) {
        let server = HttpServer::new(|| {
            App::new().service(
                web::scope("/users")
                    .route("", web::get().to(list_rows))
                    .route("", web::post().to(create_row))
                    .route("/{id}", web::get().to(get_row))
                    .route("/{id}", web::put().to(update_row))
                    .route("/{id}", web::delete().to(delete_row)),
            )
        })
        .workers(1)
        .shutdown_timeout(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);
        (format!("http://{addr}/users"), handle)
    }

    #[actix_web::test]
    async fn http_directory_reads_and_writes_rows() {
        let (base, handle) = start_collection();
        // Trailing slash on the configured URL must not double up.
        let users = HttpUserDirectory::new(&format!("{base}/"), Duration::from_secs(5)).unwrap();

        let rows = users.list().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].id, "2");
        assert_eq!(rows[1].extra["avatar"], "a.png");

        let found = users.find_by_email(" ada@example.com ").await.unwrap().unwrap();
        assert_eq!(found.id, "1");
        assert_eq!(found.role, Role::Admin);

        let created = users
            .create(&NewUser {
                full_name: "Neo".into(),
                email: "neo@example.com".into(),
                password: "hash".into(),
                role: Role::Staff,
                position: "Ops".into(),
                status: UserStatus::Active,
                avatar: None,
                created_at: "2025-01-01T00:00:00Z".into(),
                updated_at: "2025-01-01T00:00:00Z".into(),
                extra: Map::new(),
            })
            .await
            .unwrap();
        assert_eq!(created.id, "42");
        assert_eq!(created.email, "neo@example.com");

        let mut patch = Map::new();
        patch.insert("position".into(), json!("Lead"));
        assert_eq!(users.update("1", &patch).await.unwrap().position, "Lead");

        users.delete("1").await.unwrap();
        handle.stop(true).await;
    }

    #[actix_web::test]
    async fn http_directory_maps_remote_failures() {
        let (base, handle) = start_collection();
        let users = HttpUserDirectory::new(&base, Duration::from_secs(5)).unwrap();

        let missing = users.get("9").await.unwrap_err();
        assert!(matches!(missing, DirectoryError::NotFound(ref id) if id == "9"));
        assert!(matches!(missing.into_api("x"), ApiError::NotFound(_)));

        assert!(matches!(users.delete("9").await, Err(DirectoryError::NotFound(_))));
        assert!(matches!(users.update("9", &Map::new()).await, Err(DirectoryError::NotFound(_))));
        assert!(matches!(users.get("broken").await, Err(DirectoryError::Status(500))));
        assert!(matches!(users.get("garbled").await, Err(DirectoryError::Decode(_))));

        let upstream = users.get("broken").await.unwrap_err().into_api("Error fetching user");
        assert!(matches!(upstream, ApiError::Upstream(ref m) if m == "Error fetching user"));

        handle.stop(true).await;
        assert!(matches!(users.list().await, Err(DirectoryError::Transport(_))));
    }
}
