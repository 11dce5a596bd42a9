// src/user_management.rs
//
// Admin CRUD over the remote user collection. This service only adds role
// checks, password hashing and timestamps on the way through.

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::access::{require_admin, require_staff_or_admin};
use crate::app_state::AppState;
use crate::auth::{hash_password, is_valid_email, password_matches, Identity, MIN_PASSWORD_LEN};
use crate::error::ApiError;
use crate::models::user::{NewUser, Role, User, UserStatus};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub status: Option<UserStatus>,
    /// Whatever else the admin form sends (avatar, ...), stored untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// GET /api/users
pub async fn list_users(
    identity: Identity,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&identity)?;
    let users: Vec<User> = data
        .users
        .list()
        .await
        .map_err(|e| e.into_api("Error fetching users"))?
        .into_iter()
        .map(User::redacted)
        .collect();
    Ok(HttpResponse::Ok().json(users))
}

/// GET /api/users/{id}
pub async fn get_user(
    identity: Identity,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_staff_or_admin(&identity)?;
    let user = data
        .users
        .get(&path.into_inner())
        .await
        .map_err(|e| e.into_api("Error fetching user"))?;
    Ok(HttpResponse::Ok().json(user.redacted()))
}

/// POST /api/users
pub async fn create_user(
    identity: Identity,
    data: web::Data<AppState>,
    payload: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&identity)?;
    let payload = payload.into_inner();

    let full_name = payload
        .full_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::validation("fullName is required"))?;
    let email = payload
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| is_valid_email(e))
        .ok_or_else(|| ApiError::validation("A valid email is required"))?;
    let password = payload
        .password
        .filter(|p| p.chars().count() >= MIN_PASSWORD_LEN)
        .ok_or_else(|| ApiError::validation("Password must be at least 6 characters long"))?;
    let role = payload
        .role
        .as_deref()
        .and_then(Role::parse_assignable)
        .ok_or_else(|| ApiError::validation(r#"Role must be either "admin" or "staff""#))?;

    let hashed = hash_password(password, data.config.bcrypt_cost).await?;
    let now = Utc::now().to_rfc3339();
    let mut extra = payload.extra;
    for reserved in ["id", "createdAt", "updatedAt"] {
        extra.remove(reserved);
    }
    let new_user = NewUser {
        full_name,
        email,
        password: hashed,
        role,
        position: payload.position,
        status: payload.status.unwrap_or(UserStatus::Active),
        avatar: None,
        created_at: now.clone(),
        updated_at: now,
        extra,
    };

    let created = data
        .users
        .create(&new_user)
        .await
        .map_err(|e| e.into_api("Error creating user"))?;
    info!("Admin {} created user {}", identity.id, created.id);
    Ok(HttpResponse::Created().json(created.redacted()))
}

/// PUT /api/users/{id}
///
/// Forwards a partial update. A new password is hashed when it is long
/// enough and silently dropped otherwise.
pub async fn update_user(
    identity: Identity,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<Map<String, Value>>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&identity)?;
    let user_id = path.into_inner();
    let mut patch = payload.into_inner();

    patch.remove("id");
    if let Some(Value::String(password)) = patch.remove("password") {
        if password.chars().count() >= MIN_PASSWORD_LEN {
            let hashed = hash_password(password, data.config.bcrypt_cost).await?;
            patch.insert("password".into(), Value::String(hashed));
        }
    }
    if let Some(Value::String(email)) = patch.get("email") {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(ApiError::validation("Email address is not valid"));
        }
        patch.insert("email".into(), Value::String(email));
    }
    patch.insert("updatedAt".into(), Value::String(Utc::now().to_rfc3339()));

    let updated = data
        .users
        .update(&user_id, &patch)
        .await
        .map_err(|e| e.into_api("Error updating user"))?;
    info!("Admin {} updated user {}", identity.id, user_id);
    Ok(HttpResponse::Ok().json(updated.redacted()))
}

/// DELETE /api/users/{id}
pub async fn delete_user(
    identity: Identity,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&identity)?;
    let user_id = path.into_inner();
    data.users
        .delete(&user_id)
        .await
        .map_err(|e| e.into_api("Error deleting user"))?;
    info!("Admin {} deleted user {}", identity.id, user_id);
    Ok(HttpResponse::Ok().json(json!({ "message": "User deleted successfully" })))
}

/// PUT /api/users/change-password
pub async fn change_password(
    identity: Identity,
    data: web::Data<AppState>,
    payload: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    let (current, new) = match (payload.current_password, payload.new_password) {
        (Some(c), Some(n)) if !c.is_empty() && !n.is_empty() => (c, n),
        _ => {
            return Err(ApiError::validation(
                "currentPassword and newPassword are required",
            ))
        }
    };
    if new.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(
            "New password must be at least 6 characters long",
        ));
    }

    let user = data
        .users
        .get(&identity.id)
        .await
        .map_err(|e| e.into_api("Error fetching user"))?;
    if !password_matches(&user, &current).await {
        return Err(ApiError::validation("Current password is incorrect"));
    }

    let hashed = hash_password(new, data.config.bcrypt_cost).await?;
    let mut patch = Map::new();
    patch.insert("password".into(), Value::String(hashed));
    patch.insert("updatedAt".into(), Value::String(Utc::now().to_rfc3339()));
    data.users
        .update(&identity.id, &patch)
        .await
        .map_err(|e| e.into_api("Error updating password"))?;
    info!("User {} changed their password", identity.id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Password changed successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::UserDirectory;
    use crate::test_helpers::{
        admin_token, bearer, mock_token, staff_token, test_app, test_state,
        test_state_with_directory, token_for, STAFF_ID,
    };
    use actix_web::{http::StatusCode, test};

    #[actix_web::test]
    async fn listing_users_is_admin_only_and_redacted() {
        let (state, _dir) = test_state();
        let app = test_app!(state);

        let req = test::TestRequest::get()
            .uri("/api/users")
            .insert_header(bearer(&staff_token(&state)))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get()
            .uri("/api/users")
            .insert_header(bearer(&admin_token(&state)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let users: Vec<Value> = test::read_body_json(resp).await;
        assert_eq!(users.len(), 4);
        assert!(users.iter().all(|u| u.get("password").is_none()));
    }

    #[actix_web::test]
    async fn staff_may_read_a_single_user_but_unknown_roles_may_not() {
        let (state, _dir) = test_state();
        let app = test_app!(state);

        let req = test::TestRequest::get()
            .uri("/api/users/1")
            .insert_header(bearer(&mock_token(STAFF_ID)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let user: Value = test::read_body_json(resp).await;
        assert_eq!(user["email"], "admin@example.com");

        let req = test::TestRequest::get()
            .uri("/api/users/1")
            .insert_header(bearer(&token_for(&state, "9", Role::Unknown)))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get()
            .uri("/api/users/404")
            .insert_header(bearer(&staff_token(&state)))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn admin_creates_user_with_hashed_password() {
        let (state, directory, _dir) = test_state_with_directory();
        let app = test_app!(state);
        let req = test::TestRequest::post()
            .uri("/api/users")
            .insert_header(bearer(&admin_token(&state)))
            .set_json(json!({
                "fullName": "Nia New",
                "email": "nia@example.com",
                "password": "welcome1",
                "role": "staff",
                "position": "Support",
                "avatar": "nia.png"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "active");
        assert_eq!(body["avatar"], "nia.png");

        let stored = directory.find_by_email("nia@example.com").await.unwrap().unwrap();
        assert_ne!(stored.password, "welcome1");
        assert!(stored.password_matches("welcome1"));
    }

    #[actix_web::test]
    async fn short_password_on_update_is_dropped() {
        let (state, directory, _dir) = test_state_with_directory();
        let app = test_app!(state);
        let req = test::TestRequest::put()
            .uri("/api/users/3")
            .insert_header(bearer(&admin_token(&state)))
            .set_json(json!({ "password": "123", "position": "Lead" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let stored = directory.get("3").await.unwrap();
        assert_eq!(stored.position, "Lead");
        assert_eq!(stored.password, "other123");
        assert!(stored.updated_at.is_some());
    }

    #[actix_web::test]
    async fn upstream_failure_surfaces_as_generic_500() {
        let (state, directory, _dir) = test_state_with_directory();
        directory.set_offline(true);
        let app = test_app!(state);
        let req = test::TestRequest::get()
            .uri("/api/users")
            .insert_header(bearer(&admin_token(&state)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Error fetching users");
    }

    #[actix_web::test]
    async fn delete_user_is_admin_only() {
        let (state, directory, _dir) = test_state_with_directory();
        let app = test_app!(state);
        let req = test::TestRequest::delete()
            .uri("/api/users/3")
            .insert_header(bearer(&staff_token(&state)))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::delete()
            .uri("/api/users/3")
            .insert_header(bearer(&admin_token(&state)))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        assert!(directory.get("3").await.is_err());
    }

    #[actix_web::test]
    async fn change_password_checks_current_password() {
        let (state, directory, _dir) = test_state_with_directory();
        let app = test_app!(state);

        let req = test::TestRequest::put()
            .uri("/api/users/change-password")
            .insert_header(bearer(&staff_token(&state)))
            .set_json(json!({ "currentPassword": "wrong", "newPassword": "brandnew1" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::put()
            .uri("/api/users/change-password")
            .insert_header(bearer(&staff_token(&state)))
            .set_json(json!({ "currentPassword": "staff123", "newPassword": "brandnew1" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let stored = directory.get(STAFF_ID).await.unwrap();
        assert!(stored.password_matches("brandnew1"));
        assert!(!stored.password_matches("staff123"));
    }
}
