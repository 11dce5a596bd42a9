use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::{self, header::HeaderMap},
    web, Error, FromRequest, HttpMessage, HttpRequest, HttpResponse,
};
use bcrypt::hash;
use chrono::{Duration, Utc};
use futures::future::{ok, ready, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, error, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use std::sync::OnceLock;

use crate::app_state::AppState;
use crate::directory::UserDirectory;
use crate::error::ApiError;
use crate::models::user::{NewUser, Role, User, UserStatus};

/// Frontend-issued credential: `mock_token_{userId}_{timestamp}`.
pub const MOCK_TOKEN_PREFIX: &str = "mock_token_";
pub const MIN_PASSWORD_LEN: usize = 6;

/// The caller, as resolved from the bearer credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub position: String,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Identity {
            id: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            full_name: user.full_name.clone(),
            position: user.position.clone(),
        }
    }
}

impl FromRequest for Identity {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Identity>()
                .cloned()
                .ok_or_else(|| ApiError::MissingCredential("Access token required".into())),
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub identity: Identity,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInfo {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub position: Option<String>,
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginInfo {
    pub email: Option<String>,
    pub password: Option<String>,
}

// JWT Creation
pub fn create_jwt(
    identity: &Identity,
    secret: &str,
    ttl_hours: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        identity: identity.clone(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(ttl_hours)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))
}

// JWT Validation
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::MissingCredential("Access token required".into()))
}

/// Turns a bearer credential into an identity. Mock tokens are looked up in
/// the user collection; anything else must be a JWT signed with `secret`.
pub async fn resolve_credential(
    token: &str,
    secret: &str,
    users: &dyn UserDirectory,
) -> Result<Identity, ApiError> {
    if let Some(rest) = token.strip_prefix(MOCK_TOKEN_PREFIX) {
        let user_id = rest.split('_').next().unwrap_or_default();
        if user_id.is_empty() {
            return Err(ApiError::InvalidCredential("Invalid mock token".into()));
        }
        return match users.get(user_id).await {
            Ok(user) => Ok(Identity::from(&user)),
            Err(e) => {
                warn!("Mock token resolve failed: {}", e);
                Err(ApiError::InvalidCredential("Invalid mock token".into()))
            }
        };
    }

    validate_jwt(token, secret)
        .map(|claims| claims.identity)
        .map_err(|e| {
            debug!("Token decode error: {}", e);
            ApiError::InvalidCredential("Invalid or expired token".into())
        })
}

/// Hashing is CPU-bound; keep it off the worker thread.
pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    web::block(move || hash(password, cost))
        .await
        .map_err(|e| {
            error!("Hashing task failed: {}", e);
            ApiError::upstream("Error hashing password")
        })?
        .map_err(|e| {
            error!("Error hashing password: {}", e);
            ApiError::upstream("Error hashing password")
        })
}

pub async fn password_matches(user: &User, candidate: &str) -> bool {
    let user = user.clone();
    let candidate = candidate.to_string();
    web::block(move || user.password_matches(&candidate))
        .await
        .unwrap_or(false)
}

fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static pattern"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

/// Resolves the bearer credential for every request it wraps and stores the
/// resulting `Identity` in the request extensions.
#[derive(Debug)]
pub struct Authentication;

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware {
            service: Rc::new(service),
        })
    }
}

pub struct AuthMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            let token = match bearer_token(req.headers()) {
                Ok(token) => token,
                Err(e) => return Ok(req.error_response(e)),
            };
            let state = match req.app_data::<web::Data<AppState>>() {
                Some(state) => state.clone(),
                None => {
                    error!("AppState missing from app data");
                    return Ok(req.error_response(ApiError::upstream("Internal server error")));
                }
            };

            match resolve_credential(&token, &state.config.jwt_secret, state.users.as_ref()).await {
                Ok(identity) => {
                    req.extensions_mut().insert(identity);
                }
                Err(e) => return Ok(req.error_response(e)),
            }

            let res = service.call(req).await?;
            Ok(res.map_into_boxed_body())
        })
    }
}

// POST /api/auth/register
pub async fn register(
    data: web::Data<AppState>,
    info: web::Json<RegisterInfo>,
) -> Result<HttpResponse, ApiError> {
    let info = info.into_inner();
    let (full_name, email, password, position) = match (
        non_blank(info.full_name),
        non_blank(info.email),
        info.password.filter(|p| !p.is_empty()),
        non_blank(info.position),
    ) {
        (Some(f), Some(e), Some(p), Some(pos)) => (f, e, p, pos),
        _ => {
            return Err(ApiError::validation(
                "All fields are required: fullName, email, password, position",
            ))
        }
    };
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(
            "Password must be at least 6 characters long",
        ));
    }
    let role = info
        .role
        .as_deref()
        .and_then(Role::parse_assignable)
        .ok_or_else(|| ApiError::validation(r#"Role must be either "admin" or "staff""#))?;
    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::validation("Email address is not valid"));
    }

    // Best effort: if the collection cannot be listed, registration goes on.
    match data.users.find_by_email(&email).await {
        Ok(Some(_)) => return Err(ApiError::validation("Email already exists")),
        Ok(None) => {}
        Err(e) => warn!("Error checking existing users: {}", e),
    }

    let hashed = hash_password(password, data.config.bcrypt_cost).await?;
    let now = Utc::now();
    let new_user = NewUser {
        full_name: full_name.trim().to_string(),
        email,
        password: hashed,
        role,
        position,
        status: UserStatus::Active,
        avatar: Some(format!("avatar_{}.png", now.timestamp_millis())),
        created_at: now.to_rfc3339(),
        updated_at: now.to_rfc3339(),
        extra: Map::new(),
    };

    let created = data
        .users
        .create(&new_user)
        .await
        .map_err(|e| e.into_api("Error creating user. Please try again."))?;
    let identity = Identity::from(&created);
    let token = issue_token(&identity, &data)?;
    info!("Registered user {} ({})", created.id, created.role.as_str());

    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully",
        "user": created.redacted(),
        "token": token,
    })))
}

// POST /api/auth/login
pub async fn login(
    data: web::Data<AppState>,
    info: web::Json<LoginInfo>,
) -> Result<HttpResponse, ApiError> {
    let info = info.into_inner();
    let (email, password) = match (non_blank(info.email), info.password.filter(|p| !p.is_empty())) {
        (Some(e), Some(p)) => (e, p),
        _ => return Err(ApiError::validation("Email and password are required")),
    };

    let user = data
        .users
        .find_by_email(&email)
        .await
        .map_err(|e| e.into_api("Internal server error"))?
        .ok_or_else(|| ApiError::LoginFailed("Invalid credentials".into()))?;

    if !password_matches(&user, &password).await {
        return Err(ApiError::LoginFailed("Invalid credentials".into()));
    }
    if !user.is_active() {
        info!("Rejected login for inactive user {}", user.id);
        return Err(ApiError::forbidden(
            "Account is inactive. Please contact an administrator.",
        ));
    }

    let identity = Identity::from(&user);
    let token = issue_token(&identity, &data)?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Login successful",
        "token": token,
        "user": user.redacted(),
    })))
}

// POST /api/auth/logout
pub async fn logout(_identity: Identity) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": "Logout successful" }))
}

// GET /api/auth/me
pub async fn me(identity: Identity) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "user": identity }))
}

fn issue_token(identity: &Identity, data: &AppState) -> Result<String, ApiError> {
    create_jwt(identity, &data.config.jwt_secret, data.config.token_ttl_hours).map_err(|e| {
        error!("Error signing token: {}", e);
        ApiError::upstream("Error issuing token")
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
