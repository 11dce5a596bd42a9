use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_USER_API_URL: &str = "https://68911551944bf437b59833cb.mockapi.io/users";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_JWT_SECRET: &str = "your-secret-key-change-in-production";

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub user_api_url: String,
    pub user_api_timeout: Duration,
    pub uploads_dir: PathBuf,
    pub frontend_origin: String,
    pub bcrypt_cost: u32,
    /// Largest accepted file part in a multipart upload.
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("PORT", 5000),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string()),
            token_ttl_hours: parse_or("TOKEN_TTL_HOURS", 24),
            user_api_url: env::var("USER_API_URL")
                .unwrap_or_else(|_| DEFAULT_USER_API_URL.to_string()),
            user_api_timeout: Duration::from_secs(parse_or("USER_API_TIMEOUT_SECS", 10)),
            uploads_dir: env::var("UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            frontend_origin: env::var("FRONTEND_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            bcrypt_cost: parse_or("BCRYPT_COST", 12),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl_hours: 24,
            user_api_url: DEFAULT_USER_API_URL.to_string(),
            user_api_timeout: Duration::from_secs(10),
            uploads_dir: PathBuf::from("uploads"),
            frontend_origin: "http://localhost:3000".to_string(),
            bcrypt_cost: 12,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparsable_values_fall_back_to_default() {
        env::set_var("STAFFDESK_TEST_PORT", "not-a-port");
        assert_eq!(parse_or("STAFFDESK_TEST_PORT", 5000u16), 5000);
        env::set_var("STAFFDESK_TEST_PORT", " 8081 ");
        assert_eq!(parse_or("STAFFDESK_TEST_PORT", 5000u16), 8081);
        assert_eq!(parse_or("STAFFDESK_TEST_UNSET", 12u32), 12);
    }
}
