use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    /// Anything the remote collection holds that is neither admin nor staff.
    #[default]
    #[serde(other)]
    Unknown,
}

impl Role {
    /// Only the two roles a caller may register with.
    pub fn parse_assignable(raw: &str) -> Option<Role> {
        match raw {
            "admin" => Some(Role::Admin),
            "staff" => Some(Role::Staff),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

/// A row of the remote user collection. Fields this service does not model
/// (avatar, attachments, ...) round-trip through `extra`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "super::id")]
    pub id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// The record as it may leave this service: without the password.
    pub fn redacted(mut self) -> Self {
        self.password.clear();
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// Accepts the stored password either as a bcrypt hash or, for seeded
    /// demo rows, as plain text.
    pub fn password_matches(&self, candidate: &str) -> bool {
        if self.password.is_empty() {
            return false;
        }
        if self.password == candidate {
            return true;
        }
        bcrypt::verify(candidate, &self.password).unwrap_or(false)
    }
}

/// Payload posted to the remote collection when a user is created.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub position: String,
    pub status: UserStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
