use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A user as returned by the API. The password hash is never loaded into
/// this type.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub company_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role_id: Uuid,
    pub department_id: Uuid,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_name: Option<String>,
}

/// Login lookup row: the user, its hash and the names of everything it
/// belongs to.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub role_id: Uuid,
    pub role_name: String,
    pub company_id: Uuid,
    pub company_name: String,
    pub department_id: Uuid,
    pub department_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub company_id: Uuid,
    pub email: String,
    #[serde(alias = "password_hash")]
    pub password: String,
    pub full_name: Option<String>,
    pub role_id: Uuid,
    pub department_id: Uuid,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Profile fields a user update may touch. Role, activation, avatar and
/// password have their own endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserChanges {
    pub company_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.company_id.is_none()
            && self.department_id.is_none()
            && self.email.is_none()
            && self.full_name.is_none()
            && self.phone.is_none()
    }
}
