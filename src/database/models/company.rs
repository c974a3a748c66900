use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub logo_url: Option<String>,
    pub timezone: Option<String>,
    pub subscription_tier: Option<String>,
    pub subscription_status: Option<String>,
    pub is_active: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCompany {
    pub name: String,
    #[serde(alias = "logo_url")]
    pub logo_url: Option<String>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_tier", alias = "subscription_tier")]
    pub subscription_tier: String,
    #[serde(default = "default_status", alias = "subscription_status")]
    pub subscription_status: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_tier() -> String {
    "free".to_string()
}

fn default_status() -> String {
    "active".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompanyChanges {
    pub name: Option<String>,
    pub logo_url: Option<String>,
    pub timezone: Option<String>,
    pub subscription_tier: Option<String>,
    pub subscription_status: Option<String>,
}

impl CompanyChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.logo_url.is_none()
            && self.timezone.is_none()
            && self.subscription_tier.is_none()
            && self.subscription_status.is_none()
    }
}
